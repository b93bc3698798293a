//! Exponential backoff for forwarding retries.

use std::time::Duration;

/// Delay before the n-th retry (1-based): `min(base * 2^(n-1), max)`.
///
/// Deterministic by contract; callers rely on non-decreasing, capped delays.
pub fn retry_delay(retry: u32, base_ms: u64, max_ms: u64) -> Duration {
    if retry == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(retry - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    Duration::from_millis(delay_ms.min(max_ms))
}
