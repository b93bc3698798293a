//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: backend assumed down, calls fail fast
//! - Half-Open: testing if backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Half-Open: after recovery timeout, next call becomes the probe
//! Half-Open → Closed: probe succeeds (counters reset)
//! Half-Open → Open: probe fails (fresh recovery timeout)
//! ```
//!
//! # Design Decisions
//! - One breaker per backend, guarded by its own mutex; the lock is never
//!   held across an await point
//! - Exactly one probe in Half-Open; concurrent calls fail fast meanwhile
//! - Sustained success in Closed decays the failure count by one per
//!   success, floored at zero — not an immediate reset

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::schema::CircuitBreakerConfig;
use crate::protocol::GatewayError;

/// Breaker state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_at: Option<Instant>,
    next_attempt_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Read-only view of a breaker, for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Milliseconds since the most recent failure.
    pub last_failure_age_ms: Option<u64>,
    /// Milliseconds until the next probe is allowed (Open state only).
    pub retry_in_ms: Option<u64>,
}

/// Failure-threshold gate in front of one backend's calls.
pub struct CircuitBreaker {
    backend: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(backend: impl Into<String>, config: &CircuitBreakerConfig) -> Self {
        Self {
            backend: backend.into(),
            failure_threshold: config.failure_threshold,
            recovery_timeout: Duration::from_millis(config.recovery_timeout_ms),
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_at: None,
                next_attempt_at: None,
                probe_in_flight: false,
            }),
        }
    }

    /// Run `call` under the breaker. In Open state before the recovery
    /// deadline the call is never invoked; the first call past the deadline
    /// becomes the single Half-Open probe.
    pub async fn execute<T, F, Fut>(&self, call: F) -> Result<T, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        self.begin_call()?;

        match call().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(err)
            }
        }
    }

    /// Admission decision, taken under the lock before the call starts.
    fn begin_call(&self) -> Result<(), GatewayError> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let now = Instant::now();
                match inner.next_attempt_at {
                    Some(deadline) if now < deadline => {
                        Err(GatewayError::CircuitOpen(self.backend.clone()))
                    }
                    _ => {
                        inner.state = CircuitState::HalfOpen;
                        inner.probe_in_flight = true;
                        tracing::info!(backend = %self.backend, "Circuit breaker half-open, probing");
                        Ok(())
                    }
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(GatewayError::CircuitOpen(self.backend.clone()))
                } else {
                    inner.probe_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.failure_count = 0;
                inner.success_count = 0;
                inner.next_attempt_at = None;
                inner.probe_in_flight = false;
                tracing::info!(backend = %self.backend, "Circuit breaker closed after successful probe");
            }
            CircuitState::Closed => {
                inner.failure_count = inner.failure_count.saturating_sub(1);
                inner.success_count += 1;
            }
            // A call admitted before a trip finished after it; the trip stands.
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self) {
        let mut inner = self.lock();
        inner.failure_count += 1;
        inner.last_failure_at = Some(Instant::now());

        match inner.state {
            CircuitState::HalfOpen => {
                inner.probe_in_flight = false;
                self.trip(&mut inner, "probe failed");
            }
            CircuitState::Closed if inner.failure_count >= self.failure_threshold => {
                self.trip(&mut inner, "failure threshold reached");
            }
            _ => {}
        }
    }

    fn trip(&self, inner: &mut BreakerInner, reason: &str) {
        inner.state = CircuitState::Open;
        inner.next_attempt_at = Some(Instant::now() + self.recovery_timeout);
        tracing::warn!(
            backend = %self.backend,
            failures = inner.failure_count,
            reason,
            "Circuit breaker opened"
        );
    }

    /// Force the breaker back to Closed, clearing all counters.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.last_failure_at = None;
        inner.next_attempt_at = None;
        inner.probe_in_flight = false;
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let inner = self.lock();
        let now = Instant::now();
        CircuitBreakerSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_age_ms: inner
                .last_failure_at
                .map(|t| now.saturating_duration_since(t).as_millis() as u64),
            retry_in_ms: match inner.state {
                CircuitState::Open => inner
                    .next_attempt_at
                    .map(|t| t.saturating_duration_since(now).as_millis() as u64),
                _ => None,
            },
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
