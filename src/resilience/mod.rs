//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to backend:
//!     → registry.rs (one circuit breaker per backend, created lazily)
//!     → circuit_breaker.rs (gate the call, track outcome)
//!     → backoff.rs (delay between forwarding retries; see upstream::client)
//! ```
//!
//! # Design Decisions
//! - Per-backend circuit breaker (not global); a trip on one backend never
//!   affects another
//! - Fail fast in Open state, single probe in Half-Open
//! - The breaker observes one outcome per forwarded call, after retries
//!   inside the forwarding client are exhausted or succeed

pub mod backoff;
pub mod circuit_breaker;
pub mod registry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerSnapshot, CircuitState};
pub use registry::CircuitBreakerRegistry;
