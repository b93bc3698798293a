//! Observability subsystem.
//!
//! # Responsibilities
//! - Initialize structured logging (tracing)
//! - Record gateway metrics and expose them via Prometheus

pub mod logging;
pub mod metrics;
