//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, attempts >= 1)
//! - Check addresses and URLs actually parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn err(field: &'static str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field,
        message: message.into(),
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(err(
            "listener.bind_address",
            format!("'{}' is not a valid socket address", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(err(
            "upstream.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(err("upstream.base_url", e.to_string())),
    }

    if config.upstream.max_attempts == 0 {
        errors.push(err("upstream.max_attempts", "must be at least 1"));
    }
    if config.upstream.connect_timeout_secs == 0 {
        errors.push(err("upstream.connect_timeout_secs", "must be positive"));
    }
    if config.upstream.request_timeout_secs == 0 {
        errors.push(err("upstream.request_timeout_secs", "must be positive"));
    }

    if config.cache.max_entries == 0 {
        errors.push(err("cache.max_entries", "must be positive"));
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(err("circuit_breaker.failure_threshold", "must be positive"));
    }
    if config.circuit_breaker.recovery_timeout_ms == 0 {
        errors.push(err("circuit_breaker.recovery_timeout_ms", "must be positive"));
    }

    if config.scheduler.max_concurrent == 0 {
        errors.push(err("scheduler.max_concurrent", "must be positive"));
    }
    if config.scheduler.per_backend_max == Some(0) {
        errors.push(err("scheduler.per_backend_max", "must be positive when set"));
    }
    if config.scheduler.task_timeout_ms == 0 {
        errors.push(err("scheduler.task_timeout_ms", "must be positive"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(err(
            "observability.metrics_address",
            format!("'{}' is not a valid socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
