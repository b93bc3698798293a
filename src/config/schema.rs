//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener settings for the transport shell.
    pub listener: ListenerConfig,

    /// Upstream endpoint and retry settings.
    pub upstream: UpstreamConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Per-backend circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Concurrency scheduler settings.
    pub scheduler: SchedulerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration (transport shell only; the core never reads it).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Whole-request timeout applied by the shell, in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 60,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Upstream forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL; the backend id is substituted into `{base_url}/server/{id}`.
    pub base_url: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Per-attempt request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Total attempts per forwarded call (first try + retries).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Maximum idle keep-alive sockets retained per upstream host.
    pub pool_max_idle_per_host: usize,

    /// Idle socket reclamation timeout in seconds.
    pub pool_idle_timeout_secs: u64,

    /// Maximum accepted upstream response body size in bytes.
    pub max_response_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9000".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
            pool_max_idle_per_host: 32,
            pool_idle_timeout_secs: 60,
            max_response_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Policy applied when an insert would exceed the cache capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheFullPolicy {
    /// Drop the new insert; existing entries stay until they expire.
    RejectNew,

    /// Evict the entry closest to expiry, then insert.
    #[default]
    EvictNearestExpiry,
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached entries.
    pub max_entries: usize,

    /// Behavior when the store is full.
    pub full_policy: CacheFullPolicy,

    /// Method → TTL in seconds. Methods absent from the table, or mapped
    /// to 0, are never cached.
    pub method_ttl_secs: HashMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            full_policy: CacheFullPolicy::default(),
            method_ttl_secs: default_method_ttls(),
        }
    }
}

fn default_method_ttls() -> HashMap<String, u64> {
    HashMap::from([
        ("tools/list".to_string(), 300),
        ("resources/list".to_string(), 300),
        ("resources/templates/list".to_string(), 300),
        ("prompts/list".to_string(), 300),
    ])
}

/// Circuit breaker configuration (shared by every per-backend instance).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failure count at which the breaker trips open.
    pub failure_threshold: u32,

    /// Cool-down before a probe is allowed, in milliseconds.
    pub recovery_timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_ms: 30_000,
        }
    }
}

/// Concurrency scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum tasks executing at once across all backends.
    pub max_concurrent: usize,

    /// Optional per-backend concurrency ceiling.
    pub per_backend_max: Option<usize>,

    /// Per-task deadline covering queued + running time, in milliseconds.
    pub task_timeout_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 16,
            per_backend_max: None,
            task_timeout_ms: 30_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_usable() {
        let config = GatewayConfig::default();
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.scheduler.max_concurrent, 16);
        assert_eq!(config.cache.method_ttl_secs["tools/list"], 300);
        assert_eq!(config.cache.full_policy, CacheFullPolicy::EvictNearestExpiry);
    }

    #[test]
    fn test_minimal_toml_overrides() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [upstream]
            base_url = "http://10.0.0.5:4000"
            max_attempts = 5

            [cache]
            full_policy = "reject_new"

            [scheduler]
            per_backend_max = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.base_url, "http://10.0.0.5:4000");
        assert_eq!(config.upstream.max_attempts, 5);
        assert_eq!(config.cache.full_policy, CacheFullPolicy::RejectNew);
        assert_eq!(config.scheduler.per_backend_max, Some(2));
        // Untouched sections keep defaults.
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
    }
}
