//! Per-backend circuit breaker registry.
//!
//! # Responsibilities
//! - Hold exactly one breaker per backend identifier
//! - Create breakers lazily on first use; never evict them
//! - Aggregate snapshots and administrative reset

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::schema::CircuitBreakerConfig;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerSnapshot};

/// Concurrent map of backend id → breaker. Breakers live for the process
/// lifetime.
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            config,
        }
    }

    /// Breaker for a backend, created on first use.
    pub fn get_or_create(&self, backend: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(backend.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(backend, &self.config)))
            .clone()
    }

    /// Snapshot every known breaker, keyed by backend id.
    pub fn snapshots(&self) -> HashMap<String, CircuitBreakerSnapshot> {
        self.breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect()
    }

    /// Force-reset every breaker to Closed (administrative operation).
    pub fn reset_all(&self) {
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::GatewayError;
    use crate::resilience::circuit_breaker::CircuitState;

    fn registry(threshold: u32) -> CircuitBreakerRegistry {
        CircuitBreakerRegistry::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            recovery_timeout_ms: 10_000,
        })
    }

    #[tokio::test]
    async fn test_one_breaker_per_backend() {
        let reg = registry(3);
        let a = reg.get_or_create("X");
        let b = reg.get_or_create("X");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.len(), 1);
    }

    #[tokio::test]
    async fn test_backends_are_independent() {
        let reg = registry(1);
        let x = reg.get_or_create("X");
        let y = reg.get_or_create("Y");

        let _ = x
            .execute::<u32, _, _>(|| async { Err(GatewayError::Upstream("down".into())) })
            .await;

        assert_eq!(x.state(), CircuitState::Open);
        assert_eq!(y.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_reset_all() {
        let reg = registry(1);
        let x = reg.get_or_create("X");
        let _ = x
            .execute::<u32, _, _>(|| async { Err(GatewayError::Upstream("down".into())) })
            .await;
        assert_eq!(x.state(), CircuitState::Open);

        reg.reset_all();
        assert_eq!(x.state(), CircuitState::Closed);

        let snaps = reg.snapshots();
        assert_eq!(snaps["X"].failure_count, 0);
    }
}
