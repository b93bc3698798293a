//! Request orchestration.
//!
//! # Data Flow
//! ```text
//! process_request(backend, payload)
//!     1. validate envelope (fail fast, no side effects)
//!     2. cache lookup (hit returns the stored response verbatim)
//!     3. breaker lookup (lazily created per backend)
//!     4. scheduler.submit(breaker.execute(client.forward))
//!     5. cache store on success
//!     6. any failure becomes a structured error response
//! ```
//!
//! # Design Decisions
//! - All shared state is owned here and constructed once; tests build fresh
//!   instances instead of touching globals
//! - `process_request` never fails: every failure path terminates in a
//!   well-formed error envelope

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheStats, ResponseCache};
use crate::config::schema::GatewayConfig;
use crate::observability::metrics;
use crate::protocol::{validator, GatewayError, RpcRequest, RpcResponse};
use crate::resilience::{CircuitBreakerRegistry, CircuitBreakerSnapshot};
use crate::scheduler::{method_priority, ConcurrencyScheduler, SchedulerStats};
use crate::upstream::ForwardingClient;

/// Aggregate statistics snapshot, served by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStats {
    pub cache: CacheStats,
    pub scheduler: SchedulerStats,
    pub breakers: HashMap<String, CircuitBreakerSnapshot>,
}

/// Composition root for the dispatch pipeline.
pub struct Gateway {
    cache: Arc<ResponseCache>,
    breakers: Arc<CircuitBreakerRegistry>,
    scheduler: Arc<ConcurrencyScheduler>,
    client: Arc<ForwardingClient>,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            cache: Arc::new(ResponseCache::new(config.cache.clone())),
            breakers: Arc::new(CircuitBreakerRegistry::new(config.circuit_breaker.clone())),
            scheduler: Arc::new(ConcurrencyScheduler::new(config.scheduler.clone())),
            client: Arc::new(ForwardingClient::new(config.upstream.clone())),
        }
    }

    /// Handle one request end to end. Never fails; every failure is
    /// translated into an error envelope echoing the correlation id.
    pub async fn process_request(&self, backend: &str, payload: Value) -> RpcResponse {
        let start = Instant::now();
        let id = payload.get("id").cloned().unwrap_or(Value::Null);

        // 1. Validate before touching cache, scheduler, or network.
        if let Err(err) = validator::validate(&payload) {
            tracing::debug!(backend = %backend, error = %err, "Rejected invalid request");
            metrics::record_request("invalid", Some(err.code()), start);
            return err.into_response(id);
        }

        let request: RpcRequest = match serde_json::from_value(payload) {
            Ok(request) => request,
            Err(e) => {
                let err = GatewayError::InvalidRequest(e.to_string());
                metrics::record_request("invalid", Some(err.code()), start);
                return err.into_response(id);
            }
        };

        // 2. Cache lookup. Hits are returned verbatim.
        if let Some(cached) = self.cache.lookup(backend, &request) {
            tracing::debug!(backend = %backend, method = %request.method, "Cache hit");
            metrics::record_cache_hit(&request.method);
            metrics::record_request(&request.method, None, start);
            return cached;
        }

        // 3. Dispatch: breaker-gated forward under the concurrency ceiling.
        let breaker = self.breakers.get_or_create(backend);
        let priority = method_priority(&request.method);
        let work = {
            let client = self.client.clone();
            let backend = backend.to_string();
            let request = request.clone();
            Box::pin(async move {
                breaker
                    .execute(|| client.forward(&backend, &request))
                    .await
            })
        };

        match self.scheduler.submit(backend, priority, work).await {
            Ok(response) => {
                // 4. Store successful responses for cacheable methods.
                self.cache.store(backend, &request, &response);
                metrics::record_request(&request.method, None, start);
                response
            }
            Err(err) => {
                tracing::warn!(
                    backend = %backend,
                    method = %request.method,
                    error = %err,
                    "Request failed"
                );
                if matches!(err, GatewayError::CircuitOpen(_)) {
                    metrics::record_circuit_open(backend);
                }
                metrics::record_request(&request.method, Some(err.code()), start);
                err.into_response(request.id)
            }
        }
    }

    /// Aggregate scheduler/cache/breaker snapshots.
    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            cache: self.cache.stats(),
            scheduler: self.scheduler.stats(),
            breakers: self.breakers.snapshots(),
        }
    }

    /// Drain the admission queue, clear the cache, and force-reset every
    /// breaker. Used by the embedding process on shutdown.
    pub fn cleanup(&self) {
        self.scheduler.drain();
        self.cache.clear();
        self.breakers.reset_all();
        tracing::info!("Gateway state cleaned up");
    }
}
