//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method and outcome code
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_cache_hits_total` (counter): cache hits by method
//! - `gateway_forward_attempts_total` (counter): upstream attempts by backend
//! - `gateway_circuit_open_total` (counter): short-circuited calls by backend
//!
//! # Design Decisions
//! - Low-overhead updates through the metrics facade; the Prometheus
//!   exporter is optional and bound to its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one handled request. `code` is the error code, if any.
pub fn record_request(method: &str, code: Option<i32>, start: Instant) {
    let outcome = code.map_or("ok".to_string(), |c| c.to_string());
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_hit(method: &str) {
    counter!("gateway_cache_hits_total", "method" => method.to_string()).increment(1);
}

pub fn record_forward_attempt(backend: &str) {
    counter!("gateway_forward_attempts_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_circuit_open(backend: &str) {
    counter!("gateway_circuit_open_total", "backend" => backend.to_string()).increment(1);
}
