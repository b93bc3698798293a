//! Pooled upstream client with bounded retry.
//!
//! # Responsibilities
//! - POST the JSON-RPC envelope to `{base_url}/server/{backend}`
//! - Enforce a connect timeout (connector-level) and a per-attempt request
//!   timeout, independent of each other
//! - Retry connection-level failures, per-attempt timeouts, and 5xx
//!   responses; never client-error responses
//! - Reject non-object upstream payloads as non-retryable format errors
//!
//! # Design Decisions
//! - One pooled hyper client shared across all backends
//! - All attempts of one call surface as a single outcome to the circuit
//!   breaker wrapped around this client

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::Value;
use tokio::time;

use crate::config::schema::UpstreamConfig;
use crate::observability::metrics;
use crate::protocol::{GatewayError, RpcRequest, RpcResponse};
use crate::resilience::backoff::retry_delay;

/// Forwards requests to the upstream service derived from a backend id.
pub struct ForwardingClient {
    client: Client<HttpConnector, Body>,
    config: UpstreamConfig,
}

impl ForwardingClient {
    pub fn new(config: UpstreamConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .build(connector);

        Self { client, config }
    }

    /// Upstream endpoint for a backend: `{base_url}/server/{backend}`.
    pub fn endpoint(&self, backend: &str) -> String {
        format!(
            "{}/server/{}",
            self.config.base_url.trim_end_matches('/'),
            backend
        )
    }

    /// Forward one request, retrying transient failures up to the configured
    /// attempt count.
    pub async fn forward(
        &self,
        backend: &str,
        request: &RpcRequest,
    ) -> Result<RpcResponse, GatewayError> {
        let uri = self.endpoint(backend);
        let body = serde_json::to_vec(request)
            .map_err(|e| GatewayError::Internal(format!("failed to encode request: {e}")))?;
        let request_timeout = Duration::from_secs(self.config.request_timeout_secs);
        let max_attempts = self.config.max_attempts.max(1);

        let mut last_err = GatewayError::BackendUnavailable("no attempt made".into());

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = retry_delay(
                    attempt - 1,
                    self.config.base_delay_ms,
                    self.config.max_delay_ms,
                );
                tracing::debug!(backend = %backend, attempt, delay = ?delay, "Retrying upstream call");
                time::sleep(delay).await;
            }

            metrics::record_forward_attempt(backend);

            let req = Request::builder()
                .method(Method::POST)
                .uri(&uri)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::ACCEPT, "application/json")
                .body(Body::from(body.clone()))
                .map_err(|e| GatewayError::Internal(format!("failed to build request: {e}")))?;

            match time::timeout(request_timeout, self.client.request(req)).await {
                Err(_) => {
                    tracing::warn!(backend = %backend, attempt, "Upstream attempt timed out");
                    last_err = GatewayError::Timeout;
                }
                Ok(Err(e)) => {
                    tracing::warn!(backend = %backend, attempt, error = %e, "Upstream connection error");
                    last_err = GatewayError::BackendUnavailable(e.to_string());
                }
                Ok(Ok(response)) => {
                    let status = response.status();
                    if status.is_server_error() {
                        tracing::warn!(backend = %backend, attempt, status = %status, "Upstream server error");
                        last_err = GatewayError::Upstream(format!("upstream returned {status}"));
                    } else if !status.is_success() {
                        // Client errors are the caller's fault; retrying
                        // cannot change the outcome.
                        return Err(GatewayError::Upstream(format!(
                            "upstream returned {status}"
                        )));
                    } else {
                        return self.decode(response).await;
                    }
                }
            }
        }

        Err(last_err)
    }

    async fn decode(
        &self,
        response: hyper::Response<hyper::body::Incoming>,
    ) -> Result<RpcResponse, GatewayError> {
        let bytes = axum::body::to_bytes(
            Body::new(response.into_body()),
            self.config.max_response_bytes,
        )
        .await
        .map_err(|e| GatewayError::Upstream(format!("failed to read upstream body: {e}")))?;

        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|_| GatewayError::Upstream("upstream payload is not valid JSON".into()))?;

        if !value.is_object() {
            return Err(GatewayError::Upstream(
                "upstream payload is not an object".into(),
            ));
        }

        serde_json::from_value(value)
            .map_err(|e| GatewayError::Upstream(format!("upstream envelope malformed: {e}")))
    }
}
