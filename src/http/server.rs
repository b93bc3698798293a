//! HTTP server setup and request handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderValue, Request},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::config::schema::GatewayConfig;
use crate::gateway::{Gateway, GatewayStats};
use crate::protocol::{codes, RpcResponse};

/// Attaches a UUID v4 `x-request-id` to each incoming request.
#[derive(Clone, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
struct AppState {
    gateway: Arc<Gateway>,
}

/// HTTP shell over the gateway core.
pub struct HttpServer {
    router: Router,
    gateway: Arc<Gateway>,
}

impl HttpServer {
    /// Create a server owning a fresh gateway built from `config`.
    pub fn new(config: GatewayConfig) -> Self {
        let gateway = Arc::new(Gateway::new(config.clone()));
        Self::with_gateway(&config, gateway)
    }

    /// Create a server over an existing gateway instance.
    pub fn with_gateway(config: &GatewayConfig, gateway: Arc<Gateway>) -> Self {
        let state = AppState {
            gateway: gateway.clone(),
        };

        let router = Router::new()
            .route("/server/{backend}", post(rpc_handler))
            .route("/status", get(status_handler))
            .route("/health", get(health_handler))
            .fallback(fallback_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http());

        Self { router, gateway }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let Self { router, gateway } = self;

        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        gateway.cleanup();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main dispatch handler: parse the body, hand it to the core.
async fn rpc_handler(
    State(state): State<AppState>,
    Path(backend): Path<String>,
    body: Bytes,
) -> Json<RpcResponse> {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return Json(RpcResponse::error(
                codes::PARSE_ERROR,
                format!("parse error: {e}"),
                Value::Null,
            ))
        }
    };

    Json(state.gateway.process_request(&backend, payload).await)
}

async fn status_handler(State(state): State<AppState>) -> Json<GatewayStats> {
    Json(state.gateway.stats())
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn fallback_handler() -> Json<RpcResponse> {
    Json(RpcResponse::error(
        codes::METHOD_NOT_FOUND,
        "unknown route",
        Value::Null,
    ))
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
