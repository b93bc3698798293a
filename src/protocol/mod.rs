//! JSON-RPC 2.0 protocol envelope.
//!
//! # Responsibilities
//! - Define request/response envelope types
//! - Define the stable error-code table
//! - Classify internal failures into wire error codes
//!
//! # Design Decisions
//! - Validation happens on the raw JSON value (see `validator`), so the
//!   envelope types can assume well-formed input
//! - Error responses are built centrally; no ad-hoc error objects

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod validator;

/// Protocol version literal every envelope must carry.
pub const PROTOCOL_VERSION: &str = "2.0";

/// Wire error codes. The table is stable; codes never change meaning.
pub mod codes {
    /// Malformed input payload (not parseable as JSON).
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid request envelope.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Unknown route/method.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid parameters.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Backend unavailable (connection-level failure).
    pub const BACKEND_UNAVAILABLE: i32 = -32001;
    /// Request timed out.
    pub const REQUEST_TIMEOUT: i32 = -32002;
    /// Circuit breaker open for backend.
    pub const CIRCUIT_OPEN: i32 = -32003;
    /// Generic upstream/proxy error.
    pub const UPSTREAM_ERROR: i32 = -32004;
}

/// A validated JSON-RPC request. Immutable once parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,

    pub method: String,

    #[serde(default)]
    pub params: Value,

    /// Correlation id. `Value::Null` when the caller sent an explicit null.
    #[serde(default)]
    pub id: Value,
}

/// A JSON-RPC response: either a success payload or a structured error,
/// echoing the request's correlation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default = "default_version")]
    pub jsonrpc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,

    #[serde(default)]
    pub id: Value,
}

fn default_version() -> String {
    PROTOCOL_VERSION.to_string()
}

/// Structured error member of a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcResponse {
    /// Build a success response echoing the given correlation id.
    pub fn success(result: Value, id: Value) -> Self {
        Self {
            jsonrpc: PROTOCOL_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Build an error response echoing the given correlation id (or null).
    pub fn error(code: i32, message: impl Into<String>, id: Value) -> Self {
        Self {
            jsonrpc: PROTOCOL_VERSION.to_string(),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }

    /// True if this response carries an error member.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Internal failure taxonomy. Every variant maps to exactly one wire code;
/// the orchestrator translates these into error responses at the boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("request timed out")]
    Timeout,

    #[error("circuit breaker open for backend '{0}'")]
    CircuitOpen(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Wire error code for this failure.
    pub fn code(&self) -> i32 {
        match self {
            GatewayError::InvalidRequest(_) => codes::INVALID_REQUEST,
            GatewayError::BackendUnavailable(_) => codes::BACKEND_UNAVAILABLE,
            GatewayError::Timeout => codes::REQUEST_TIMEOUT,
            GatewayError::CircuitOpen(_) => codes::CIRCUIT_OPEN,
            GatewayError::Upstream(_) => codes::UPSTREAM_ERROR,
            GatewayError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Translate into a wire error response echoing `id`.
    pub fn into_response(self, id: Value) -> RpcResponse {
        RpcResponse::error(self.code(), self.to_string(), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_codes_stable() {
        assert_eq!(codes::PARSE_ERROR, -32700);
        assert_eq!(codes::INVALID_REQUEST, -32600);
        assert_eq!(codes::METHOD_NOT_FOUND, -32601);
        assert_eq!(codes::INVALID_PARAMS, -32602);
        assert_eq!(codes::INTERNAL_ERROR, -32603);
        assert_eq!(codes::BACKEND_UNAVAILABLE, -32001);
        assert_eq!(codes::REQUEST_TIMEOUT, -32002);
        assert_eq!(codes::CIRCUIT_OPEN, -32003);
        assert_eq!(codes::UPSTREAM_ERROR, -32004);
    }

    #[test]
    fn test_error_response_shape() {
        let resp = GatewayError::CircuitOpen("X".into()).into_response(json!(7));
        assert_eq!(resp.jsonrpc, "2.0");
        assert_eq!(resp.id, json!(7));
        assert!(resp.result.is_none());
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32003);
        assert!(err.message.contains("X"));
    }

    #[test]
    fn test_success_serialization_omits_error() {
        let resp = RpcResponse::success(json!({"ok": true}), json!(1));
        let wire = serde_json::to_value(&resp).unwrap();
        assert!(wire.get("error").is_none());
        assert_eq!(wire["result"]["ok"], json!(true));
    }

    #[test]
    fn test_lenient_response_deserialization() {
        // Upstreams may omit jsonrpc; default it rather than reject.
        let resp: RpcResponse = serde_json::from_value(json!({
            "result": {"tools": []},
            "id": 1
        }))
        .unwrap();
        assert_eq!(resp.jsonrpc, "2.0");
        assert!(!resp.is_error());
    }
}
