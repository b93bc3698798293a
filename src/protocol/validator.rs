//! Request envelope validation.
//!
//! # Responsibilities
//! - Check protocol version, method, and correlation-id presence
//! - Reject before any cache, scheduler, or network interaction
//!
//! # Design Decisions
//! - Operates on the raw JSON value: "id present but null" and "id absent"
//!   are different cases, and only the latter is invalid
//! - Pure function, no side effects

use serde_json::Value;

use crate::protocol::{GatewayError, PROTOCOL_VERSION};

/// Validate a request envelope.
///
/// Valid iff the payload is a JSON object whose `jsonrpc` field equals
/// `"2.0"`, whose `method` is a non-empty string, and whose `id` key exists
/// (any value, including null).
pub fn validate(payload: &Value) -> Result<(), GatewayError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| GatewayError::InvalidRequest("payload must be an object".into()))?;

    match obj.get("jsonrpc").and_then(Value::as_str) {
        Some(PROTOCOL_VERSION) => {}
        Some(other) => {
            return Err(GatewayError::InvalidRequest(format!(
                "unsupported protocol version '{other}'"
            )))
        }
        None => {
            return Err(GatewayError::InvalidRequest(
                "missing protocol version".into(),
            ))
        }
    }

    match obj.get("method").and_then(Value::as_str) {
        Some(m) if !m.is_empty() => {}
        Some(_) => return Err(GatewayError::InvalidRequest("method must be non-empty".into())),
        None => {
            return Err(GatewayError::InvalidRequest(
                "method must be a string".into(),
            ))
        }
    }

    if !obj.contains_key("id") {
        return Err(GatewayError::InvalidRequest(
            "missing correlation id".into(),
        ));
    }

    Ok(())
}
