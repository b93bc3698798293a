//! Cache key derivation.
//!
//! # Responsibilities
//! - Canonicalize request params to a stable byte representation
//! - Digest the canonical form (SHA-256)
//! - Assemble the full cache key `backend:method:digest`
//!
//! # Design Decisions
//! - Canonicalization sorts object keys recursively; arrays keep their order
//! - Hashing caller-supplied bytes verbatim would make the key depend on
//!   serialization field order, so we never do that

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Render a JSON value in canonical form: object keys sorted recursively,
/// arrays in order, no insignificant whitespace.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Object keys are plain strings; serde_json escapes them.
                out.push_str(&serde_json::to_string(key).unwrap_or_default());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => {
            out.push_str(&serde_json::to_string(scalar).unwrap_or_default());
        }
    }
}

/// Canonical string form of a params value.
pub fn canonicalize(params: &Value) -> String {
    let mut out = String::new();
    write_canonical(params, &mut out);
    out
}

/// Collision-resistant digest of the canonical params form.
pub fn params_digest(params: &Value) -> String {
    let canonical = canonicalize(params);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Full cache key for a (backend, method, params) triple.
pub fn cache_key(backend: &str, method: &str, params: &Value) -> String {
    format!("{}:{}:{}", backend, method, params_digest(params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_order_does_not_change_key() {
        let a = json!({"b": 1, "a": {"y": 2, "x": 3}});
        let b = json!({"a": {"x": 3, "y": 2}, "b": 1});
        assert_eq!(params_digest(&a), params_digest(&b));
    }

    #[test]
    fn test_array_order_matters() {
        let a = json!([1, 2, 3]);
        let b = json!([3, 2, 1]);
        assert_ne!(params_digest(&a), params_digest(&b));
    }

    #[test]
    fn test_different_params_different_keys() {
        let a = json!({"name": "alpha"});
        let b = json!({"name": "beta"});
        assert_ne!(
            cache_key("s1", "tools/call", &a),
            cache_key("s1", "tools/call", &b)
        );
    }

    #[test]
    fn test_key_includes_backend_and_method() {
        let params = json!({});
        assert_ne!(
            cache_key("s1", "tools/list", &params),
            cache_key("s2", "tools/list", &params)
        );
        assert_ne!(
            cache_key("s1", "tools/list", &params),
            cache_key("s1", "prompts/list", &params)
        );
    }

    #[test]
    fn test_canonical_form() {
        let v = json!({"b": [1, {"z": null, "a": "x"}], "a": true});
        assert_eq!(canonicalize(&v), r#"{"a":true,"b":[1,{"a":"x","z":null}]}"#);
    }
}
