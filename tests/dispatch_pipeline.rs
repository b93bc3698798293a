//! End-to-end tests for the dispatch pipeline: validation, caching, and
//! response pass-through against mock upstreams.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde_json::json;

use rpc_gateway::Gateway;

mod common;

#[tokio::test]
async fn test_invalid_envelope_rejected_without_dispatch() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    let upstream = common::start_mock_upstream(move || {
        let c = c.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            (200, common::rpc_result_body(json!({}), 1))
        }
    })
    .await;

    let gateway = Gateway::new(common::test_config(upstream));

    let resp = gateway
        .process_request("X", json!({"jsonrpc": "2.0", "method": "tools/list"}))
        .await;
    assert_eq!(resp.error.as_ref().unwrap().code, -32600);

    let resp = gateway
        .process_request("X", json!({"jsonrpc": "1.0", "method": "tools/list", "id": 1}))
        .await;
    assert_eq!(resp.error.as_ref().unwrap().code, -32600);

    // No upstream traffic, no scheduler submission, no cache access.
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let stats = gateway.stats();
    assert_eq!(stats.scheduler.submitted, 0);
    assert_eq!(stats.cache.hits + stats.cache.misses, 0);
}

#[tokio::test]
async fn test_cacheable_method_forwards_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    let upstream = common::start_mock_upstream(move || {
        let c = c.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            (200, common::rpc_result_body(json!({"tools": ["a", "b"]}), 1))
        }
    })
    .await;

    let gateway = Gateway::new(common::test_config(upstream));

    let first = gateway
        .process_request("X", common::rpc_payload("tools/list", json!({"a": 1, "b": 2}), 1))
        .await;
    // Same request with params fields in a different order: same cache key.
    let second = gateway
        .process_request("X", common::rpc_payload("tools/list", json!({"b": 2, "a": 1}), 1))
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!first.is_error());
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
    assert_eq!(gateway.stats().cache.hits, 1);
}

#[tokio::test]
async fn test_cache_isolated_per_backend() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    let upstream = common::start_mock_upstream(move || {
        let c = c.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            (200, common::rpc_result_body(json!([]), 1))
        }
    })
    .await;

    let gateway = Gateway::new(common::test_config(upstream));
    let payload = common::rpc_payload("tools/list", json!({}), 1);

    let _ = gateway.process_request("X", payload.clone()).await;
    let _ = gateway.process_request("Y", payload).await;

    // Different backends never share cache entries.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_error_envelope_passthrough_and_not_cached() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    let upstream = common::start_mock_upstream(move || {
        let c = c.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            (200, common::rpc_error_body(-32602, "bad params", 1))
        }
    })
    .await;

    let gateway = Gateway::new(common::test_config(upstream));
    let payload = common::rpc_payload("tools/list", json!({}), 1);

    let first = gateway.process_request("X", payload.clone()).await;
    let second = gateway.process_request("X", payload).await;

    // The upstream error envelope passes through verbatim...
    assert_eq!(first.error.as_ref().unwrap().code, -32602);
    assert_eq!(second.error.as_ref().unwrap().code, -32602);
    // ...and is never served from cache.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(gateway.stats().cache.entries, 0);
}

#[tokio::test]
async fn test_non_cacheable_method_always_forwards() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    let upstream = common::start_mock_upstream(move || {
        let c = c.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            (200, common::rpc_result_body(json!({"ok": true}), 7))
        }
    })
    .await;

    let gateway = Gateway::new(common::test_config(upstream));
    let payload = common::rpc_payload("tools/call", json!({"name": "echo"}), 7);

    let _ = gateway.process_request("X", payload.clone()).await;
    let _ = gateway.process_request("X", payload).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_end_to_end_cached_scenario() {
    // Request {version:"2.0", method:"tools/list", params:{}, id:1} to
    // backend "X": first call forwards and caches, the second is served
    // from cache with zero additional forwarded calls.
    let calls = Arc::new(AtomicU32::new(0));
    let c = calls.clone();
    let upstream = common::start_mock_upstream(move || {
        let c = c.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            (200, common::rpc_result_body(json!({"tools": []}), 1))
        }
    })
    .await;

    let gateway = Gateway::new(common::test_config(upstream));
    let payload = common::rpc_payload("tools/list", json!({}), 1);

    let first = gateway.process_request("X", payload.clone()).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.result, Some(json!({"tools": []})));
    assert_eq!(first.id, json!(1));

    let second = gateway.process_request("X", payload).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.result, Some(json!({"tools": []})));
}

#[tokio::test]
async fn test_cleanup_resets_cache_and_breakers() {
    let upstream = common::start_mock_upstream(|| async {
        (200, common::rpc_result_body(json!([]), 1))
    })
    .await;

    let gateway = Gateway::new(common::test_config(upstream));
    let _ = gateway
        .process_request("X", common::rpc_payload("tools/list", json!({}), 1))
        .await;
    assert_eq!(gateway.stats().cache.entries, 1);

    gateway.cleanup();

    let stats = gateway.stats();
    assert_eq!(stats.cache.entries, 0);
    assert!(stats.breakers.values().all(|b| b.failure_count == 0));
}
