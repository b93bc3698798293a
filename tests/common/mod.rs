//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use rpc_gateway::config::GatewayConfig;

/// Start a programmable mock upstream on an ephemeral port. The closure
/// produces the HTTP status and JSON body for each received request.
#[allow(dead_code)]
pub async fn start_mock_upstream<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        read_request(&mut socket).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Consume the request head and body so the client never sees a reset.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = vec![0u8; 16 * 1024];
    let mut total = 0;

    let head_end = loop {
        match socket.read(&mut buf[total..]).await {
            Ok(0) => return,
            Ok(n) => {
                total += n;
                if let Some(pos) = buf[..total].windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                if total == buf.len() {
                    return;
                }
            }
            Err(_) => return,
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
    let content_length: usize = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);

    let expected = head_end + content_length;
    while total < expected && total < buf.len() {
        match socket.read(&mut buf[total..]).await {
            Ok(0) => return,
            Ok(n) => total += n,
            Err(_) => return,
        }
    }
}

/// Gateway config pointed at a mock upstream, with fast timeouts and
/// delays suited to tests.
#[allow(dead_code)]
pub fn test_config(upstream: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.upstream.base_url = format!("http://{}", upstream);
    config.upstream.request_timeout_secs = 2;
    config.upstream.base_delay_ms = 10;
    config.upstream.max_delay_ms = 50;
    config.scheduler.task_timeout_ms = 5_000;
    config
}

/// A well-formed request payload.
#[allow(dead_code)]
pub fn rpc_payload(method: &str, params: Value, id: u64) -> Value {
    json!({"jsonrpc": "2.0", "method": method, "params": params, "id": id})
}

/// A success envelope body, as an upstream would produce it.
#[allow(dead_code)]
pub fn rpc_result_body(result: Value, id: u64) -> String {
    json!({"jsonrpc": "2.0", "result": result, "id": id}).to_string()
}

/// An error envelope body, as an upstream would produce it.
#[allow(dead_code)]
pub fn rpc_error_body(code: i32, message: &str, id: u64) -> String {
    json!({"jsonrpc": "2.0", "error": {"code": code, "message": message}, "id": id}).to_string()
}
