//! HTTP transport shell.
//!
//! # Responsibilities
//! - Expose the core over HTTP: `POST /server/{backend}` → dispatch,
//!   `GET /status` → stats snapshot, `GET /health` → liveness
//! - Wire up middleware (timeout, body limit, request ID, tracing)
//!
//! # Design Decisions
//! - Deliberately thin: the core never depends on this module, and every
//!   request passes through `Gateway::process_request` unchanged
//! - Malformed JSON and unknown routes are answered with protocol error
//!   envelopes (-32700 / -32601) rather than bare HTTP errors

pub mod server;

pub use server::HttpServer;
