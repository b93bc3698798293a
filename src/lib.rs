//! JSON-RPC Forwarding Gateway Library
//!
//! Accepts a JSON-RPC 2.0 request addressed to a logical backend identifier,
//! forwards it to the upstream service derived from that identifier, and
//! returns the upstream's response. The dispatch pipeline enforces bounded
//! concurrency, per-backend circuit breaking, bounded retry with backoff,
//! and TTL response caching.
//!
//! ```text
//! process_request(backend, payload)
//!     → protocol::validator (envelope checks)
//!     → cache (lookup)
//!     → resilience (per-backend circuit breaker)
//!     → scheduler (priority admission, global concurrency ceiling)
//!     → upstream (pooled client, retry with capped backoff)
//!     → cache (store on success)
//! ```
//!
//! The HTTP listener in [`http`] is a thin transport shell over the core; the
//! core itself is reachable through [`gateway::Gateway`] alone.

// Core dispatch pipeline
pub mod cache;
pub mod gateway;
pub mod protocol;
pub mod resilience;
pub mod scheduler;
pub mod upstream;

// Cross-cutting concerns
pub mod config;
pub mod observability;

// Transport shell (external collaborator of the core)
pub mod http;

pub use config::schema::GatewayConfig;
pub use gateway::Gateway;
pub use protocol::{RpcError, RpcRequest, RpcResponse};
