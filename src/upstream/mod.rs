//! Upstream forwarding.
//!
//! # Responsibilities
//! - Resolve the upstream endpoint from the backend identifier
//! - Issue the call over a reused keep-alive connection pool
//! - Retry transient failures with capped exponential backoff

pub mod client;

pub use client::ForwardingClient;
