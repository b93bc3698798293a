//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! lookup(backend, request)
//!     → fingerprint.rs (canonical params digest)
//!     → store.rs (TTL check, lazy reclamation)
//!
//! store(backend, request, response)
//!     → skipped for error responses and non-cacheable methods
//!     → capacity policy applied when full
//! ```
//!
//! # Design Decisions
//! - Cacheability is purely method-driven (static TTL table in config)
//! - Keys are canonical: field order of caller params never changes the key
//! - Expired entries are reclaimed on access; never observable externally

pub mod fingerprint;
pub mod store;

pub use store::{CacheStats, ResponseCache};
