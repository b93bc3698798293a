//! Concurrency-bounded task scheduling.
//!
//! # Data Flow
//! ```text
//! submit(backend, priority, work)
//!     → queue.rs (priority + FIFO admission, global ceiling,
//!                 optional per-backend ceiling, per-task timeout)
//! ```
//!
//! # Design Decisions
//! - Priority is derived from the request method via a static table;
//!   connection setup outranks listing, listing outranks invocation,
//!   unknown methods sit just above invocation
//! - A task timeout bounds queued + running time; it stops the wait but
//!   does not cancel a dispatched upstream call

pub mod queue;

pub use queue::{ConcurrencyScheduler, SchedulerStats};

/// Connection-setup methods.
pub const PRIORITY_SETUP: i32 = 30;
/// Listing methods.
pub const PRIORITY_LIST: i32 = 20;
/// Methods absent from the table.
pub const PRIORITY_UNKNOWN: i32 = 10;
/// Invocation methods.
pub const PRIORITY_INVOKE: i32 = 0;

/// Admission priority for a request method (higher = served first).
pub fn method_priority(method: &str) -> i32 {
    match method {
        "initialize" => PRIORITY_SETUP,
        "tools/list" | "resources/list" | "resources/templates/list" | "prompts/list" => {
            PRIORITY_LIST
        }
        "tools/call" | "resources/read" | "prompts/get" => PRIORITY_INVOKE,
        _ => PRIORITY_UNKNOWN,
    }
}
