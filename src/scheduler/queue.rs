//! Priority admission queue with a global concurrency ceiling.
//!
//! # Responsibilities
//! - Admit tasks in priority order (stable FIFO within a priority)
//! - Never let more than `max_concurrent` tasks run at once
//! - Enforce the optional per-backend ceiling at admission time
//! - Bound each task's queued + running time with a timeout
//!
//! # Design Decisions
//! - Admission state lives behind one mutex with short critical sections;
//!   task bodies run outside it on spawned tokio tasks
//! - A task whose backend is saturated is skipped, not dropped; it stays
//!   queued and is reconsidered on every slot release
//! - A timed-out submitter stops waiting; the dispatched work completes in
//!   the background and its result is discarded

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::config::schema::SchedulerConfig;
use crate::protocol::{GatewayError, RpcResponse};

pub type TaskResult = Result<RpcResponse, GatewayError>;

/// A deferred unit of work. Immutable once submitted; the scheduler owns
/// execution order.
struct QueuedTask {
    priority: i32,
    seq: u64,
    backend: String,
    work: BoxFuture<'static, TaskResult>,
    reply: oneshot::Sender<TaskResult>,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Max-heap: higher priority first; equal priority is FIFO, so the
        // smaller sequence number must compare greater.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct SchedulerState {
    queue: BinaryHeap<QueuedTask>,
    running: usize,
    per_backend: HashMap<String, usize>,
    next_seq: u64,
}

/// Scheduler counters, exposed through the gateway stats snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStats {
    pub running: usize,
    pub queued: usize,
    pub submitted: u64,
    pub completed: u64,
    pub timed_out: u64,
    pub drained: u64,
}

struct SchedulerInner {
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
    submitted: AtomicU64,
    completed: AtomicU64,
    timed_out: AtomicU64,
    drained: AtomicU64,
}

/// Globally bounded, priority-ordered task queue.
pub struct ConcurrencyScheduler {
    inner: Arc<SchedulerInner>,
}

impl ConcurrencyScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                config,
                state: Mutex::new(SchedulerState {
                    queue: BinaryHeap::new(),
                    running: 0,
                    per_backend: HashMap::new(),
                    next_seq: 0,
                }),
                submitted: AtomicU64::new(0),
                completed: AtomicU64::new(0),
                timed_out: AtomicU64::new(0),
                drained: AtomicU64::new(0),
            }),
        }
    }

    /// Enqueue a task and wait for its result. Resolves with
    /// `GatewayError::Timeout` when the per-task deadline elapses first.
    pub async fn submit(
        &self,
        backend: &str,
        priority: i32,
        work: BoxFuture<'static, TaskResult>,
    ) -> TaskResult {
        let (reply, rx) = oneshot::channel();
        {
            let mut state = self.inner.lock_state();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.queue.push(QueuedTask {
                priority,
                seq,
                backend: backend.to_string(),
                work,
                reply,
            });
        }
        self.inner.submitted.fetch_add(1, Ordering::Relaxed);
        SchedulerInner::dispatch(&self.inner);

        let deadline = Duration::from_millis(self.inner.config.task_timeout_ms);
        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(GatewayError::Internal(
                "task abandoned by scheduler".into(),
            )),
            Err(_) => {
                self.inner.timed_out.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(backend = %backend, timeout_ms = self.inner.config.task_timeout_ms, "Task timed out");
                Err(GatewayError::Timeout)
            }
        }
    }

    /// Fail every queued-but-unadmitted task (administrative cleanup).
    /// Running tasks finish on their own.
    pub fn drain(&self) {
        let pending = {
            let mut state = self.inner.lock_state();
            std::mem::take(&mut state.queue)
        };
        for task in pending {
            self.inner.drained.fetch_add(1, Ordering::Relaxed);
            let _ = task
                .reply
                .send(Err(GatewayError::Internal("scheduler draining".into())));
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        let state = self.inner.lock_state();
        SchedulerStats {
            running: state.running,
            queued: state.queue.len(),
            submitted: self.inner.submitted.load(Ordering::Relaxed),
            completed: self.inner.completed.load(Ordering::Relaxed),
            timed_out: self.inner.timed_out.load(Ordering::Relaxed),
            drained: self.inner.drained.load(Ordering::Relaxed),
        }
    }
}

impl SchedulerInner {
    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn backend_saturated(&self, state: &SchedulerState, backend: &str) -> bool {
        match self.config.per_backend_max {
            Some(limit) => state.per_backend.get(backend).copied().unwrap_or(0) >= limit,
            None => false,
        }
    }

    /// Admit as many queued tasks as the ceilings allow. Called on every
    /// submit and on every completion.
    fn dispatch(inner: &Arc<SchedulerInner>) {
        loop {
            let task = {
                let mut state = inner.lock_state();
                if state.running >= inner.config.max_concurrent {
                    return;
                }

                // Pop in priority order, setting aside tasks whose backend
                // is at its ceiling; they stay queued.
                let mut skipped = Vec::new();
                let mut picked = None;
                while let Some(task) = state.queue.pop() {
                    if inner.backend_saturated(&state, &task.backend) {
                        skipped.push(task);
                    } else {
                        picked = Some(task);
                        break;
                    }
                }
                for task in skipped {
                    state.queue.push(task);
                }

                let Some(task) = picked else { return };
                state.running += 1;
                *state.per_backend.entry(task.backend.clone()).or_insert(0) += 1;
                task
            };

            let inner = inner.clone();
            tokio::spawn(async move {
                let backend = task.backend;
                let result = task.work.await;
                // The submitter may have timed out; the result is discarded.
                let _ = task.reply.send(result);
                SchedulerInner::complete(&inner, &backend);
            });
        }
    }

    fn complete(inner: &Arc<SchedulerInner>, backend: &str) {
        {
            let mut state = inner.lock_state();
            state.running = state.running.saturating_sub(1);
            if let Some(count) = state.per_backend.get_mut(backend) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    state.per_backend.remove(backend);
                }
            }
        }
        inner.completed.fetch_add(1, Ordering::Relaxed);
        SchedulerInner::dispatch(inner);
    }
}
