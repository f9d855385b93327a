//! Executor protocol and task handles.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::ExecutorError;
use crate::job::{Callable, JobId};
use crate::schedule::Trigger;

/// Timer and worker-pool primitive the registrar binds tasks to.
pub trait Executor: Send + Sync {
    /// Bind `callable` to `trigger`. The returned handle cancels the task.
    fn schedule(
        &self,
        job: &JobId,
        trigger: &Trigger,
        callable: Callable,
    ) -> Result<TaskHandle, ExecutorError>;

    /// Run `callable` once on the bounded pool.
    fn execute(&self, name: &str, callable: Callable) -> Result<TaskHandle, ExecutorError>;

    /// Upper bound on concurrently running invocations.
    fn capacity(&self) -> usize;

    /// Invocations running right now.
    fn active_invocations(&self) -> usize;
}

/// Observable state of a live task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for its next firing.
    Scheduled,
    /// At least one invocation is in flight.
    Running,
    /// Cancelled; terminal.
    Cancelled,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::Scheduled => "scheduled",
            TaskState::Running => "running",
            TaskState::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Default)]
struct TaskCounters {
    running: AtomicU32,
    fire_count: AtomicU64,
    last_fired_ms: AtomicU64,
}

/// Cancellable handle on a task bound to an executor.
///
/// Clones share the same token and counters.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: Uuid,
    token: CancellationToken,
    counters: Arc<TaskCounters>,
}

impl TaskHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            token,
            counters: Arc::new(TaskCounters::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Token the executor's timer loop and invocations listen on.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Stop scheduling and interrupt in-flight invocations.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn state(&self) -> TaskState {
        if self.is_cancelled() {
            TaskState::Cancelled
        } else if self.counters.running.load(Ordering::SeqCst) > 0 {
            TaskState::Running
        } else {
            TaskState::Scheduled
        }
    }

    /// Number of invocations started so far.
    pub fn fire_count(&self) -> u64 {
        self.counters.fire_count.load(Ordering::Relaxed)
    }

    /// Start time of the most recent invocation.
    pub fn last_fired(&self) -> Option<DateTime<Utc>> {
        match self.counters.last_fired_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => DateTime::from_timestamp_millis(ms as i64),
        }
    }

    /// Record that an invocation started. Called by executors.
    pub fn invocation_started(&self) {
        self.counters.fire_count.fetch_add(1, Ordering::Relaxed);
        self.counters.running.fetch_add(1, Ordering::SeqCst);
        self.counters
            .last_fired_ms
            .store(Utc::now().timestamp_millis().max(1) as u64, Ordering::Relaxed);
    }

    /// Record that an invocation finished or was abandoned. Called by executors.
    pub fn invocation_finished(&self) {
        self.counters.running.fetch_sub(1, Ordering::SeqCst);
    }
}
