//! Task registrar.
//!
//! The only owner of live tasks. A live set is built by [`TaskRegistrar::register_all`]
//! and torn down whole by [`TaskRegistrar::cancel_all`]; individual tasks are
//! never patched in place.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use dynsched_protocols::{Executor, JobDeclaration, JobId, ResolvedSchedule, TaskHandle};

/// One job bound to an executor task.
#[derive(Debug, Clone)]
pub struct LiveTask {
    pub job: JobId,
    pub schedule: ResolvedSchedule,
    pub handle: TaskHandle,
    pub registered_at: DateTime<Utc>,
}

impl LiveTask {
    pub fn info(&self) -> LiveTaskInfo {
        LiveTaskInfo {
            job: self.job.to_string(),
            task_id: self.handle.id(),
            trigger: self.schedule.trigger.to_string(),
            kind: self.schedule.trigger.kind().to_string(),
            state: self.handle.state().to_string(),
            fire_count: self.handle.fire_count(),
            last_fired: self.handle.last_fired(),
            registered_at: self.registered_at,
        }
    }
}

/// Serializable summary of a live task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveTaskInfo {
    pub job: String,
    pub task_id: Uuid,
    pub trigger: String,
    pub kind: String,
    pub state: String,
    pub fire_count: u64,
    pub last_fired: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
}

/// Outcome of one `register_all` batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReport {
    pub scheduled: usize,
    pub disabled: usize,
    pub failed: usize,
}

/// Binds resolved schedules to executor tasks and owns the resulting handles.
pub struct TaskRegistrar {
    executor: Option<Arc<dyn Executor>>,
    live: Mutex<Vec<LiveTask>>,
}

impl TaskRegistrar {
    pub fn new(executor: Option<Arc<dyn Executor>>) -> Self {
        Self {
            executor,
            live: Mutex::new(Vec::new()),
        }
    }

    pub fn executor(&self) -> Option<&Arc<dyn Executor>> {
        self.executor.as_ref()
    }

    /// Bind every enabled entry. Disabled entries are skipped and a binding
    /// failure only affects its own entry.
    pub fn register_all<I>(&self, entries: I) -> RegistrationReport
    where
        I: IntoIterator<Item = (JobDeclaration, ResolvedSchedule)>,
    {
        let mut report = RegistrationReport::default();
        let mut live = self.live.lock();

        if self.executor.is_none() {
            error!("No executor available, scheduled jobs will not run");
        }

        for (decl, schedule) in entries {
            if !schedule.enabled {
                warn!(job = %decl.id, trigger = %schedule.trigger, "Job disabled, not started");
                report.disabled += 1;
                continue;
            }

            let Some(executor) = self.executor.as_ref() else {
                report.failed += 1;
                continue;
            };

            match executor.schedule(&decl.id, &schedule.trigger, decl.callable.clone()) {
                Ok(handle) => {
                    if let Some(pos) = live.iter().position(|t| t.job == decl.id) {
                        let stale = live.swap_remove(pos);
                        stale.handle.cancel();
                        warn!(job = %decl.id, "Replaced an already live task");
                    }
                    info!(job = %decl.id, trigger = %schedule.trigger, task = %handle.id(), "Job scheduled");
                    live.push(LiveTask {
                        job: decl.id,
                        schedule,
                        handle,
                        registered_at: Utc::now(),
                    });
                    report.scheduled += 1;
                }
                Err(e) => {
                    error!(job = %decl.id, trigger = %schedule.trigger, error = %e, "Failed to schedule job");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Cancel and drop every live task. Returns how many were cancelled.
    ///
    /// In-flight async invocations are interrupted at their next await point;
    /// blocking ones run to completion. No new invocation starts afterwards.
    pub fn cancel_all(&self) -> usize {
        let tasks: Vec<LiveTask> = std::mem::take(&mut *self.live.lock());
        for task in &tasks {
            task.handle.cancel();
        }
        if !tasks.is_empty() {
            info!(count = tasks.len(), "Cancelled live tasks");
        }
        tasks.len()
    }

    pub fn live(&self) -> Vec<LiveTaskInfo> {
        self.live.lock().iter().map(LiveTask::info).collect()
    }

    pub fn live_jobs(&self) -> Vec<JobId> {
        self.live.lock().iter().map(|t| t.job.clone()).collect()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}

#[cfg(test)]
#[path = "registrar_tests.rs"]
mod tests;
