//! Tokio-backed executor.
//!
//! Every scheduled task is one timer task on the runtime that waits for the
//! next firing and hands the callable to a bounded worker pool. The pool is
//! a semaphore; firings never run on the timer task itself.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use cron::Schedule;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use dynsched_config::{SaturationPolicy, SchedulerConfig};
use dynsched_protocols::{
    Callable, CronZone, Executor, ExecutorError, JobId, TaskHandle, Trigger,
};

/// Executor running jobs on a tokio runtime with a bounded worker pool.
pub struct TokioExecutor {
    runtime: Handle,
    permits: Arc<Semaphore>,
    capacity: usize,
    saturation: SaturationPolicy,
    active: Arc<AtomicUsize>,
    shutdown: CancellationToken,
}

impl TokioExecutor {
    /// Create an executor on `runtime` allowing `pool_size` concurrent invocations.
    pub fn new(runtime: Handle, pool_size: usize, saturation: SaturationPolicy) -> Self {
        let capacity = pool_size.max(1);
        Self {
            runtime,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            saturation,
            active: Arc::new(AtomicUsize::new(0)),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn from_config(runtime: Handle, config: &SchedulerConfig) -> Self {
        Self::new(runtime, config.pool_size, config.saturation)
    }

    /// Create an executor on the runtime the caller is running in, if any.
    pub fn try_current(config: &SchedulerConfig) -> Option<Self> {
        Handle::try_current()
            .ok()
            .map(|runtime| Self::from_config(runtime, config))
    }

    pub fn saturation(&self) -> SaturationPolicy {
        self.saturation
    }

    /// Cancel every task and refuse new ones.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        debug!("Executor shut down");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn new_handle(&self) -> Result<TaskHandle, ExecutorError> {
        if self.is_shutdown() {
            return Err(ExecutorError::Shutdown);
        }
        Ok(TaskHandle::new(self.shutdown.child_token()))
    }

    fn invoker(&self, label: String, callable: Callable, handle: TaskHandle) -> Invoker {
        Invoker {
            label: Arc::from(label),
            callable,
            handle,
            permits: self.permits.clone(),
            saturation: self.saturation,
            active: self.active.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl Executor for TokioExecutor {
    fn schedule(
        &self,
        job: &JobId,
        trigger: &Trigger,
        callable: Callable,
    ) -> Result<TaskHandle, ExecutorError> {
        let plan = Plan::from_trigger(trigger)?;
        let handle = self.new_handle()?;
        let invoker = self.invoker(job.to_string(), callable, handle.clone());

        debug!(job = %job, trigger = %trigger, task = %handle.id(), "Scheduling task");
        self.runtime.spawn(plan.drive(invoker));
        Ok(handle)
    }

    fn execute(&self, name: &str, callable: Callable) -> Result<TaskHandle, ExecutorError> {
        let handle = self.new_handle()?;
        let invoker = self.invoker(name.to_string(), callable, handle.clone());
        self.runtime.spawn(async move { invoker.invoke().await });
        Ok(handle)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn active_invocations(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Validated form of a trigger.
enum Plan {
    Cron {
        schedule: Box<Schedule>,
        zone: CronZone,
    },
    FixedDelay {
        delay: Duration,
        initial_delay: Duration,
    },
    FixedRate {
        period: Duration,
        initial_delay: Duration,
    },
}

impl Plan {
    fn from_trigger(trigger: &Trigger) -> Result<Self, ExecutorError> {
        match trigger {
            Trigger::Cron { expression, zone } => {
                let schedule = Schedule::from_str(expression)
                    .map_err(|e| ExecutorError::InvalidCron(format!("{expression}: {e}")))?;
                Ok(Plan::Cron {
                    schedule: Box::new(schedule),
                    zone: *zone,
                })
            }
            Trigger::FixedDelay {
                delay,
                initial_delay,
            } => {
                if delay.is_zero() {
                    return Err(ExecutorError::ZeroPeriod {
                        kind: trigger.kind(),
                    });
                }
                Ok(Plan::FixedDelay {
                    delay: *delay,
                    initial_delay: *initial_delay,
                })
            }
            Trigger::FixedRate {
                period,
                initial_delay,
            } => {
                if period.is_zero() {
                    return Err(ExecutorError::ZeroPeriod {
                        kind: trigger.kind(),
                    });
                }
                Ok(Plan::FixedRate {
                    period: *period,
                    initial_delay: *initial_delay,
                })
            }
        }
    }

    /// Timer loop for one task. Returns once the task's token is cancelled.
    async fn drive(self, invoker: Invoker) {
        let token = invoker.handle.token().clone();

        match self {
            Plan::FixedRate {
                period,
                initial_delay,
            } => {
                let mut ticker = tokio::time::interval_at(Instant::now() + initial_delay, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {}
                    }
                    // Dispatched, not awaited: overruns may overlap the next firing.
                    let invoker = invoker.clone();
                    invoker.runtime.clone().spawn(async move { invoker.invoke().await });
                }
            }
            Plan::FixedDelay {
                delay,
                initial_delay,
            } => {
                if !sleep_or_cancelled(&token, initial_delay).await {
                    return;
                }
                loop {
                    invoker.invoke().await;
                    if !sleep_or_cancelled(&token, delay).await {
                        break;
                    }
                }
            }
            Plan::Cron { schedule, zone } => {
                let mut last: Option<DateTime<Utc>> = None;
                loop {
                    let now = Utc::now();
                    let from = match last {
                        Some(last) if last > now => last,
                        _ => now,
                    };
                    let Some(next) = next_after(&schedule, zone, from) else {
                        debug!(job = %invoker.label, "Cron schedule has no upcoming fire time");
                        break;
                    };
                    let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                    if !sleep_or_cancelled(&token, wait).await {
                        break;
                    }
                    last = Some(next);
                    invoker.invoke().await;
                }
            }
        }

        debug!(job = %invoker.label, task = %invoker.handle.id(), "Task loop stopped");
    }
}

fn next_after(schedule: &Schedule, zone: CronZone, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match zone {
        CronZone::Local => schedule
            .after(&after.with_timezone(&Local))
            .next()
            .map(|t| t.with_timezone(&Utc)),
        CronZone::Named(tz) => schedule
            .after(&after.with_timezone(&tz))
            .next()
            .map(|t| t.with_timezone(&Utc)),
    }
}

/// Returns `false` if the token fired first.
async fn sleep_or_cancelled(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Everything one firing needs, cloned into each dispatched invocation.
#[derive(Clone)]
struct Invoker {
    label: Arc<str>,
    callable: Callable,
    handle: TaskHandle,
    permits: Arc<Semaphore>,
    saturation: SaturationPolicy,
    active: Arc<AtomicUsize>,
    runtime: Handle,
}

impl Invoker {
    async fn invoke(&self) {
        let token = self.handle.token();

        let _permit = match self.saturation {
            SaturationPolicy::Wait => tokio::select! {
                biased;
                _ = token.cancelled() => return,
                permit = self.permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            },
            SaturationPolicy::Drop => match self.permits.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    warn!(job = %self.label, "Worker pool saturated, dropping firing");
                    return;
                }
            },
        };

        if token.is_cancelled() {
            return;
        }

        let _in_flight = InFlight::enter(&self.handle, &self.active);
        debug!(job = %self.label, fire_count = self.handle.fire_count(), "Firing job");

        let outcome = match &self.callable {
            Callable::Async(f) => {
                let mut task = self.runtime.spawn(f());
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        task.abort();
                        debug!(job = %self.label, "Invocation interrupted by cancellation");
                        return;
                    }
                    result = &mut task => result,
                }
            }
            // Blocking jobs cannot be interrupted once started; they run to
            // completion. Cancellation is re-checked when a pool thread picks
            // the body up.
            Callable::Blocking(f) => {
                if token.is_cancelled() {
                    return;
                }
                let f = f.clone();
                let token = token.clone();
                let label = self.label.clone();
                self.runtime
                    .spawn_blocking(move || {
                        if !run_unless_cancelled(&token, || f()) {
                            debug!(job = %label, "Cancelled before the blocking body started");
                        }
                    })
                    .await
            }
        };

        if let Err(e) = outcome {
            if e.is_panic() {
                error!(job = %self.label, "Job panicked");
            }
        }
    }
}

/// Runs `body` unless `token` is already cancelled. Returns whether it ran.
fn run_unless_cancelled(token: &CancellationToken, body: impl FnOnce()) -> bool {
    if token.is_cancelled() {
        return false;
    }
    body();
    true
}

/// Tracks one running invocation for the task handle and the pool gauge.
struct InFlight<'a> {
    handle: &'a TaskHandle,
    active: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(handle: &'a TaskHandle, active: &'a AtomicUsize) -> Self {
        handle.invocation_started();
        active.fetch_add(1, Ordering::SeqCst);
        Self { handle, active }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.handle.invocation_finished();
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
