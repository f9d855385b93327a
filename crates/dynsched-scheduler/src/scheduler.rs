//! DynamicScheduler - facade wiring watcher, registry, registrar and reconciler.
//!
//! Boot is two-phase: declarations are recorded first (directly or through a
//! [`JobProvider`]), then [`DynamicScheduler::start`] seeds the config
//! snapshot, runs the initial pass and spawns the background loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use dynsched_config::{InvalidDeclarationPolicy, SchedulerConfig};
use dynsched_protocols::{ConfigSnapshot, ConfigSource, Executor, JobDeclaration, JobProvider};

use crate::error::{SchedulerError, SchedulerResult};
use crate::executor::TokioExecutor;
use crate::reconciler::{ReconcileReport, ReconciliationController};
use crate::registrar::{LiveTaskInfo, TaskRegistrar};
use crate::registry::JobRegistry;
use crate::watcher::ConfigWatcher;

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub started: bool,
    pub registered_jobs: usize,
    pub snapshot_version: u64,
    pub snapshot_fetched_at: Option<DateTime<Utc>>,
    pub watcher_ticks: u64,
    pub watcher_failures: u64,
    pub passes: u64,
    pub last_pass: Option<ReconcileReport>,
    pub pool_capacity: Option<usize>,
    pub active_invocations: usize,
    pub live_tasks: Vec<LiveTaskInfo>,
}

/// Builder for [`DynamicScheduler`].
pub struct DynamicSchedulerBuilder {
    config: SchedulerConfig,
    source: Arc<dyn ConfigSource>,
    executor: Option<Arc<dyn Executor>>,
    watch_interval: Option<Duration>,
}

impl DynamicSchedulerBuilder {
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a specific executor instead of the default tokio one.
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Override the watcher interval from the config.
    pub fn watch_interval(mut self, interval: Duration) -> Self {
        self.watch_interval = Some(interval);
        self
    }

    pub fn build(self) -> DynamicScheduler {
        let executor = self.executor.or_else(|| {
            TokioExecutor::try_current(&self.config)
                .map(|executor| Arc::new(executor) as Arc<dyn Executor>)
        });
        if executor.is_none() {
            error!("No tokio runtime available for the default executor");
        }

        let interval = self
            .watch_interval
            .unwrap_or_else(|| self.config.watch_interval());
        let watcher = Arc::new(ConfigWatcher::new(self.source, interval));
        let registry = Arc::new(JobRegistry::new());
        let registrar = Arc::new(TaskRegistrar::new(executor));
        let reconciler = Arc::new(ReconciliationController::new(
            registry.clone(),
            registrar.clone(),
            watcher.watch(),
        ));

        DynamicScheduler {
            config: self.config,
            registry,
            watcher,
            registrar,
            reconciler,
            token: CancellationToken::new(),
            started: AtomicBool::new(false),
            background: Mutex::new(Vec::new()),
        }
    }
}

/// Declarative scheduler whose schedules follow an external config store.
pub struct DynamicScheduler {
    config: SchedulerConfig,
    registry: Arc<JobRegistry>,
    watcher: Arc<ConfigWatcher>,
    registrar: Arc<TaskRegistrar>,
    reconciler: Arc<ReconciliationController>,
    token: CancellationToken,
    started: AtomicBool,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl DynamicScheduler {
    pub fn builder(source: Arc<dyn ConfigSource>) -> DynamicSchedulerBuilder {
        DynamicSchedulerBuilder {
            config: SchedulerConfig::default(),
            source,
            executor: None,
            watch_interval: None,
        }
    }

    /// Record one declaration. Returns `false` if the job was already known.
    pub fn record(&self, decl: JobDeclaration) -> bool {
        self.registry.record(decl)
    }

    /// Record every declaration a provider offers. Returns how many were new.
    pub fn discover(&self, provider: Arc<dyn JobProvider>) -> usize {
        let owner = provider.owner().to_string();
        let recorded = provider
            .declarations()
            .into_iter()
            .filter(|decl| self.registry.record(decl.clone()))
            .count();
        info!(owner = %owner, recorded, "Discovered scheduled jobs");
        recorded
    }

    /// Seed the snapshot, run the initial pass and start the background loops.
    ///
    /// A failed boot fetch is logged; the pass then runs against the empty
    /// snapshot and the first successful tick seeds it. With the `abort`
    /// policy a declaration that fails to resolve fails the whole start.
    pub async fn start(&self) -> SchedulerResult<ReconcileReport> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyStarted);
        }

        if let Err(e) = self.watcher.prime().await {
            warn!(
                source = self.watcher.source_name(),
                error = %e,
                "Initial config fetch failed, starting from declared literals"
            );
        }

        let report = match self.config.on_invalid {
            InvalidDeclarationPolicy::Skip => self.reconciler.reconcile().await,
            InvalidDeclarationPolicy::Abort => match self.reconciler.reconcile_strict().await {
                Ok(report) => report,
                Err(e) => {
                    self.started.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            },
        };

        let events = self.watcher.subscribe();
        let watcher_task = tokio::spawn(self.watcher.clone().run(self.token.child_token()));
        let reconciler_task =
            tokio::spawn(self.reconciler.clone().run(events, self.token.child_token()));
        self.background.lock().extend([watcher_task, reconciler_task]);

        info!(
            jobs = self.registry.len(),
            scheduled = report.registration.scheduled,
            interval_ms = self.watcher.interval().as_millis() as u64,
            "Dynamic scheduler started"
        );
        Ok(report)
    }

    /// Rebuild every task against the current snapshot now.
    pub async fn reconcile_now(&self) -> SchedulerResult<ReconcileReport> {
        if !self.is_started() {
            return Err(SchedulerError::NotStarted);
        }
        Ok(self.reconciler.reconcile().await)
    }

    /// Stop the background loops and cancel every live task.
    pub async fn shutdown(&self) {
        self.token.cancel();
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.background.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
        let cancelled = self.registrar.cancel_all();
        info!(cancelled, "Dynamic scheduler stopped");
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.token.is_cancelled()
    }

    pub fn status(&self) -> SchedulerStatus {
        let snapshot = self.watcher.snapshot();
        let executor = self.registrar.executor();
        SchedulerStatus {
            started: self.is_started(),
            registered_jobs: self.registry.len(),
            snapshot_version: snapshot.version(),
            snapshot_fetched_at: snapshot.fetched_at(),
            watcher_ticks: self.watcher.ticks(),
            watcher_failures: self.watcher.failures(),
            passes: self.reconciler.passes(),
            last_pass: self.reconciler.last_report(),
            pool_capacity: executor.map(|e| e.capacity()),
            active_invocations: executor.map(|e| e.active_invocations()).unwrap_or(0),
            live_tasks: self.registrar.live(),
        }
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.watcher.snapshot()
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn watcher(&self) -> &Arc<ConfigWatcher> {
        &self.watcher
    }

    pub fn registrar(&self) -> &Arc<TaskRegistrar> {
        &self.registrar
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
