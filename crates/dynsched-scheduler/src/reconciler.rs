//! Reconciliation controller.
//!
//! A pass replaces the whole live task set: resolve every registry entry
//! against the latest snapshot, cancel every live task, register the result.
//! Cancellation always completes before the first registration, and passes
//! are serialised so two of them never interleave.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{Mutex, broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use dynsched_protocols::{
    ConfigChange, ConfigSnapshot, JobDeclaration, JobId, ResolvedSchedule, ValidationError,
};

use crate::error::{SchedulerError, SchedulerResult};
use crate::registrar::{RegistrationReport, TaskRegistrar};
use crate::registry::JobRegistry;
use crate::resolver;

/// A declaration left out of a pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedJob {
    pub job: String,
    pub reason: String,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub pass: u64,
    pub snapshot_version: u64,
    pub cancelled: usize,
    pub resolved: usize,
    pub skipped: Vec<SkippedJob>,
    pub registration: RegistrationReport,
    pub completed_at: DateTime<Utc>,
}

type Resolution = (
    Vec<(JobDeclaration, ResolvedSchedule)>,
    Vec<(JobId, ValidationError)>,
);

/// Drives cancel / resolve / register passes.
pub struct ReconciliationController {
    registry: Arc<JobRegistry>,
    registrar: Arc<TaskRegistrar>,
    snapshots: watch::Receiver<Arc<ConfigSnapshot>>,
    pass_lock: Mutex<()>,
    passes: AtomicU64,
    last_report: RwLock<Option<ReconcileReport>>,
}

impl ReconciliationController {
    pub fn new(
        registry: Arc<JobRegistry>,
        registrar: Arc<TaskRegistrar>,
        snapshots: watch::Receiver<Arc<ConfigSnapshot>>,
    ) -> Self {
        Self {
            registry,
            registrar,
            snapshots,
            pass_lock: Mutex::new(()),
            passes: AtomicU64::new(0),
            last_report: RwLock::new(None),
        }
    }

    /// Completed pass count.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    pub fn last_report(&self) -> Option<ReconcileReport> {
        self.last_report.read().clone()
    }

    /// Run one pass. Declarations that fail to resolve are logged and left
    /// out of this pass only.
    pub async fn reconcile(&self) -> ReconcileReport {
        let _guard = self.pass_lock.lock().await;
        let snapshot = self.latest();
        let resolution = self.resolve_all(&snapshot);
        self.apply(&snapshot, resolution)
    }

    /// Run one pass, refusing to touch the live set if any declaration fails
    /// to resolve.
    pub async fn reconcile_strict(&self) -> SchedulerResult<ReconcileReport> {
        let _guard = self.pass_lock.lock().await;
        let snapshot = self.latest();
        let (entries, failures) = self.resolve_all(&snapshot);
        if let Some((job, source)) = failures.into_iter().next() {
            return Err(SchedulerError::InvalidDeclaration { job, source });
        }
        Ok(self.apply(&snapshot, (entries, Vec::new())))
    }

    /// Reconcile on every change event until `token` is cancelled or the
    /// watcher goes away.
    pub async fn run(
        self: Arc<Self>,
        mut events: broadcast::Receiver<ConfigChange>,
        token: CancellationToken,
    ) {
        info!("Reconciler started");

        loop {
            let received = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                received = events.recv() => received,
            };

            match received {
                Ok(change) => {
                    info!(
                        version = change.version,
                        changed = ?change.changed_keys,
                        "Config change received, rebuilding scheduled tasks"
                    );
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Change events lagged, reconciling against latest snapshot");
                }
                Err(RecvError::Closed) => break,
            }

            // Every pass reads the latest snapshot, so queued events add nothing.
            let drained = drain(&mut events);
            if drained > 0 {
                info!(drained, "Coalesced queued change events");
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = self.reconcile() => {}
            }
        }

        info!("Reconciler stopped");
    }

    fn latest(&self) -> Arc<ConfigSnapshot> {
        self.snapshots.borrow().clone()
    }

    fn resolve_all(&self, snapshot: &ConfigSnapshot) -> Resolution {
        let mut entries = Vec::new();
        let mut failures = Vec::new();

        for decl in self.registry.all() {
            match resolver::resolve(&decl, snapshot) {
                Ok(schedule) => entries.push((decl, schedule)),
                Err(e) => {
                    warn!(job = %decl.id, error = %e, "Invalid schedule declaration, skipping");
                    failures.push((decl.id, e));
                }
            }
        }

        (entries, failures)
    }

    fn apply(&self, snapshot: &ConfigSnapshot, (entries, failures): Resolution) -> ReconcileReport {
        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;

        let cancelled = self.registrar.cancel_all();
        let resolved = entries.len();
        let registration = self.registrar.register_all(entries);

        let report = ReconcileReport {
            pass,
            snapshot_version: snapshot.version(),
            cancelled,
            resolved,
            skipped: failures
                .into_iter()
                .map(|(job, e)| SkippedJob {
                    job: job.to_string(),
                    reason: e.to_string(),
                })
                .collect(),
            registration,
            completed_at: Utc::now(),
        };

        info!(
            pass,
            version = report.snapshot_version,
            cancelled,
            scheduled = registration.scheduled,
            disabled = registration.disabled,
            failed = registration.failed,
            skipped = report.skipped.len(),
            "Reconciliation pass complete"
        );

        *self.last_report.write() = Some(report.clone());
        report
    }
}

fn drain(events: &mut broadcast::Receiver<ConfigChange>) -> usize {
    let mut drained = 0;
    loop {
        match events.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => drained += 1,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    drained
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
