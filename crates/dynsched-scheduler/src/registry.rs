//! Job registry.
//!
//! The durable record of every discovered declaration. Entries are added
//! once per [`JobId`] and are never removed, so every reconciliation pass
//! re-resolves the full set of jobs the process knows about.

use std::collections::HashSet;

use parking_lot::RwLock;
use tracing::debug;

use dynsched_protocols::{JobDeclaration, JobId};

#[derive(Default)]
struct RegistryInner {
    declarations: Vec<JobDeclaration>,
    ids: HashSet<JobId>,
}

/// Idempotent, insertion-ordered store of job declarations.
#[derive(Default)]
pub struct JobRegistry {
    inner: RwLock<RegistryInner>,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a declaration. Returns `false` when the job was already known,
    /// in which case the registry is left untouched.
    pub fn record(&self, decl: JobDeclaration) -> bool {
        let mut inner = self.inner.write();
        if !inner.ids.insert(decl.id.clone()) {
            debug!(job = %decl.id, "Job already recorded, ignoring");
            return false;
        }
        debug!(job = %decl.id, "Recorded job declaration");
        inner.declarations.push(decl);
        true
    }

    /// Every declaration, in discovery order.
    pub fn all(&self) -> Vec<JobDeclaration> {
        self.inner.read().declarations.clone()
    }

    pub fn ids(&self) -> Vec<JobId> {
        self.inner
            .read()
            .declarations
            .iter()
            .map(|d| d.id.clone())
            .collect()
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.inner.read().ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynsched_protocols::{Callable, ScheduleAttributes};
    use std::time::Duration;

    fn decl(owner: &str, method: &str) -> JobDeclaration {
        JobDeclaration::new(
            JobId::new(owner, method),
            Callable::blocking(|| {}),
            ScheduleAttributes::new().fixed_rate(Duration::from_secs(1)),
        )
    }

    #[test]
    fn test_record_once() {
        let registry = JobRegistry::new();
        assert!(registry.is_empty());

        assert!(registry.record(decl("CustomerTask", "job1")));
        assert!(!registry.record(decl("CustomerTask", "job1")));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&JobId::new("CustomerTask", "job1")));
    }

    #[test]
    fn test_rerecord_keeps_first_declaration() {
        let registry = JobRegistry::new();
        registry.record(decl("A", "x"));

        let mut replacement = decl("A", "x");
        replacement.attributes = ScheduleAttributes::new().cron("0 * * * * *");
        registry.record(replacement);

        let all = registry.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].attributes.fixed_rate, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_discovery_order() {
        let registry = JobRegistry::new();
        registry.record(decl("B", "second"));
        registry.record(decl("A", "first"));
        registry.record(decl("C", "third"));

        let ids: Vec<String> = registry.ids().iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["B::second", "A::first", "C::third"]);
    }

    #[test]
    fn test_same_method_different_owner() {
        let registry = JobRegistry::new();
        assert!(registry.record(decl("A", "run")));
        assert!(registry.record(decl("B", "run")));
        assert_eq!(registry.len(), 2);
    }
}
