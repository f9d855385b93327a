use super::*;
use std::time::Duration;

use dynsched_config::SaturationPolicy;
use dynsched_protocols::{Callable, ScheduleAttributes};
use tokio::runtime::Handle;

use crate::executor::TokioExecutor;
use crate::source::MemoryConfigSource;
use crate::watcher::ConfigWatcher;

struct Harness {
    source: Arc<MemoryConfigSource>,
    watcher: Arc<ConfigWatcher>,
    registry: Arc<JobRegistry>,
    registrar: Arc<TaskRegistrar>,
    controller: Arc<ReconciliationController>,
}

fn harness(values: &[(&str, &str)]) -> Harness {
    let source = Arc::new(MemoryConfigSource::with_values(values.iter().copied()));
    let watcher = Arc::new(ConfigWatcher::new(source.clone(), Duration::from_secs(10)));
    let registry = Arc::new(JobRegistry::new());
    let executor = Arc::new(TokioExecutor::new(Handle::current(), 8, SaturationPolicy::Wait));
    let registrar = Arc::new(TaskRegistrar::new(Some(executor)));
    let controller = Arc::new(ReconciliationController::new(
        registry.clone(),
        registrar.clone(),
        watcher.watch(),
    ));
    Harness {
        source,
        watcher,
        registry,
        registrar,
        controller,
    }
}

fn record(registry: &JobRegistry, method: &str, attrs: ScheduleAttributes) {
    registry.record(JobDeclaration::new(
        JobId::new("Test", method),
        Callable::from_async(|| async {}),
        attrs,
    ));
}

fn live_names(registrar: &TaskRegistrar) -> Vec<String> {
    let mut names: Vec<String> = registrar
        .live_jobs()
        .iter()
        .map(|j| j.method.clone())
        .collect();
    names.sort();
    names
}

#[tokio::test(start_paused = true)]
async fn test_pass_registers_resolvable_enabled_jobs() {
    let h = harness(&[("b_cron", "not a cron"), ("c_enable", "off")]);
    h.watcher.prime().await.unwrap();

    record(&h.registry, "a", ScheduleAttributes::new().fixed_rate(Duration::from_secs(1)));
    record(&h.registry, "b", ScheduleAttributes::new().cron_key("b_cron"));
    record(
        &h.registry,
        "c",
        ScheduleAttributes::new()
            .fixed_delay(Duration::from_secs(1))
            .enable_key("c_enable"),
    );

    let report = h.controller.reconcile().await;

    assert_eq!(report.pass, 1);
    assert_eq!(report.resolved, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].job, "Test::b");
    assert_eq!(report.registration.scheduled, 1);
    assert_eq!(report.registration.disabled, 1);
    assert_eq!(live_names(&h.registrar), vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_passes_never_duplicate() {
    let h = harness(&[]);
    h.watcher.prime().await.unwrap();
    record(&h.registry, "a", ScheduleAttributes::new().fixed_rate(Duration::from_secs(1)));
    record(&h.registry, "b", ScheduleAttributes::new().fixed_rate(Duration::from_secs(2)));

    h.controller.reconcile().await;
    let report = h.controller.reconcile().await;

    assert_eq!(report.pass, 2);
    assert_eq!(report.cancelled, 2);
    assert_eq!(h.registrar.live_count(), 2);
    assert_eq!(live_names(&h.registrar), vec!["a", "b"]);
    assert_eq!(h.controller.passes(), 2);
    assert_eq!(h.controller.last_report().map(|r| r.pass), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_pass_uses_latest_snapshot() {
    let h = harness(&[("rate", "1000")]);
    h.watcher.prime().await.unwrap();
    record(&h.registry, "a", ScheduleAttributes::new().fixed_rate_key("rate"));

    h.controller.reconcile().await;
    assert_eq!(h.registrar.live()[0].trigger, "fixed-rate 1000ms (initial 0ms)");

    h.source.set("rate", "250");
    h.watcher.tick().await;
    let report = h.controller.reconcile().await;

    assert_eq!(report.snapshot_version, 2);
    assert_eq!(h.registrar.live()[0].trigger, "fixed-rate 250ms (initial 0ms)");
}

#[tokio::test(start_paused = true)]
async fn test_strict_pass_aborts_without_touching_live_set() {
    let h = harness(&[]);
    h.watcher.prime().await.unwrap();
    record(&h.registry, "a", ScheduleAttributes::new().fixed_rate(Duration::from_secs(1)));
    h.controller.reconcile().await;

    record(
        &h.registry,
        "bad",
        ScheduleAttributes::new()
            .cron("0 * * * * *")
            .fixed_delay(Duration::from_secs(1)),
    );

    let err = h.controller.reconcile_strict().await.unwrap_err();
    match err {
        SchedulerError::InvalidDeclaration { job, source } => {
            assert_eq!(job.method, "bad");
            assert!(matches!(source, ValidationError::ExactlyOneRequired { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(live_names(&h.registrar), vec!["a"]);
    assert_eq!(h.controller.passes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_reconciles_on_change_event() {
    let h = harness(&[("a_enable", "true")]);
    h.watcher.prime().await.unwrap();
    record(
        &h.registry,
        "a",
        ScheduleAttributes::new()
            .fixed_rate(Duration::from_secs(1))
            .enable_key("a_enable"),
    );
    h.controller.reconcile().await;
    assert_eq!(h.registrar.live_count(), 1);

    let token = CancellationToken::new();
    let task = tokio::spawn(
        h.controller
            .clone()
            .run(h.watcher.subscribe(), token.clone()),
    );

    h.source.set("a_enable", "false");
    h.watcher.tick().await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(h.registrar.live_count(), 0);
    assert_eq!(h.controller.passes(), 2);

    token.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_queued_events_coalesce_into_one_pass() {
    let h = harness(&[("k", "1")]);
    h.watcher.prime().await.unwrap();
    record(&h.registry, "a", ScheduleAttributes::new().fixed_rate(Duration::from_secs(1)));

    let events = h.watcher.subscribe();
    for value in ["2", "3", "4"] {
        h.source.set("k", value);
        h.watcher.tick().await;
    }

    let token = CancellationToken::new();
    let task = tokio::spawn(h.controller.clone().run(events, token.clone()));
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(h.controller.passes(), 1);
    assert_eq!(h.controller.last_report().unwrap().snapshot_version, 4);

    token.cancel();
    task.await.unwrap();
}

#[test]
fn test_drain_counts_pending() {
    let (tx, mut rx) = broadcast::channel(4);
    for version in 1..=3 {
        tx.send(ConfigChange {
            version,
            changed_keys: vec![],
        })
        .unwrap();
    }
    assert_eq!(drain(&mut rx), 3);
    assert_eq!(drain(&mut rx), 0);
}
