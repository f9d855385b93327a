//! End-to-end tests for dynamic re-registration.
//!
//! These drive the public `DynamicScheduler` API against an in-memory config
//! store with tokio's paused clock, so watcher ticks and job firings are
//! deterministic.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;

use dynsched_config::SchedulerConfig;
use dynsched_protocols::{
    Callable, ConfigSource, JobDeclaration, JobId, ScheduleAttributes, SourceError,
    ValidationError,
};
use dynsched_scheduler::{DynamicScheduler, MemoryConfigSource, resolve};

// ============================================================================
// Test Helpers
// ============================================================================

const TICK: Duration = Duration::from_secs(1);

mock! {
    pub FlakySource {}

    #[async_trait]
    impl ConfigSource for FlakySource {
        async fn fetch_all(&self) -> Result<HashMap<String, String>, SourceError>;
    }
}

fn counting(counter: &Arc<AtomicU32>) -> Callable {
    let counter = counter.clone();
    Callable::from_async(move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    })
}

fn noop() -> Callable {
    Callable::from_async(|| async {})
}

fn scheduler_with(source: Arc<MemoryConfigSource>) -> DynamicScheduler {
    DynamicScheduler::builder(source)
        .config(SchedulerConfig::default())
        .watch_interval(TICK)
        .build()
}

/// Let one watcher tick and the reconciliation it triggers complete.
async fn next_tick() {
    tokio::time::sleep(TICK + Duration::from_millis(10)).await;
}

fn live_jobs(scheduler: &DynamicScheduler) -> Vec<String> {
    let mut jobs: Vec<String> = scheduler
        .status()
        .live_tasks
        .into_iter()
        .map(|t| t.job)
        .collect();
    jobs.sort();
    jobs
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_fixed_rate_fires_promptly_and_periodically() {
    let source = Arc::new(MemoryConfigSource::new());
    let scheduler = scheduler_with(source);
    let counter = Arc::new(AtomicU32::new(0));

    scheduler.record(JobDeclaration::new(
        JobId::new("Metrics", "flush"),
        counting(&counter),
        ScheduleAttributes::new()
            .fixed_rate(Duration::from_millis(1000))
            .initial_delay(Duration::ZERO),
    ));
    scheduler.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 4);

    scheduler.shutdown().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_enable_flip_cancels_and_restores_task() {
    let source = Arc::new(MemoryConfigSource::with_values([("job1_enable", "true")]));
    let scheduler = scheduler_with(source.clone());
    let counter = Arc::new(AtomicU32::new(0));

    scheduler.record(JobDeclaration::new(
        JobId::new("CustomerTask", "job1"),
        counting(&counter),
        ScheduleAttributes::new()
            .fixed_rate(Duration::from_millis(200))
            .enable_key("job1_enable"),
    ));
    scheduler.start().await.unwrap();
    assert_eq!(live_jobs(&scheduler), vec!["CustomerTask::job1"]);

    source.set("job1_enable", "false");
    next_tick().await;
    assert!(live_jobs(&scheduler).is_empty());

    let fired = counter.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(counter.load(Ordering::SeqCst), fired);

    source.set("job1_enable", "true");
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(live_jobs(&scheduler), vec!["CustomerTask::job1"]);
    assert!(counter.load(Ordering::SeqCst) > fired);

    scheduler.shutdown().await;
}

#[tokio::test]
async fn test_cron_with_fixed_delay_is_rejected() {
    let decl = JobDeclaration::new(
        JobId::new("Report", "daily"),
        noop(),
        ScheduleAttributes::new()
            .cron("0 0 6 * * *")
            .fixed_delay(Duration::from_secs(60)),
    );

    let err = resolve(&decl, &Default::default()).unwrap_err();
    assert_eq!(
        err,
        ValidationError::ExactlyOneRequired {
            found: vec!["cron", "fixedDelay"],
        }
    );

    // The scheduler keeps running without it.
    let scheduler = scheduler_with(Arc::new(MemoryConfigSource::new()));
    scheduler.record(decl);
    let report = scheduler.start().await.unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].reason.contains("cron, fixedDelay"));
    assert!(live_jobs(&scheduler).is_empty());
    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_config_key_change_reschedules() {
    let source = Arc::new(MemoryConfigSource::with_values([("job1_cron", "0 0 * * * *")]));
    let scheduler = scheduler_with(source.clone());

    scheduler.record(JobDeclaration::new(
        JobId::new("CustomerTask", "job1"),
        noop(),
        ScheduleAttributes::new().cron("0 30 4 * * *").cron_key("job1_cron"),
    ));
    scheduler.start().await.unwrap();
    assert_eq!(
        scheduler.status().live_tasks[0].trigger,
        "cron '0 0 * * * *' (local)"
    );

    source.set("job1_cron", "*/10 * * * * *");
    next_tick().await;

    let status = scheduler.status();
    assert_eq!(status.live_tasks.len(), 1);
    assert_eq!(status.live_tasks[0].trigger, "cron '*/10 * * * * *' (local)");
    assert_eq!(status.passes, 2);

    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_two_changes_in_one_tick_reconcile_once() {
    let source = Arc::new(MemoryConfigSource::with_values([
        ("job1_cron", "0 0 * * * *"),
        ("job2_cron", "0 0 * * * *"),
    ]));
    let scheduler = scheduler_with(source.clone());
    scheduler.record(JobDeclaration::new(
        JobId::new("CustomerTask", "job1"),
        noop(),
        ScheduleAttributes::new().cron_key("job1_cron"),
    ));
    scheduler.record(JobDeclaration::new(
        JobId::new("CustomerTask", "job2"),
        noop(),
        ScheduleAttributes::new().cron_key("job2_cron"),
    ));
    scheduler.start().await.unwrap();

    source.set("job1_cron", "0 5 * * * *");
    source.set("job2_cron", "0 10 * * * *");
    next_tick().await;

    let status = scheduler.status();
    assert_eq!(status.passes, 2);
    assert_eq!(status.live_tasks.len(), 2);

    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_first_tick_and_unchanged_ticks_do_not_reconcile() {
    let source = Arc::new(MemoryConfigSource::with_values([("job1_cron", "0 0 * * * *")]));
    let scheduler = scheduler_with(source.clone());
    scheduler.record(JobDeclaration::new(
        JobId::new("CustomerTask", "job1"),
        noop(),
        ScheduleAttributes::new().cron_key("job1_cron"),
    ));
    scheduler.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(scheduler.status().passes, 1);

    // A brand new key is captured silently.
    source.set("job9_cron", "0 0 * * * *");
    next_tick().await;
    let status = scheduler.status();
    assert_eq!(status.passes, 1);
    assert_eq!(scheduler.snapshot().get("job9_cron"), Some("0 0 * * * *"));

    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_live_set_matches_resolvable_enabled_jobs() {
    let source = Arc::new(MemoryConfigSource::with_values([
        ("a_rate", "500"),
        ("b_enable", "true"),
        ("c_cron", "0 * * * * *"),
    ]));
    let scheduler = scheduler_with(source.clone());
    scheduler.record(JobDeclaration::new(
        JobId::new("T", "a"),
        noop(),
        ScheduleAttributes::new().fixed_rate_key("a_rate"),
    ));
    scheduler.record(JobDeclaration::new(
        JobId::new("T", "b"),
        noop(),
        ScheduleAttributes::new()
            .fixed_delay(Duration::from_secs(1))
            .enable_key("b_enable"),
    ));
    scheduler.record(JobDeclaration::new(
        JobId::new("T", "c"),
        noop(),
        ScheduleAttributes::new().cron_key("c_cron"),
    ));
    scheduler.start().await.unwrap();
    assert_eq!(live_jobs(&scheduler), vec!["T::a", "T::b", "T::c"]);

    // One job becomes invalid, one gets disabled, one changes schedule.
    source.set("a_rate", "fast");
    source.set("b_enable", "no");
    source.set("c_cron", "*/30 * * * * *");
    next_tick().await;
    assert_eq!(live_jobs(&scheduler), vec!["T::c"]);

    let last = scheduler.status().last_pass.unwrap();
    assert_eq!(last.cancelled, 3);
    assert_eq!(last.registration.scheduled, 1);
    assert_eq!(last.registration.disabled, 1);
    assert_eq!(last.skipped.len(), 1);

    // The invalid job is retried against the next change and comes back.
    source.set("a_rate", "250");
    next_tick().await;
    assert_eq!(live_jobs(&scheduler), vec!["T::a", "T::c"]);

    // No duplicates after repeated manual passes.
    scheduler.reconcile_now().await.unwrap();
    scheduler.reconcile_now().await.unwrap();
    assert_eq!(live_jobs(&scheduler), vec!["T::a", "T::c"]);

    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failing_source_keeps_tasks_running() {
    let mut source = MockFlakySource::new();
    let mut calls = 0u32;
    source.expect_fetch_all().returning(move || {
        calls += 1;
        if calls == 1 {
            Ok(HashMap::from([("rate".to_string(), "100".to_string())]))
        } else {
            Err(SourceError::Unavailable("database is locked".to_string()))
        }
    });

    let scheduler = DynamicScheduler::builder(Arc::new(source))
        .watch_interval(TICK)
        .build();
    let counter = Arc::new(AtomicU32::new(0));
    scheduler.record(JobDeclaration::new(
        JobId::new("T", "poll"),
        counting(&counter),
        ScheduleAttributes::new().fixed_rate_key("rate"),
    ));
    scheduler.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(3050)).await;

    let status = scheduler.status();
    assert!(status.watcher_failures >= 3);
    assert_eq!(status.snapshot_version, 1);
    assert_eq!(status.passes, 1);
    assert_eq!(status.live_tasks.len(), 1);
    assert!(counter.load(Ordering::SeqCst) >= 30);

    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_source_at_boot_uses_literals() {
    let mut source = MockFlakySource::new();
    source
        .expect_fetch_all()
        .returning(|| Err(SourceError::Unavailable("offline".to_string())));

    let scheduler = DynamicScheduler::builder(Arc::new(source))
        .watch_interval(TICK)
        .build();
    scheduler.record(JobDeclaration::new(
        JobId::new("T", "hourly"),
        noop(),
        ScheduleAttributes::new()
            .cron("0 0 * * * *")
            .cron_key("hourly_cron"),
    ));

    let report = scheduler.start().await.unwrap();
    assert_eq!(report.registration.scheduled, 1);
    assert_eq!(report.snapshot_version, 0);

    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_store_recovering_after_boot_rebuilds_tasks() {
    let mut source = MockFlakySource::new();
    let mut calls = 0u32;
    source.expect_fetch_all().returning(move || {
        calls += 1;
        if calls == 1 {
            Err(SourceError::Unavailable("offline".to_string()))
        } else {
            Ok(HashMap::from([
                ("job_enable".to_string(), "false".to_string()),
                ("only_key_rate".to_string(), "100".to_string()),
            ]))
        }
    });

    let scheduler = DynamicScheduler::builder(Arc::new(source))
        .watch_interval(TICK)
        .build();
    let fired = Arc::new(AtomicU32::new(0));
    scheduler.record(JobDeclaration::new(
        JobId::new("T", "j"),
        counting(&fired),
        ScheduleAttributes::new()
            .fixed_rate(Duration::from_millis(100))
            .enable_key("job_enable"),
    ));
    scheduler.record(JobDeclaration::new(
        JobId::new("T", "k"),
        noop(),
        ScheduleAttributes::new().fixed_rate_key("only_key_rate"),
    ));

    // Boot runs on literals: j enabled, k unresolvable.
    let report = scheduler.start().await.unwrap();
    assert_eq!(report.registration.scheduled, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(live_jobs(&scheduler), vec!["T::j"]);

    // The first successful fetch brings the store values in.
    next_tick().await;
    let status = scheduler.status();
    assert_eq!(status.snapshot_version, 1);
    assert_eq!(status.passes, 2);
    assert_eq!(live_jobs(&scheduler), vec!["T::k"]);

    let after_rebuild = fired.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(fired.load(Ordering::SeqCst), after_rebuild);
    assert_eq!(scheduler.status().passes, 2);

    scheduler.shutdown().await;
}
