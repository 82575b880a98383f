//! Unit tests for job orchestration
//!
//! Single-flight locking, schedule gates, and the cron wiring are
//! exercised against the mock pipeline; no object store or shadow copy
//! machinery is involved.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;
use snapvault::config::ScheduleConfig;
use snapvault::managers::scheduler::start_scheduler;
use test_utils::{
    BackupExecutor, JobKind, JobOrchestrator, MockSnapshotOps, MockStoreOps, TestContext, Uploader,
};

fn pipeline_with(
    snapshots: MockSnapshotOps,
    schedule: ScheduleConfig,
    sources: Vec<PathBuf>,
) -> (Arc<JobOrchestrator>, Arc<MockSnapshotOps>, Arc<MockStoreOps>) {
    let snapshots = Arc::new(snapshots);
    let store = Arc::new(MockStoreOps::new());
    let executor = BackupExecutor::new(snapshots.clone(), Uploader::new(store.clone()));
    let orchestrator = JobOrchestrator::new(executor, schedule, sources, "test-backups".to_string());
    (Arc::new(orchestrator), snapshots, store)
}

#[tokio::test]
async fn test_manual_job_reports_success_over_all_sources() {
    let ctx = TestContext::new();
    let sources = vec![
        ctx.create_binary_file("a.txt", b"a"),
        ctx.create_binary_file("b.txt", b"b"),
    ];

    let (orchestrator, snapshots, store) =
        pipeline_with(MockSnapshotOps::new(), ScheduleConfig::default(), sources);

    let result = orchestrator.run_job(JobKind::Manual).await;

    assert_eq!(result.kind, JobKind::Manual);
    assert!(result.succeeded);
    assert_eq!(result.success_count, 2);
    assert_eq!(result.failure_count, 0);
    assert!(result.summary.contains("2 succeeded, 0 failed"));
    assert_eq!(snapshots.call_count(), 2);
    assert_eq!(store.object_keys().len(), 2);
}

#[tokio::test]
async fn test_sources_run_sequentially_in_config_order() {
    let ctx = TestContext::new();
    let sources = vec![
        ctx.create_binary_file("first.txt", b"1"),
        ctx.create_binary_file("second.txt", b"2"),
        ctx.create_binary_file("third.txt", b"3"),
    ];

    let (orchestrator, snapshots, _store) = pipeline_with(
        MockSnapshotOps::new(),
        ScheduleConfig::default(),
        sources.clone(),
    );

    orchestrator.run_job(JobKind::ScheduledDaily).await;

    let recorded: Vec<PathBuf> = snapshots
        .get_calls()
        .into_iter()
        .map(|request| request.source_path)
        .collect();
    assert_eq!(recorded, sources);
}

#[tokio::test]
async fn test_per_source_failures_are_counted_not_propagated() {
    let ctx = TestContext::new();
    let sources = vec![
        ctx.create_binary_file("good.txt", b"fine"),
        ctx.temp_dir().join("ghost"),
    ];

    let (orchestrator, _snapshots, store) =
        pipeline_with(MockSnapshotOps::new(), ScheduleConfig::default(), sources);

    let result = orchestrator.run_job(JobKind::Manual).await;

    assert!(!result.succeeded);
    assert_eq!(result.success_count, 1);
    assert_eq!(result.failure_count, 1);
    assert!(result.summary.contains("1 succeeded, 1 failed"));
    // The good path still made it out
    assert_eq!(store.object_keys().len(), 1);
}

#[tokio::test]
async fn test_disabled_scheduling_skips_every_trigger_kind() {
    let ctx = TestContext::new();
    let sources = vec![ctx.create_binary_file("a.txt", b"a")];

    let schedule = ScheduleConfig {
        enabled: false,
        ..ScheduleConfig::default()
    };
    let (orchestrator, snapshots, _store) =
        pipeline_with(MockSnapshotOps::new(), schedule, sources);

    for kind in [JobKind::Manual, JobKind::ScheduledDaily, JobKind::ScheduledWeekly] {
        let result = orchestrator.run_job(kind).await;
        assert!(result.succeeded, "skip must not read as failure");
        assert_eq!(result.success_count, 0);
        assert!(result.summary.contains("scheduling is disabled"));
    }
    assert_eq!(snapshots.call_count(), 0);
}

#[tokio::test]
async fn test_weekly_gate_only_blocks_the_weekly_trigger() {
    let ctx = TestContext::new();
    let sources = vec![ctx.create_binary_file("a.txt", b"a")];

    let schedule = ScheduleConfig {
        weekly_enabled: false,
        ..ScheduleConfig::default()
    };
    let (orchestrator, snapshots, _store) =
        pipeline_with(MockSnapshotOps::new(), schedule, sources);

    let weekly = orchestrator.run_job(JobKind::ScheduledWeekly).await;
    assert!(weekly.succeeded);
    assert!(weekly.summary.contains("weekly schedule is disabled"));
    assert_eq!(snapshots.call_count(), 0);

    let daily = orchestrator.run_job(JobKind::ScheduledDaily).await;
    assert!(daily.succeeded);
    assert_eq!(daily.success_count, 1);
    assert_eq!(snapshots.call_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_concurrent_trigger_is_rejected_not_queued() {
    let ctx = TestContext::new();
    let sources = vec![ctx.create_binary_file("slow.txt", b"slow")];

    let (orchestrator, snapshots, _store) = pipeline_with(
        MockSnapshotOps::new().with_delay(Duration::from_millis(400)),
        ScheduleConfig::default(),
        sources,
    );

    let background = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run_job(JobKind::Manual).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(orchestrator.is_running());
    let rejected = orchestrator.run_job(JobKind::ScheduledDaily).await;
    assert!(!rejected.succeeded);
    assert_eq!(rejected.failure_count, 0, "rejection is not a backup failure");
    assert!(rejected.summary.contains("already running"));

    let first = background.await.unwrap();
    assert!(first.succeeded);
    assert!(!orchestrator.is_running());
    // The rejected trigger never reached the pipeline
    assert_eq!(snapshots.call_count(), 1);

    // And the lock is free again for the next run
    let next = orchestrator.run_job(JobKind::Manual).await;
    assert!(next.succeeded);
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_cron_trigger_drives_the_orchestrator() {
    let ctx = TestContext::new();
    let sources = vec![ctx.create_binary_file("cron.txt", b"tick")];

    // Fire every second so the test observes at least one trigger
    let schedule = ScheduleConfig {
        enabled: true,
        weekly_enabled: false,
        daily_cron: "* * * * * *".to_string(),
        weekly_cron: "0 0 5 * * Sun".to_string(),
    };
    let (orchestrator, snapshots, store) =
        pipeline_with(MockSnapshotOps::new(), schedule.clone(), sources);

    let mut scheduler = start_scheduler(orchestrator.clone(), &schedule)
        .await
        .expect("scheduler should start");
    tokio::time::sleep(Duration::from_millis(2500)).await;
    scheduler.shutdown().await.expect("scheduler should stop");

    assert!(snapshots.call_count() >= 1, "cron never fired");
    assert!(!store.object_keys().is_empty());
    assert!(!orchestrator.is_running());
}

#[tokio::test]
async fn test_invalid_cron_expression_fails_scheduler_startup() {
    let ctx = TestContext::new();
    let sources = vec![ctx.create_binary_file("a.txt", b"a")];

    let schedule = ScheduleConfig {
        daily_cron: "definitely not cron".to_string(),
        ..ScheduleConfig::default()
    };
    let (orchestrator, _snapshots, _store) =
        pipeline_with(MockSnapshotOps::new(), schedule.clone(), sources);

    let err = start_scheduler(orchestrator, &schedule).await.err().unwrap();
    assert!(format!("{err:#}").contains("invalid cron expression"));
}
