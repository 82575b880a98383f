//! Job orchestration and scheduling
//!
//! One atomic flag guards the whole pipeline: triggers that lose the
//! acquisition race are dropped with a rejection result, never queued.
//! The cron wiring drives the same orchestrator the manual CLI path uses.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::ScheduleConfig;
use crate::managers::backup::BackupExecutor;

/// What triggered a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    ScheduledDaily,
    ScheduledWeekly,
    Manual,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobKind::ScheduledDaily => "scheduled daily",
            JobKind::ScheduledWeekly => "scheduled weekly",
            JobKind::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// Aggregate result of one orchestrator invocation
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub kind: JobKind,
    pub succeeded: bool,
    pub success_count: u32,
    pub failure_count: u32,
    pub summary: String,
}

impl JobResult {
    fn finished(
        kind: JobKind,
        success_count: u32,
        failure_count: u32,
        elapsed: std::time::Duration,
    ) -> Self {
        Self {
            kind,
            succeeded: failure_count == 0,
            success_count,
            failure_count,
            summary: format!(
                "{} backup finished in {:.1}s: {} succeeded, {} failed",
                kind,
                elapsed.as_secs_f64(),
                success_count,
                failure_count
            ),
        }
    }

    fn rejected(kind: JobKind) -> Self {
        Self {
            kind,
            succeeded: false,
            success_count: 0,
            failure_count: 0,
            summary: format!("{kind} trigger dropped: a backup job is already running"),
        }
    }

    fn skipped(kind: JobKind, reason: &str) -> Self {
        Self {
            kind,
            succeeded: true,
            success_count: 0,
            failure_count: 0,
            summary: format!("{kind} backup skipped: {reason}"),
        }
    }
}

/// Process-wide single-flight flag. Acquisition is one compare-and-swap;
/// release lives in the guard's drop, so a panicking run still clears it.
pub struct RunLock {
    running: AtomicBool,
}

impl RunLock {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    /// Try the idle-to-running transition. Losing the race is a normal,
    /// non-blocking rejection; nothing queues behind the winner.
    pub fn try_acquire(&self) -> Option<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(RunGuard { lock: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Default for RunLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the lock when dropped, on success and on unwind alike
pub struct RunGuard<'a> {
    lock: &'a RunLock,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.lock.running.store(false, Ordering::Release);
    }
}

/// Runs the backup executor over the configured paths under the run lock
pub struct JobOrchestrator {
    executor: BackupExecutor,
    schedule: ScheduleConfig,
    source_paths: Vec<PathBuf>,
    bucket: String,
    lock: RunLock,
}

impl JobOrchestrator {
    pub fn new(
        executor: BackupExecutor,
        schedule: ScheduleConfig,
        source_paths: Vec<PathBuf>,
        bucket: String,
    ) -> Self {
        Self {
            executor,
            schedule,
            source_paths,
            bucket,
            lock: RunLock::new(),
        }
    }

    /// Non-blocking status query
    pub fn is_running(&self) -> bool {
        self.lock.is_running()
    }

    /// Run one job end to end. Never fails: disabled schedules and lock
    /// conflicts come back as results, as do per-path failures.
    pub async fn run_job(&self, kind: JobKind) -> JobResult {
        if !self.schedule.enabled {
            info!("{} backup skipped: scheduling is disabled", kind);
            return JobResult::skipped(kind, "scheduling is disabled");
        }
        if kind == JobKind::ScheduledWeekly && !self.schedule.weekly_enabled {
            info!("Weekly backup skipped: weekly schedule is disabled");
            return JobResult::skipped(kind, "weekly schedule is disabled");
        }

        let Some(_guard) = self.lock.try_acquire() else {
            warn!("{} trigger dropped: a backup job is already running", kind);
            return JobResult::rejected(kind);
        };

        let started = Instant::now();
        info!(
            "Starting {} backup over {} paths",
            kind,
            self.source_paths.len()
        );

        let mut success_count = 0u32;
        let mut failure_count = 0u32;

        for path in &self.source_paths {
            let outcome = self.executor.perform_backup(path, &self.bucket).await;
            if outcome.succeeded {
                success_count += 1;
                info!("Path {} backed up", path.display());
            } else {
                failure_count += 1;
                let reason = outcome
                    .failure_reason
                    .as_deref()
                    .unwrap_or("unknown failure");
                error!("Path {} failed: {}", path.display(), reason);
            }
        }

        let result = JobResult::finished(kind, success_count, failure_count, started.elapsed());
        info!("{}", result.summary);
        result
    }
}

/// Wire the daily and weekly triggers onto a cron scheduler and start it.
/// The returned scheduler must be kept and shut down by the caller.
pub async fn start_scheduler(
    orchestrator: Arc<JobOrchestrator>,
    schedule: &ScheduleConfig,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .context("could not create job scheduler")?;

    let daily = cron_job(
        orchestrator.clone(),
        &schedule.daily_cron,
        JobKind::ScheduledDaily,
    )?;
    scheduler
        .add(daily)
        .await
        .context("could not add daily job")?;

    let weekly = cron_job(
        orchestrator.clone(),
        &schedule.weekly_cron,
        JobKind::ScheduledWeekly,
    )?;
    scheduler
        .add(weekly)
        .await
        .context("could not add weekly job")?;

    scheduler
        .start()
        .await
        .context("could not start job scheduler")?;
    info!(
        "Scheduler started (daily: {}, weekly: {})",
        schedule.daily_cron, schedule.weekly_cron
    );
    Ok(scheduler)
}

fn cron_job(orchestrator: Arc<JobOrchestrator>, expression: &str, kind: JobKind) -> Result<Job> {
    Job::new_async(expression, move |_uuid, _scheduler| {
        let orchestrator = orchestrator.clone();
        Box::pin(async move {
            let result = orchestrator.run_job(kind).await;
            if !result.succeeded {
                error!("{}", result.summary);
            }
        })
    })
    .with_context(|| format!("invalid cron expression: {expression}"))
}
