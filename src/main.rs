use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use snapvault::config;
use snapvault::managers::backup::BackupExecutor;
use snapvault::managers::logging;
use snapvault::managers::scheduler::{self, JobKind, JobOrchestrator};
use snapvault::store::client::build_client;
use snapvault::store::ops::S3StoreOps;
use snapvault::store::upload::Uploader;
use snapvault::utils::executor::RealExecutor;
use snapvault::utils::shadow_ops::VssSnapshotOps;

#[derive(Parser)]
#[command(name = "snapvault")]
#[command(about = "Snapshot-based backup tool for S3-compatible storage", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up all configured source paths now
    Run {
        /// Print the job result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the cron scheduler and run until interrupted
    Serve,

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load and validate configuration
    let config_path = config::resolve_config_path(cli.config.as_deref());
    let config = config::load_config(&config_path)?;

    // Validate only reads the config, so it skips the log files; every
    // other command logs to the rotated file (must keep guard alive)
    let _log_guard = match cli.command {
        Commands::Validate => {
            logging::init_console_logging();
            None
        }
        _ => Some(logging::init_logging(&config.logging)?),
    };

    match cli.command {
        Commands::Run { json } => {
            let orchestrator = build_orchestrator(&config);
            let result = orchestrator.run_job(JobKind::Manual).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.summary);
            }
            if !result.succeeded {
                std::process::exit(1);
            }
        }

        Commands::Serve => {
            let orchestrator = Arc::new(build_orchestrator(&config));
            let mut sched = scheduler::start_scheduler(orchestrator, &config.schedule).await?;

            println!("Scheduler running (daily: {}, weekly: {})", config.schedule.daily_cron, config.schedule.weekly_cron);
            println!("Press Ctrl-C to stop.");
            tokio::signal::ctrl_c().await?;

            sched.shutdown().await?;
            println!("✓ Scheduler stopped");
        }

        Commands::Validate => {
            println!("Configuration is valid!");
            println!("Source paths: {}", config.backup.source_paths.len());
            println!("Bucket: {}", config.storage.bucket);
            println!("Daily schedule: {}", config.schedule.daily_cron);
            println!("Weekly schedule: {}", config.schedule.weekly_cron);
        }
    }

    Ok(())
}

/// Wire the full pipeline from configuration: shadow-copy provider,
/// object store uploader, backup executor, and the orchestrator on top.
fn build_orchestrator(config: &config::Config) -> JobOrchestrator {
    let executor = Arc::new(RealExecutor::new());
    let snapshots = Arc::new(VssSnapshotOps::new(
        executor,
        config.backup.snapshot_timeout_minutes,
    ));

    let client = build_client(&config.storage);
    let uploader = Uploader::new(Arc::new(S3StoreOps::new(client)));

    let mut backup = BackupExecutor::new(snapshots, uploader);
    if let Some(staging_root) = &config.backup.staging_root {
        backup = backup.with_staging_root(staging_root);
    }

    JobOrchestrator::new(
        backup,
        config.schedule.clone(),
        config.backup.source_paths.clone(),
        config.storage.bucket.clone(),
    )
}
