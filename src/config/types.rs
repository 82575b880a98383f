use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::shadow::DEFAULT_SNAPSHOT_TIMEOUT_MINUTES;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub backup: BackupConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scheduling flags and cron expressions
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// Master switch; when false every trigger becomes a no-op
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Gate for the weekly trigger only
    #[serde(default = "default_enabled")]
    pub weekly_enabled: bool,

    /// Seconds-resolution cron, six or seven fields
    #[serde(default = "default_daily_cron")]
    pub daily_cron: String,

    #[serde(default = "default_weekly_cron")]
    pub weekly_cron: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            weekly_enabled: default_enabled(),
            daily_cron: default_daily_cron(),
            weekly_cron: default_weekly_cron(),
        }
    }
}

/// What to back up and how long a snapshot may take
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackupConfig {
    /// Paths backed up sequentially, in this order, on every run
    pub source_paths: Vec<PathBuf>,

    /// Wall-clock limit for one snapshot acquisition
    #[serde(default = "default_snapshot_timeout")]
    pub snapshot_timeout_minutes: u64,

    /// Parent directory for staging; system temp when unset
    #[serde(default)]
    pub staging_root: Option<PathBuf>,
}

/// Object store endpoint and credentials
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint for S3-compatible stores; AWS when unset
    #[serde(default)]
    pub endpoint: Option<String>,

    pub access_key: String,
    pub secret_key: String,

    /// Path-style addressing; most S3-compatible stores require it
    #[serde(default = "default_enabled")]
    pub force_path_style: bool,
}

/// Log destination and verbosity
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,

    #[serde(default = "default_log_level")]
    pub level: String,

    /// Daily files kept before rotation deletes the oldest
    #[serde(default = "default_log_max_files")]
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            level: default_log_level(),
            max_files: default_log_max_files(),
        }
    }
}

// Default value functions

fn default_enabled() -> bool {
    true
}
fn default_daily_cron() -> String {
    "0 0 3 * * *".to_string()
}
fn default_weekly_cron() -> String {
    "0 0 5 * * Sun".to_string()
}
fn default_snapshot_timeout() -> u64 {
    DEFAULT_SNAPSHOT_TIMEOUT_MINUTES
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_max_files() -> u32 {
    7
}
