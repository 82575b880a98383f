//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible defaults.

use snapvault::config::{BackupConfig, Config, LoggingConfig, ScheduleConfig, StorageConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    schedule: ScheduleConfig,
    backup: BackupConfig,
    storage: StorageConfig,
    logging: LoggingConfig,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with minimal defaults and no sources
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        // Create staging directory
        let staging_root = temp_dir.path().join("staging");
        fs::create_dir_all(&staging_root).expect("Failed to create staging dir");

        // Create log directory
        let log_directory = temp_dir.path().join("logs");
        fs::create_dir_all(&log_directory).expect("Failed to create log dir");

        Self {
            temp_dir,
            schedule: ScheduleConfig::default(),
            backup: BackupConfig {
                source_paths: vec![],
                snapshot_timeout_minutes: 30,
                staging_root: Some(staging_root),
            },
            storage: StorageConfig {
                bucket: "test-backups".to_string(),
                region: "us-east-1".to_string(),
                endpoint: Some("http://localhost:9000".to_string()),
                access_key: "test-access".to_string(),
                secret_key: "test-secret".to_string(),
                force_path_style: true,
            },
            logging: LoggingConfig {
                directory: log_directory,
                level: "info".to_string(),
                max_files: 3,
            },
        }
    }

    /// Create a builder with one populated source directory
    pub fn minimal() -> Self {
        let mut builder = Self::new();

        let source = builder.temp_dir.path().join("source");
        fs::create_dir_all(&source).expect("Failed to create source dir");
        fs::write(source.join("data.txt"), "snapshot me").expect("Failed to write source file");
        builder.backup.source_paths.push(source);

        builder
    }

    /// Add an empty source directory under the temp dir
    pub fn add_source_dir(mut self, name: &str) -> Self {
        let path = self.temp_dir.path().join(name);
        fs::create_dir_all(&path).expect("Failed to create source dir");
        self.backup.source_paths.push(path);
        self
    }

    /// Add a single-file source under the temp dir
    pub fn add_source_file(mut self, name: &str, contents: &[u8]) -> Self {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, contents).expect("Failed to write source file");
        self.backup.source_paths.push(path);
        self
    }

    /// Add a source path without creating it on disk
    pub fn add_missing_source(mut self, name: &str) -> Self {
        self.backup.source_paths.push(self.temp_dir.path().join(name));
        self
    }

    /// Set the bucket name
    pub fn with_bucket(mut self, bucket: &str) -> Self {
        self.storage.bucket = bucket.to_string();
        self
    }

    /// Toggle the scheduling master switch
    pub fn with_schedule_enabled(mut self, enabled: bool) -> Self {
        self.schedule.enabled = enabled;
        self
    }

    /// Toggle the weekly trigger
    pub fn with_weekly_enabled(mut self, enabled: bool) -> Self {
        self.schedule.weekly_enabled = enabled;
        self
    }

    /// Set the daily cron expression
    pub fn with_daily_cron(mut self, expression: &str) -> Self {
        self.schedule.daily_cron = expression.to_string();
        self
    }

    /// Set the weekly cron expression
    pub fn with_weekly_cron(mut self, expression: &str) -> Self {
        self.schedule.weekly_cron = expression.to_string();
        self
    }

    /// Set the snapshot timeout
    pub fn with_timeout_minutes(mut self, minutes: u64) -> Self {
        self.backup.snapshot_timeout_minutes = minutes;
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the configured source paths
    pub fn source_paths(&self) -> &[PathBuf] {
        &self.backup.source_paths
    }

    /// Build the Config
    pub fn build(self) -> Config {
        Config {
            schedule: self.schedule,
            backup: self.backup,
            storage: self.storage,
            logging: self.logging,
        }
    }

    /// Keep the temp directory (don't delete on drop)
    pub fn persist(self) -> (Config, TempDir) {
        let config = Config {
            schedule: self.schedule,
            backup: self.backup,
            storage: self.storage,
            logging: self.logging,
        };
        (config, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
