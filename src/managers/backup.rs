//! Backup executor - runs the snapshot-then-upload pipeline for one source

use crate::store::upload::{directory_prefix_for, UploadResult, Uploader};
use crate::utils::shadow::SnapshotRequest;
use crate::utils::shadow_ops::SnapshotOperations;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of backing up one source path. Exactly one of `upload` and
/// `failure_reason` is set.
#[derive(Debug, Clone)]
pub struct BackupOutcome {
    pub source_path: PathBuf,
    pub succeeded: bool,
    pub upload: Option<UploadResult>,
    pub failure_reason: Option<String>,
}

impl BackupOutcome {
    fn success(source: &Path, upload: UploadResult) -> Self {
        Self {
            source_path: source.to_path_buf(),
            succeeded: true,
            upload: Some(upload),
            failure_reason: None,
        }
    }

    fn failure(source: &Path, reason: impl Into<String>) -> Self {
        Self {
            source_path: source.to_path_buf(),
            succeeded: false,
            upload: None,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Coordinates snapshot acquisition, staging, and upload for single
/// source paths
pub struct BackupExecutor {
    snapshots: Arc<dyn SnapshotOperations>,
    uploader: Uploader,
    staging_root: Option<PathBuf>,
}

impl BackupExecutor {
    pub fn new(snapshots: Arc<dyn SnapshotOperations>, uploader: Uploader) -> Self {
        Self {
            snapshots,
            uploader,
            staging_root: None,
        }
    }

    /// Stage under this directory instead of the system temp dir
    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = Some(root.into());
        self
    }

    /// Back up one source path into the bucket.
    ///
    /// Never returns an error: every failure comes back as an
    /// unsuccessful outcome, so one bad path cannot abort a whole run.
    pub async fn perform_backup(&self, source: &Path, bucket: &str) -> BackupOutcome {
        if source.as_os_str().is_empty() {
            return BackupOutcome::failure(source, "source path is empty");
        }
        if !source.exists() {
            return BackupOutcome::failure(
                source,
                format!("source path does not exist: {}", source.display()),
            );
        }

        let staging = match self.create_staging() {
            Ok(staging) => staging,
            Err(e) => {
                return BackupOutcome::failure(
                    source,
                    format!("could not create staging directory: {e:#}"),
                )
            }
        };

        info!(
            "Starting backup of {} via staging {}",
            source.display(),
            staging.path().display()
        );

        let result = self.snapshot_and_upload(source, bucket, staging.path()).await;

        // The staging directory goes away no matter how the upload went.
        if let Err(e) = staging.close() {
            warn!("Failed to remove staging directory: {}", e);
        }

        match result {
            Ok(upload) if upload.succeeded => {
                info!("Backup of {} finished: {}", source.display(), upload.message);
                BackupOutcome::success(source, upload)
            }
            Ok(upload) => {
                BackupOutcome::failure(source, format!("upload failed: {}", upload.message))
            }
            Err(e) => BackupOutcome::failure(source, format!("{e:#}")),
        }
    }

    fn create_staging(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("snapvault-");
        match &self.staging_root {
            Some(root) => {
                std::fs::create_dir_all(root)
                    .with_context(|| format!("cannot create {}", root.display()))?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .context("cannot create staging directory")
    }

    async fn snapshot_and_upload(
        &self,
        source: &Path,
        bucket: &str,
        staging: &Path,
    ) -> Result<UploadResult> {
        // Snapshot content lands in a data subdirectory, keeping the
        // companion snapshot log out of the uploaded tree.
        let data_dir = staging.join("data");
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("cannot create {}", data_dir.display()))?;

        let request = SnapshotRequest::new(source, &data_dir);
        let snapshot = self
            .snapshots
            .acquire_and_copy(&request)
            .await
            .context("snapshot acquisition failed")?;
        info!("Snapshot {} ready for {}", snapshot.shadow_id, source.display());

        let name = source
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| "volume".to_string());

        if source.is_file() {
            let staged = data_dir.join(&name);
            Ok(self.uploader.upload_file(&staged, bucket, None).await)
        } else {
            let prefix = directory_prefix_for(&name, chrono::Utc::now());
            Ok(self
                .uploader
                .upload_directory(&data_dir, bucket, Some(&prefix))
                .await)
        }
    }
}
