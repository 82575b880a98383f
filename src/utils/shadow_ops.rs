//! Snapshot acquisition abstraction for testability
//!
//! `SnapshotOperations` is the seam between backup execution and the
//! platform shadow-copy machinery. The real implementation drives
//! PowerShell through a `CommandExecutor`; the mock fakes the copy with
//! plain filesystem operations so the pipeline is testable anywhere.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use super::command::CommandOutput;
use super::executor::CommandExecutor;
use super::shadow::{self, SnapshotError, SnapshotRequest, SnapshotResult};

/// Abstraction for acquiring a consistent copy of a source path
#[async_trait]
pub trait SnapshotOperations: Send + Sync {
    /// Create a point-in-time snapshot of the volume owning the source,
    /// copy the source out of it into the destination, and release the
    /// snapshot again.
    async fn acquire_and_copy(
        &self,
        request: &SnapshotRequest,
    ) -> Result<SnapshotResult, SnapshotError>;
}

/// Shadow-copy implementation backed by PowerShell and WMI
pub struct VssSnapshotOps {
    executor: Arc<dyn CommandExecutor>,
    timeout_minutes: u64,
}

impl VssSnapshotOps {
    pub fn new(executor: Arc<dyn CommandExecutor>, timeout_minutes: u64) -> Self {
        Self {
            executor,
            timeout_minutes,
        }
    }

    fn validate(request: &SnapshotRequest) -> Result<(), SnapshotError> {
        if request.source_path.as_os_str().is_empty() {
            return Err(SnapshotError::Validation("source path is empty".into()));
        }
        if request.destination_path.as_os_str().is_empty() {
            return Err(SnapshotError::Validation(
                "destination path is empty".into(),
            ));
        }
        if !request.source_path.exists() {
            return Err(SnapshotError::Validation(format!(
                "source path does not exist: {}",
                request.source_path.display()
            )));
        }
        Ok(())
    }

    fn ensure_supported() -> Result<(), SnapshotError> {
        if !cfg!(windows) {
            return Err(SnapshotError::Unsupported(
                "volume shadow copies require a Windows host".into(),
            ));
        }
        which::which("powershell")
            .map_err(|_| SnapshotError::Unsupported("powershell was not found on PATH".into()))?;
        Ok(())
    }

    async fn run_script(
        &self,
        script: &str,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, SnapshotError> {
        self.executor
            .run_command(
                "powershell",
                &["-NoProfile", "-NonInteractive", "-Command", script],
                timeout,
            )
            .await
            .map_err(|e| SnapshotError::Process(format!("{e:#}")))
    }

    async fn acquire(&self, request: &SnapshotRequest) -> Result<SnapshotResult, SnapshotError> {
        let source = request.source_path.display().to_string();
        let (volume, relative) = shadow::split_volume(&source)?;

        self.log_event(request, &format!("snapshot start source={source} volume={volume}"))
            .await;

        let script = shadow::acquire_script(&volume, &relative, &request.destination_path);
        // Saturate rather than overflow on absurd configured values
        let timeout = Duration::from_secs(self.timeout_minutes.saturating_mul(60));
        let output = self.run_script(&script, Some(timeout)).await?;

        let combined = combine_output(&output);
        let shadow_id = shadow::parse_shadow_id(&output.stdout);

        if let Some(id) = &shadow_id {
            self.log_event(request, &format!("shadow id={id}")).await;
        }

        if output.timed_out {
            warn!(
                "Snapshot of {} hit the {} minute limit and was killed",
                source, self.timeout_minutes
            );
            self.log_event(
                request,
                &format!("timed out after {} minutes", self.timeout_minutes),
            )
            .await;
            self.cleanup_after_kill(request, shadow_id.as_deref()).await;
            return Err(SnapshotError::TimedOut {
                minutes: self.timeout_minutes,
            });
        }

        let exit_code = output.exit_code.unwrap_or(-1);
        if !output.success() {
            self.log_event(request, &format!("failed exit_code={exit_code}"))
                .await;
            return Err(match shadow_id {
                // The shadow existed, so the copy phase failed; the
                // script's finally block already deleted the shadow.
                Some(_) => SnapshotError::CopyFailed { output: combined },
                None => SnapshotError::CreationFailed {
                    exit_code,
                    output: combined,
                },
            });
        }

        if let Some((files, bytes)) = shadow::parse_copy_stats(&output.stdout) {
            self.log_event(request, &format!("copy files={files} bytes={bytes}"))
                .await;
        }
        self.log_event(request, "cleanup=done").await;

        // A zero exit without the marker means the script never created
        // the shadow, whatever it claims.
        let shadow_id = shadow_id.ok_or_else(|| SnapshotError::CreationFailed {
            exit_code,
            output: combined.clone(),
        })?;

        info!(
            "Snapshot {} captured into {}",
            shadow_id,
            request.destination_path.display()
        );

        Ok(SnapshotResult {
            shadow_id,
            raw_output: combined,
            exit_code,
        })
    }

    /// Delete the shadow left behind by a killed acquire script
    async fn cleanup_after_kill(&self, request: &SnapshotRequest, shadow_id: Option<&str>) {
        let Some(id) = shadow_id else {
            // Killed before the shadow existed; nothing to release
            return;
        };
        let script = shadow::cleanup_script(id);
        match self.run_script(&script, Some(Duration::from_secs(60))).await {
            Ok(output) if output.success() => {
                self.log_event(request, &format!("cleanup shadow id={id} done"))
                    .await;
            }
            Ok(output) => {
                warn!("Shadow {} cleanup exited with {:?}", id, output.exit_code);
                self.log_event(request, &format!("cleanup shadow id={id} failed"))
                    .await;
            }
            Err(e) => {
                warn!("Shadow {} cleanup could not run: {}", id, e);
                self.log_event(request, &format!("cleanup shadow id={id} failed"))
                    .await;
            }
        }
    }

    /// Append one timestamped line to the companion log next to the
    /// destination. Log trouble never fails the snapshot itself.
    async fn log_event(&self, request: &SnapshotRequest, message: &str) {
        let path = companion_log_path(&request.destination_path);
        let line = format!("[{}] {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"), message);
        if let Err(e) = append_line(&path, &line).await {
            debug!("Could not append to {}: {}", path.display(), e);
        }
    }
}

#[async_trait]
impl SnapshotOperations for VssSnapshotOps {
    async fn acquire_and_copy(
        &self,
        request: &SnapshotRequest,
    ) -> Result<SnapshotResult, SnapshotError> {
        Self::validate(request)?;
        Self::ensure_supported()?;
        self.acquire(request).await
    }
}

/// Companion log location: `snapshot.log` beside the destination, so the
/// log of a run lands next to the data it describes without being part
/// of the uploaded tree.
pub fn companion_log_path(destination: &Path) -> PathBuf {
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join("snapshot.log"),
        _ => destination.join("snapshot.log"),
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    // Tokio file writes complete in the background; flush so the line is
    // in the file before the event is considered logged.
    file.flush().await
}

fn combine_output(output: &CommandOutput) -> String {
    if output.stderr.trim().is_empty() {
        output.stdout.clone()
    } else {
        format!("{}\n{}", output.stdout.trim_end(), output.stderr.trim_end())
    }
}

/// A mock snapshot provider for testing: records requests and fakes the
/// copy with plain filesystem operations. Available to external test
/// crates.
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    /// Mock snapshot operations for testing
    #[derive(Default)]
    pub struct MockSnapshotOps {
        calls: Mutex<Vec<SnapshotRequest>>,
        fail_with: Option<String>,
        delay: Option<Duration>,
        extra_files: Vec<(String, Vec<u8>)>,
    }

    impl MockSnapshotOps {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail every acquisition with a copy error carrying the message
        pub fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::default()
            }
        }

        /// Sleep before answering, to widen race windows in tests
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Also write `contents` at `relative` under the destination
        pub fn with_file(mut self, relative: &str, contents: &[u8]) -> Self {
            self.extra_files.push((relative.to_string(), contents.to_vec()));
            self
        }

        /// Get all recorded requests
        pub fn get_calls(&self) -> Vec<SnapshotRequest> {
            self.calls.lock().unwrap().clone()
        }

        /// Get the number of recorded requests
        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn copy_source(request: &SnapshotRequest) -> std::io::Result<()> {
            fs::create_dir_all(&request.destination_path)?;
            let source = &request.source_path;
            if source.is_file() {
                let name = source.file_name().unwrap_or_default();
                fs::copy(source, request.destination_path.join(name))?;
            } else if source.is_dir() {
                copy_tree(source, &request.destination_path)?;
            }
            Ok(())
        }
    }

    fn copy_tree(from: &Path, to: &Path) -> std::io::Result<()> {
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            let target = to.join(entry.file_name());
            if entry.file_type()?.is_dir() {
                fs::create_dir_all(&target)?;
                copy_tree(&entry.path(), &target)?;
            } else {
                fs::copy(entry.path(), &target)?;
            }
        }
        Ok(())
    }

    #[async_trait]
    impl SnapshotOperations for MockSnapshotOps {
        async fn acquire_and_copy(
            &self,
            request: &SnapshotRequest,
        ) -> Result<SnapshotResult, SnapshotError> {
            self.calls.lock().unwrap().push(request.clone());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(message) = &self.fail_with {
                return Err(SnapshotError::CopyFailed {
                    output: message.clone(),
                });
            }

            Self::copy_source(request).map_err(|e| SnapshotError::CopyFailed {
                output: e.to_string(),
            })?;

            for (relative, contents) in &self.extra_files {
                let path = request.destination_path.join(relative);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(|e| SnapshotError::CopyFailed {
                        output: e.to_string(),
                    })?;
                }
                fs::write(&path, contents).map_err(|e| SnapshotError::CopyFailed {
                    output: e.to_string(),
                })?;
            }

            Ok(SnapshotResult {
                shadow_id: format!("mock-shadow-{}", self.call_count()),
                raw_output: String::new(),
                exit_code: 0,
            })
        }
    }
}
