//! Snapvault Library
//!
//! This library provides snapshot-based backup orchestration: volume
//! shadow copies feed a staging directory, which is uploaded to an
//! S3-compatible object store under timestamped keys.

pub mod config;
pub mod managers;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, resolve_config_path, Config};
pub use managers::backup::{BackupExecutor, BackupOutcome};
pub use managers::logging::{init_console_logging, init_logging, LogGuard};
pub use managers::scheduler::{start_scheduler, JobKind, JobOrchestrator, JobResult, RunLock};
pub use store::upload::{UploadResult, Uploader};
