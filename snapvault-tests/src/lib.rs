//! Test utilities for snapvault
//!
//! This crate provides shared test utilities, mock re-exports, and
//! helper functions for testing the snapvault backup pipeline.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, TestContext};
//!
//! #[test]
//! fn my_test() {
//!     let builder = ConfigBuilder::minimal();
//!     let (config, _temp) = builder.persist();
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::TestContext;

// Re-export types from the main crate for convenience
pub use snapvault::config::{
    BackupConfig, Config, LoggingConfig, ScheduleConfig, StorageConfig,
};
pub use snapvault::managers::backup::{BackupExecutor, BackupOutcome};
pub use snapvault::managers::scheduler::{JobKind, JobOrchestrator, JobResult, RunLock};
pub use snapvault::store::upload::{UploadResult, Uploader};
pub use snapvault::utils::shadow::SnapshotRequest;

// Re-export mock implementations from the main crate
pub use snapvault::store::ops::mock::{MockStoreOps, StoreCall};
pub use snapvault::store::ops::StoreOperations;
pub use snapvault::utils::executor::mock::{MockExecutor, MockResponse};
pub use snapvault::utils::executor::CommandExecutor;
pub use snapvault::utils::shadow_ops::mock::MockSnapshotOps;
pub use snapvault::utils::shadow_ops::SnapshotOperations;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
