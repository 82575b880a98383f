pub mod backup;
pub mod logging;
pub mod scheduler;

#[allow(unused_imports)]
pub use backup::{BackupExecutor, BackupOutcome};
#[allow(unused_imports)]
pub use logging::{init_console_logging, init_logging, LogGuard};
#[allow(unused_imports)]
pub use scheduler::{start_scheduler, JobKind, JobOrchestrator, JobResult, RunLock};
