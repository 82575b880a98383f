pub mod command;
pub mod shadow;

// Trait-based abstractions for testability
pub mod executor;
pub mod shadow_ops;

// Re-export commonly used types and traits (used by test crate)
#[allow(unused_imports)]
pub use command::CommandOutput;
#[allow(unused_imports)]
pub use executor::{CommandExecutor, RealExecutor};
#[allow(unused_imports)]
pub use shadow_ops::{SnapshotOperations, VssSnapshotOps};
