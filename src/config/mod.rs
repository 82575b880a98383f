//! Configuration module for snapvault
//!
//! This module handles loading and validating configuration from TOML files.
//!
//! ## Example Usage
//!
//! ```no_run
//! # fn main() -> snapvault::config::Result<()> {
//! let config = snapvault::config::load_config("snapvault.toml")?;
//! println!("Backing up {} paths", config.backup.source_paths.len());
//! # Ok(())
//! # }
//! ```

mod loader;
mod types;

pub use loader::{load_config, ConfigError, Result};
pub use types::*;

use std::path::{Path, PathBuf};

/// Default config file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "snapvault.toml";

/// Resolve the configuration file path: an explicit flag wins, then
/// `snapvault.toml` in the working directory, then the platform config
/// directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|dir| dir.join("snapvault").join(DEFAULT_CONFIG_FILE))
        .unwrap_or(local)
}

/// Expand tilde (~) in path
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
