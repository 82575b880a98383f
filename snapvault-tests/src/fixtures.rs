//! Test fixtures and sample data
//!
//! Provides pre-built test data and templates for testing.

use std::fs;
use std::path::Path;

/// Minimal valid config TOML template
pub fn minimal_config_toml() -> &'static str {
    r#"
[backup]
source_paths = ["{source_path}"]

[storage]
bucket = "test-backups"
access_key = "test-access"
secret_key = "test-secret"
"#
}

/// Config TOML exercising every section
pub fn full_config_toml() -> &'static str {
    r#"
[schedule]
enabled = true
weekly_enabled = false
daily_cron = "0 15 2 * * *"
weekly_cron = "0 0 6 * * Sat"

[backup]
source_paths = ["{source_path}"]
snapshot_timeout_minutes = 45
staging_root = "{staging_root}"

[storage]
bucket = "full-backups"
region = "eu-central-1"
endpoint = "http://localhost:9000"
access_key = "test-access"
secret_key = "test-secret"
force_path_style = true

[logging]
directory = "{log_dir}"
level = "debug"
max_files = 2
"#
}

/// Create a small source tree in a directory
pub fn create_source_tree(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir.join("data"))?;
    fs::create_dir_all(dir.join("config"))?;

    fs::write(dir.join("data/file1.txt"), "Test data file 1")?;
    fs::write(dir.join("data/file2.txt"), "Test data file 2")?;
    fs::write(dir.join("config/settings.json"), r#"{"key": "value"}"#)?;

    Ok(())
}

/// Verify the source tree from `create_source_tree` exists in a directory
pub fn verify_source_tree(dir: &Path) -> bool {
    dir.join("data/file1.txt").exists()
        && dir.join("data/file2.txt").exists()
        && dir.join("config/settings.json").exists()
}

/// Deterministic non-trivial payload for round-trip assertions
pub fn patterned_bytes(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (i.wrapping_mul(31).wrapping_add(7) % 251) as u8)
        .collect()
}

/// Create a file of `len` zero bytes without writing them out. Lets
/// multi-hundred-MiB upload tests run without matching disk traffic.
pub fn sparse_file(path: &Path, len: u64) -> std::io::Result<()> {
    let file = fs::File::create(path)?;
    file.set_len(len)?;
    Ok(())
}
