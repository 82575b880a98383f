use super::types::*;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate the configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.backup.source_paths.is_empty() {
        return Err(ConfigError::ValidationError(
            "backup.source_paths must list at least one path".to_string(),
        ));
    }
    for path in &config.backup.source_paths {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "backup.source_paths contains an empty path".to_string(),
            ));
        }
    }

    if config.backup.snapshot_timeout_minutes == 0 {
        return Err(ConfigError::ValidationError(
            "backup.snapshot_timeout_minutes must be greater than zero".to_string(),
        ));
    }

    validate_bucket_name(&config.storage.bucket)?;

    if config.storage.access_key.is_empty() || config.storage.secret_key.is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.access_key and storage.secret_key must be set".to_string(),
        ));
    }

    validate_cron(&config.schedule.daily_cron, "schedule.daily_cron")?;
    validate_cron(&config.schedule.weekly_cron, "schedule.weekly_cron")?;

    Ok(())
}

/// Bucket naming rules shared by S3-compatible stores: 3 to 63
/// characters from lowercase letters, digits, dots and hyphens, starting
/// and ending alphanumeric.
fn validate_bucket_name(bucket: &str) -> Result<()> {
    let valid_length = (3..=63).contains(&bucket.len());
    let valid_chars = bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    let valid_ends = bucket
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric())
        && bucket
            .chars()
            .last()
            .is_some_and(|c| c.is_ascii_alphanumeric());

    if !(valid_length && valid_chars && valid_ends) {
        return Err(ConfigError::ValidationError(format!(
            "invalid bucket name: {bucket:?}"
        )));
    }
    Ok(())
}

/// Structural cron check: six or seven whitespace-separated fields
/// (seconds-resolution syntax). Full parsing happens when the job is
/// registered with the scheduler.
fn validate_cron(expression: &str, field: &str) -> Result<()> {
    let fields = expression.split_whitespace().count();
    if !(6..=7).contains(&fields) {
        return Err(ConfigError::ValidationError(format!(
            "{field}: expected 6 or 7 cron fields, got {fields}: {expression}"
        )));
    }
    Ok(())
}
