//! Unit tests for configuration loading and validation
//!
//! These tests verify config parsing, defaults, and validation through
//! files on disk, the way the binary consumes them.

use snapvault::config::load_config;
use test_utils::test_context::ResultAssertions;
use test_utils::{fixtures, ConfigBuilder, TestContext};

#[test]
fn test_builder_config_round_trips_through_disk() {
    let (config, _source_temp) = ConfigBuilder::minimal().persist();

    let ctx = TestContext::new();
    let path = ctx.write_config(&config);

    let loaded = load_config(&path).assert_ok();
    assert_eq!(loaded.storage.bucket, "test-backups");
    assert_eq!(loaded.backup.source_paths, config.backup.source_paths);
    assert_eq!(loaded.schedule.daily_cron, config.schedule.daily_cron);
}

#[test]
fn test_minimal_toml_applies_defaults() {
    let ctx = TestContext::new();
    let source = ctx.create_subdir("source");

    let rendered = fixtures::minimal_config_toml().replace(
        "{source_path}",
        &source.to_string_lossy().replace('\\', "/"),
    );
    let path = ctx.create_file("config.toml", &rendered);

    let config = load_config(&path).assert_ok();
    assert!(config.schedule.enabled);
    assert!(config.schedule.weekly_enabled);
    assert_eq!(config.schedule.daily_cron, "0 0 3 * * *");
    assert_eq!(config.schedule.weekly_cron, "0 0 5 * * Sun");
    assert_eq!(config.backup.snapshot_timeout_minutes, 30);
    assert_eq!(config.backup.staging_root, None);
    assert_eq!(config.storage.region, "us-east-1");
    assert!(config.storage.force_path_style);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.max_files, 7);
}

#[test]
fn test_full_toml_overrides_every_section() {
    let ctx = TestContext::new();
    let source = ctx.create_subdir("source");
    let staging = ctx.create_subdir("staging");
    let logs = ctx.create_subdir("logs");

    let rendered = fixtures::full_config_toml()
        .replace("{source_path}", &source.to_string_lossy().replace('\\', "/"))
        .replace("{staging_root}", &staging.to_string_lossy().replace('\\', "/"))
        .replace("{log_dir}", &logs.to_string_lossy().replace('\\', "/"));
    let path = ctx.create_file("config.toml", &rendered);

    let config = load_config(&path).assert_ok();
    assert!(!config.schedule.weekly_enabled);
    assert_eq!(config.schedule.daily_cron, "0 15 2 * * *");
    assert_eq!(config.schedule.weekly_cron, "0 0 6 * * Sat");
    assert_eq!(config.backup.snapshot_timeout_minutes, 45);
    assert_eq!(config.backup.staging_root.as_deref(), Some(staging.as_path()));
    assert_eq!(config.storage.bucket, "full-backups");
    assert_eq!(config.storage.region, "eu-central-1");
    assert_eq!(
        config.storage.endpoint.as_deref(),
        Some("http://localhost:9000")
    );
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.max_files, 2);
}

#[test]
fn test_missing_source_paths_still_load() {
    // Existence is a run-time concern; a config naming paths that are
    // not there yet must validate.
    let (config, _source_temp) = ConfigBuilder::new().add_missing_source("not-yet").persist();

    let ctx = TestContext::new();
    let path = ctx.write_config(&config);

    load_config(&path).assert_ok();
}

#[test]
fn test_empty_source_list_is_rejected() {
    let (config, _source_temp) = ConfigBuilder::new().persist();

    let ctx = TestContext::new();
    let path = ctx.write_config(&config);

    load_config(&path).assert_err_contains("source_paths");
}

#[test]
fn test_invalid_bucket_is_rejected() {
    let (config, _source_temp) = ConfigBuilder::minimal().with_bucket("Bad_Bucket").persist();

    let ctx = TestContext::new();
    let path = ctx.write_config(&config);

    load_config(&path).assert_err_contains("bucket");
}

#[test]
fn test_zero_snapshot_timeout_is_rejected() {
    let (config, _source_temp) = ConfigBuilder::minimal().with_timeout_minutes(0).persist();

    let ctx = TestContext::new();
    let path = ctx.write_config(&config);

    load_config(&path).assert_err_contains("snapshot_timeout_minutes");
}

#[test]
fn test_five_field_cron_is_rejected() {
    // Expressions are seconds-resolution; a classic five-field cron is
    // one field short.
    let (config, _source_temp) = ConfigBuilder::minimal().with_daily_cron("0 3 * * *").persist();

    let ctx = TestContext::new();
    let path = ctx.write_config(&config);

    load_config(&path).assert_err_contains("daily_cron");
}

#[test]
fn test_garbage_toml_is_a_parse_error() {
    let ctx = TestContext::new();
    let path = ctx.create_file("config.toml", "backup = ] nonsense [");

    load_config(&path).assert_err_contains("Parse");
}
