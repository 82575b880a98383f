//! S3 client construction from configuration

use aws_sdk_s3::config::{retry::RetryConfig, BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client;

use crate::config::StorageConfig;

/// Build an S3 client for the configured endpoint.
///
/// Path-style addressing and a custom endpoint keep S3-compatible stores
/// (MinIO, Backblaze, Spaces) working; retries are bounded so a dead
/// endpoint fails a run instead of stalling it.
pub fn build_client(storage: &StorageConfig) -> Client {
    let credentials = Credentials::new(
        storage.access_key.clone(),
        storage.secret_key.clone(),
        None,
        None,
        "snapvault-config",
    );

    let mut builder = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .credentials_provider(credentials)
        .region(Region::new(storage.region.clone()))
        .retry_config(RetryConfig::standard().with_max_attempts(4))
        .force_path_style(storage.force_path_style);

    if let Some(endpoint) = &storage.endpoint {
        builder = builder.endpoint_url(endpoint);
    }

    Client::from_conf(builder.build())
}
