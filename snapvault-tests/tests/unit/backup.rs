//! Unit tests for the backup executor
//!
//! The executor is driven end to end with the filesystem-backed
//! snapshot mock and the in-memory store, checking outcome
//! normalization and staging hygiene.

use std::path::Path;
use std::sync::Arc;

use test_utils::{fixtures, BackupExecutor, MockSnapshotOps, MockStoreOps, TestContext, Uploader};

fn executor_with(
    snapshots: MockSnapshotOps,
    store: Arc<MockStoreOps>,
    staging_root: &Path,
) -> (BackupExecutor, Arc<MockSnapshotOps>) {
    let snapshots = Arc::new(snapshots);
    let executor = BackupExecutor::new(snapshots.clone(), Uploader::new(store))
        .with_staging_root(staging_root);
    (executor, snapshots)
}

fn staging_entries(root: &Path) -> usize {
    std::fs::read_dir(root).map(|dir| dir.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_file_backup_round_trips_through_the_store() {
    let ctx = TestContext::new();
    let source = ctx.create_binary_file("notes.txt", b"important bytes");
    let staging = ctx.create_subdir("stage");

    let store = Arc::new(MockStoreOps::new());
    let (executor, snapshots) = executor_with(MockSnapshotOps::new(), store.clone(), &staging);

    let outcome = executor.perform_backup(&source, "test-backups").await;

    assert!(outcome.succeeded, "{:?}", outcome.failure_reason);
    assert_eq!(snapshots.call_count(), 1);

    let keys = store.object_keys();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("backups/"));
    assert!(keys[0].ends_with("/notes.txt"));
    assert_eq!(store.object(&keys[0]).unwrap(), b"important bytes");

    assert_eq!(staging_entries(&staging), 0);
}

#[tokio::test]
async fn test_directory_backup_uploads_the_snapshot_view() {
    let ctx = TestContext::new();
    let source = ctx.create_subdir("source");
    fixtures::create_source_tree(&source).unwrap();
    let staging = ctx.create_subdir("stage");

    let store = Arc::new(MockStoreOps::new());
    // The snapshot injects a file the live source does not have; it must
    // be uploaded, proving the staged snapshot view is what transfers.
    let (executor, _snapshots) = executor_with(
        MockSnapshotOps::new().with_file("injected/app.state", b"from snapshot"),
        store.clone(),
        &staging,
    );

    let outcome = executor.perform_backup(&source, "test-backups").await;

    assert!(outcome.succeeded, "{:?}", outcome.failure_reason);
    let keys = store.object_keys();
    assert_eq!(keys.len(), 4);
    assert!(keys.iter().all(|key| key.starts_with("backups/")));
    assert!(keys.iter().any(|key| key.ends_with("/source/data/file1.txt")));
    assert!(keys.iter().any(|key| key.ends_with("/source/injected/app.state")));

    let upload = outcome.upload.unwrap();
    assert_eq!(upload.children.unwrap().len(), 4);
}

#[tokio::test]
async fn test_missing_source_fails_without_touching_snapshots_or_store() {
    let ctx = TestContext::new();
    let staging = ctx.create_subdir("stage");

    let store = Arc::new(MockStoreOps::new());
    let (executor, snapshots) = executor_with(MockSnapshotOps::new(), store.clone(), &staging);

    let outcome = executor
        .perform_backup(&ctx.temp_dir().join("ghost"), "test-backups")
        .await;

    assert!(!outcome.succeeded);
    assert!(outcome
        .failure_reason
        .as_deref()
        .unwrap()
        .contains("does not exist"));
    assert_eq!(snapshots.call_count(), 0);
    assert!(store.get_calls().is_empty());
    assert_eq!(staging_entries(&staging), 0);
}

#[tokio::test]
async fn test_snapshot_failure_is_normalized_and_staging_removed() {
    let ctx = TestContext::new();
    let source = ctx.create_binary_file("data.bin", b"123");
    let staging = ctx.create_subdir("stage");

    let store = Arc::new(MockStoreOps::new());
    let (executor, _snapshots) =
        executor_with(MockSnapshotOps::failing("vss offline"), store.clone(), &staging);

    let outcome = executor.perform_backup(&source, "test-backups").await;

    assert!(!outcome.succeeded);
    assert!(outcome.failure_reason.as_deref().unwrap().contains("vss offline"));
    assert!(store.get_calls().is_empty());
    assert_eq!(staging_entries(&staging), 0);
}

#[tokio::test]
async fn test_upload_failure_is_normalized_and_staging_removed() {
    let ctx = TestContext::new();
    let source = ctx.create_binary_file("data.bin", b"123");
    let staging = ctx.create_subdir("stage");

    let store = Arc::new(MockStoreOps::new().with_failing_key("data.bin"));
    let (executor, _snapshots) = executor_with(MockSnapshotOps::new(), store.clone(), &staging);

    let outcome = executor.perform_backup(&source, "test-backups").await;

    assert!(!outcome.succeeded);
    assert!(outcome.failure_reason.as_deref().unwrap().contains("upload failed"));
    assert_eq!(staging_entries(&staging), 0);
}
