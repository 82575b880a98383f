//! Unit tests for the upload strategy
//!
//! The small-limit cases in the main crate cover mechanics; these tests
//! pin the production thresholds with realistically sized files and the
//! key layout contract.

use std::sync::Arc;

use rstest::rstest;
use test_utils::{fixtures, MockStoreOps, TestContext, Uploader};

const MIB: u64 = 1024 * 1024;

#[tokio::test]
async fn test_file_at_the_threshold_stays_single_request() {
    let ctx = TestContext::new();
    let file = ctx.temp_dir().join("exactly.bin");
    fixtures::sparse_file(&file, 100 * MIB).unwrap();

    let store = Arc::new(MockStoreOps::new().with_discarded_bodies());
    let uploader = Uploader::new(store.clone());

    let result = uploader.upload_file(&file, "test-backups", Some("k/exactly.bin")).await;

    assert!(result.succeeded, "{}", result.message);
    assert_eq!(result.part_count, 1);
    assert_eq!(result.bytes_transferred, 100 * MIB);
    assert_eq!(store.call_count("put_object"), 1);
    assert_eq!(store.call_count("create_multipart"), 0);
}

#[tokio::test]
async fn test_one_byte_over_the_threshold_switches_to_multipart() {
    let ctx = TestContext::new();
    let file = ctx.temp_dir().join("over.bin");
    fixtures::sparse_file(&file, 100 * MIB + 1).unwrap();

    let store = Arc::new(MockStoreOps::new().with_discarded_bodies());
    let uploader = Uploader::new(store.clone());

    let result = uploader.upload_file(&file, "test-backups", Some("k/over.bin")).await;

    assert!(result.succeeded, "{}", result.message);
    assert_eq!(result.part_count, 11);
    assert_eq!(result.bytes_transferred, 100 * MIB + 1);
    assert_eq!(store.call_count("put_object"), 0);
    assert_eq!(store.call_count("create_multipart"), 1);
    assert_eq!(store.call_count("complete_multipart"), 1);

    let part_lens: Vec<u64> = store
        .get_calls()
        .iter()
        .filter(|call| call.op == "upload_part")
        .map(|call| call.body_len)
        .collect();
    assert_eq!(part_lens.len(), 11);
    assert!(part_lens[..10].iter().all(|&len| len == 10 * MIB));
    assert_eq!(part_lens[10], 1);
}

#[tokio::test]
async fn test_large_file_splits_into_ten_mib_parts() {
    let ctx = TestContext::new();
    let file = ctx.temp_dir().join("large.bin");
    fixtures::sparse_file(&file, 150 * MIB).unwrap();

    let store = Arc::new(MockStoreOps::new().with_discarded_bodies());
    let uploader = Uploader::new(store.clone());

    let result = uploader.upload_file(&file, "test-backups", Some("k/large.bin")).await;

    assert!(result.succeeded, "{}", result.message);
    assert_eq!(result.part_count, 15);
    assert_eq!(result.bytes_transferred, 150 * MIB);
    assert!(result.message.contains("15 parts"));

    let calls = store.get_calls();
    let parts: Vec<_> = calls.iter().filter(|call| call.op == "upload_part").collect();
    assert_eq!(parts.len(), 15);
    assert!(parts.iter().all(|call| call.body_len == 10 * MIB));
    // Part numbers run 1..=15 in order
    assert_eq!(
        parts.iter().map(|call| call.part_number.unwrap()).collect::<Vec<_>>(),
        (1..=15).collect::<Vec<_>>()
    );
}

#[rstest]
#[case(16, 1, 16)] // at the limit: one put_object request
#[case(17, 2, 1)] // barely over: full part plus one byte
#[case(32, 2, 16)] // exact multiple: no short final part
#[case(49, 4, 1)]
#[tokio::test]
async fn test_part_counts_around_the_threshold(
    #[case] len: u64,
    #[case] expected_parts: u32,
    #[case] expected_last: u64,
) {
    let ctx = TestContext::new();
    let file = ctx.create_binary_file("payload.bin", &fixtures::patterned_bytes(len as usize));

    let store = Arc::new(MockStoreOps::new());
    let uploader = Uploader::with_limits(store.clone(), 16, 16);

    let result = uploader.upload_file(&file, "test-backups", Some("k/payload.bin")).await;

    assert!(result.succeeded, "{}", result.message);
    assert_eq!(result.part_count, expected_parts);
    assert_eq!(result.bytes_transferred, len);

    let last_len = store
        .get_calls()
        .iter()
        .filter(|call| call.op == "upload_part" || call.op == "put_object")
        .map(|call| call.body_len)
        .last()
        .unwrap();
    assert_eq!(last_len, expected_last);
}

#[tokio::test]
async fn test_multipart_round_trip_preserves_content() {
    let ctx = TestContext::new();
    let payload = fixtures::patterned_bytes(25);
    let file = ctx.create_binary_file("payload.bin", &payload);

    let store = Arc::new(MockStoreOps::new());
    let uploader = Uploader::with_limits(store.clone(), 10, 8);

    let result = uploader.upload_file(&file, "test-backups", Some("k/payload.bin")).await;

    assert!(result.succeeded, "{}", result.message);
    assert_eq!(result.part_count, 4);
    assert_eq!(store.object("k/payload.bin").unwrap(), payload);
}

#[tokio::test]
async fn test_generated_keys_follow_the_timestamped_layout() {
    let ctx = TestContext::new();
    let file = ctx.create_file("report.txt", "quarterly numbers");

    let store = Arc::new(MockStoreOps::new());
    let uploader = Uploader::new(store.clone());

    let result = uploader.upload_file(&file, "test-backups", None).await;

    assert!(result.succeeded, "{}", result.message);
    let segments: Vec<&str> = result.object_key.split('/').collect();
    assert_eq!(segments.len(), 6, "unexpected key: {}", result.object_key);
    assert_eq!(segments[0], "backups");
    assert_eq!(segments[1].len(), 4); // year
    assert_eq!(segments[2].len(), 2); // month
    assert_eq!(segments[3].len(), 2); // day
    assert_eq!(segments[4].len(), 6); // HHMMSS
    assert!(segments[1..5]
        .iter()
        .all(|segment| segment.chars().all(|c| c.is_ascii_digit())));
    assert_eq!(segments[5], "report.txt");
}

#[tokio::test]
async fn test_directory_keys_mirror_the_tree_under_the_prefix() {
    let ctx = TestContext::new();
    let source = ctx.create_subdir("source");
    fixtures::create_source_tree(&source).unwrap();

    let store = Arc::new(MockStoreOps::new());
    let uploader = Uploader::new(store.clone());

    let result = uploader
        .upload_directory(&source, "test-backups", Some("backups/2031/01/05/101500/source"))
        .await;

    assert!(result.succeeded, "{}", result.message);
    assert_eq!(result.children.as_ref().unwrap().len(), 3);
    assert_eq!(
        store.object_keys(),
        vec![
            "backups/2031/01/05/101500/source/config/settings.json".to_string(),
            "backups/2031/01/05/101500/source/data/file1.txt".to_string(),
            "backups/2031/01/05/101500/source/data/file2.txt".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_directory_aggregate_sums_bytes_and_flags_failures() {
    let ctx = TestContext::new();
    let source = ctx.create_subdir("source");
    fixtures::create_source_tree(&source).unwrap();

    let store = Arc::new(MockStoreOps::new().with_failing_key("file2"));
    let uploader = Uploader::new(store.clone());

    let result = uploader.upload_directory(&source, "test-backups", Some("p")).await;

    assert!(!result.succeeded);
    assert!(result.message.contains("1 of 3 files failed"));
    let children = result.children.as_ref().unwrap();
    assert_eq!(children.len(), 3);
    assert_eq!(children.iter().filter(|child| child.succeeded).count(), 2);
    // Only the successful children count toward the byte total
    let successful_bytes: u64 = children
        .iter()
        .filter(|child| child.succeeded)
        .map(|child| child.bytes_transferred)
        .sum();
    assert_eq!(result.bytes_transferred, successful_bytes);
}
