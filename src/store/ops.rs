//! Object store operations abstraction for testability
//!
//! `StoreOperations` is the seam between upload strategy logic and the
//! S3 SDK. The real implementation wraps `aws_sdk_s3::Client`; the mock
//! records calls and assembles multipart uploads in memory.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;

/// Identity of one uploaded part, echoed back on completion
#[derive(Debug, Clone)]
pub struct PartTag {
    pub number: i32,
    pub etag: String,
}

/// Abstraction over the object store calls the uploader needs
#[async_trait]
pub trait StoreOperations: Send + Sync {
    /// Upload a whole object in one request; returns the store's ETag
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String>;

    /// Open a multipart session; returns the upload id
    async fn create_multipart(&self, bucket: &str, key: &str, content_type: &str)
        -> Result<String>;

    /// Upload one part of an open session; returns the part's ETag
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String>;

    /// Assemble the uploaded parts into the final object; returns its ETag
    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<PartTag>,
    ) -> Result<String>;

    /// Discard an open session so no partial object stays behind
    async fn abort_multipart(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()>;
}

/// S3-backed implementation
pub struct S3StoreOps {
    client: Client,
}

impl S3StoreOps {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StoreOperations for S3StoreOps {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String> {
        let response = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("Failed to upload object {key} to bucket {bucket}"))?;
        Ok(response.e_tag().unwrap_or_default().to_string())
    }

    async fn create_multipart(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<String> {
        let response = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("Failed to start multipart upload for {key}"))?;
        response
            .upload_id()
            .map(str::to_string)
            .context("Store returned no upload id")
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String> {
        let response = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("Failed to upload part {part_number} of {key}"))?;
        Ok(response.e_tag().unwrap_or_default().to_string())
    }

    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<PartTag>,
    ) -> Result<String> {
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(
                parts
                    .into_iter()
                    .map(|part| {
                        CompletedPart::builder()
                            .part_number(part.number)
                            .e_tag(part.etag)
                            .build()
                    })
                    .collect(),
            ))
            .build();

        let response = self
            .client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .with_context(|| format!("Failed to complete multipart upload for {key}"))?;
        Ok(response.e_tag().unwrap_or_default().to_string())
    }

    async fn abort_multipart(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .with_context(|| format!("Failed to abort multipart upload for {key}"))?;
        Ok(())
    }
}

/// An in-memory store double for testing: records calls, keeps uploaded
/// bodies, and can be scripted to fail specific keys or part numbers.
/// Available for use in external test crates.
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// One recorded store invocation
    #[derive(Clone, Debug)]
    pub struct StoreCall {
        pub op: &'static str,
        pub key: String,
        pub part_number: Option<i32>,
        pub body_len: u64,
    }

    /// Mock store operations for testing
    #[derive(Default)]
    pub struct MockStoreOps {
        calls: Mutex<Vec<StoreCall>>,
        objects: Mutex<HashMap<String, Vec<u8>>>,
        sessions: Mutex<HashMap<String, Vec<(i32, Vec<u8>)>>>,
        aborted: Mutex<Vec<String>>,
        fail_keys: Vec<String>,
        fail_parts: Vec<i32>,
        fail_complete: bool,
        discard_bodies: bool,
        next_upload_id: AtomicU64,
    }

    impl MockStoreOps {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail any operation whose key contains the fragment
        pub fn with_failing_key(mut self, fragment: &str) -> Self {
            self.fail_keys.push(fragment.to_string());
            self
        }

        /// Fail the given part number in every multipart session
        pub fn with_failing_part(mut self, part_number: i32) -> Self {
            self.fail_parts.push(part_number);
            self
        }

        /// Fail every completion call
        pub fn with_failing_complete(mut self) -> Self {
            self.fail_complete = true;
            self
        }

        /// Record body lengths only. Keeps tests over multi-hundred-MiB
        /// fixtures from holding every part in memory.
        pub fn with_discarded_bodies(mut self) -> Self {
            self.discard_bodies = true;
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<StoreCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Get the number of calls of one operation kind
        pub fn call_count(&self, op: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|call| call.op == op)
                .count()
        }

        /// Body of a stored object (single request or completed multipart)
        pub fn object(&self, key: &str) -> Option<Vec<u8>> {
            self.objects.lock().unwrap().get(key).cloned()
        }

        /// Keys of all stored objects, sorted
        pub fn object_keys(&self) -> Vec<String> {
            let mut keys: Vec<_> = self.objects.lock().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        }

        /// Upload ids of aborted sessions, in abort order
        pub fn aborted_sessions(&self) -> Vec<String> {
            self.aborted.lock().unwrap().clone()
        }

        fn record(&self, op: &'static str, key: &str, part_number: Option<i32>, body_len: u64) {
            self.calls.lock().unwrap().push(StoreCall {
                op,
                key: key.to_string(),
                part_number,
                body_len,
            });
        }

        fn check_key(&self, key: &str) -> Result<()> {
            if self.fail_keys.iter().any(|fragment| key.contains(fragment)) {
                anyhow::bail!("injected failure for key {key}");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl StoreOperations for MockStoreOps {
        async fn put_object(
            &self,
            _bucket: &str,
            key: &str,
            _content_type: &str,
            body: Vec<u8>,
        ) -> Result<String> {
            self.record("put_object", key, None, body.len() as u64);
            self.check_key(key)?;
            if !self.discard_bodies {
                self.objects.lock().unwrap().insert(key.to_string(), body);
            }
            Ok(format!("\"etag-{key}\""))
        }

        async fn create_multipart(
            &self,
            _bucket: &str,
            key: &str,
            _content_type: &str,
        ) -> Result<String> {
            self.record("create_multipart", key, None, 0);
            self.check_key(key)?;
            let id = format!(
                "upload-{}",
                self.next_upload_id.fetch_add(1, Ordering::SeqCst) + 1
            );
            self.sessions.lock().unwrap().insert(id.clone(), Vec::new());
            Ok(id)
        }

        async fn upload_part(
            &self,
            _bucket: &str,
            key: &str,
            upload_id: &str,
            part_number: i32,
            body: Vec<u8>,
        ) -> Result<String> {
            self.record("upload_part", key, Some(part_number), body.len() as u64);
            self.check_key(key)?;
            if self.fail_parts.contains(&part_number) {
                anyhow::bail!("injected failure for part {part_number}");
            }
            let kept = if self.discard_bodies { Vec::new() } else { body };
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions
                .get_mut(upload_id)
                .with_context(|| format!("unknown upload id {upload_id}"))?;
            session.push((part_number, kept));
            Ok(format!("\"etag-part-{part_number}\""))
        }

        async fn complete_multipart(
            &self,
            _bucket: &str,
            key: &str,
            upload_id: &str,
            parts: Vec<PartTag>,
        ) -> Result<String> {
            self.record("complete_multipart", key, None, 0);
            if self.fail_complete {
                anyhow::bail!("injected failure completing {key}");
            }
            let mut stored = self
                .sessions
                .lock()
                .unwrap()
                .remove(upload_id)
                .with_context(|| format!("unknown upload id {upload_id}"))?;
            anyhow::ensure!(
                stored.len() == parts.len(),
                "completed with {} part tags but {} uploaded parts",
                parts.len(),
                stored.len()
            );
            if !self.discard_bodies {
                stored.sort_by_key(|(number, _)| *number);
                let body: Vec<u8> = stored.into_iter().flat_map(|(_, bytes)| bytes).collect();
                self.objects.lock().unwrap().insert(key.to_string(), body);
            }
            Ok(format!("\"etag-multipart-{}\"", parts.len()))
        }

        async fn abort_multipart(&self, _bucket: &str, key: &str, upload_id: &str) -> Result<()> {
            self.record("abort_multipart", key, None, 0);
            self.sessions.lock().unwrap().remove(upload_id);
            self.aborted.lock().unwrap().push(upload_id.to_string());
            Ok(())
        }
    }
}
