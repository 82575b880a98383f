//! Upload strategy and aggregation
//!
//! Picks single-request or multipart transfer by size, generates
//! timestamped object keys, and folds directory uploads into one
//! hierarchical result. Nothing here returns an error: every failure
//! becomes an unsuccessful `UploadResult` so callers can aggregate.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use walkdir::WalkDir;

use super::ops::{PartTag, StoreOperations};

/// Files strictly larger than this go through the multipart path
pub const MULTIPART_THRESHOLD_BYTES: u64 = 100 * 1024 * 1024;

/// Size of every multipart part except the final one
pub const PART_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Result of one upload. Directory uploads carry children; file uploads
/// carry the store's checksum tag.
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub succeeded: bool,
    pub bucket: String,
    pub object_key: String,
    pub bytes_transferred: u64,
    pub part_count: u32,
    pub message: String,
    pub checksum_tag: Option<String>,
    pub children: Option<Vec<UploadResult>>,
}

impl UploadResult {
    fn uploaded(
        bucket: &str,
        key: &str,
        bytes: u64,
        parts: u32,
        etag: String,
        message: String,
    ) -> Self {
        Self {
            succeeded: true,
            bucket: bucket.to_string(),
            object_key: key.to_string(),
            bytes_transferred: bytes,
            part_count: parts,
            message,
            checksum_tag: Some(etag),
            children: None,
        }
    }

    fn failed(bucket: &str, key: &str, message: String) -> Self {
        Self {
            succeeded: false,
            bucket: bucket.to_string(),
            object_key: key.to_string(),
            bytes_transferred: 0,
            part_count: 0,
            message,
            checksum_tag: None,
            children: None,
        }
    }

    /// Roll child results up into one directory-level result. The
    /// aggregate succeeds only when every child did.
    fn aggregate(bucket: &str, prefix: &str, children: Vec<UploadResult>) -> Self {
        let succeeded = children.iter().all(|child| child.succeeded);
        let bytes_transferred = children.iter().map(|child| child.bytes_transferred).sum();
        let part_count = children.iter().map(|child| child.part_count).sum();
        let failed = children.iter().filter(|child| !child.succeeded).count();
        let message = if succeeded {
            format!(
                "uploaded {} files ({} bytes)",
                children.len(),
                bytes_transferred
            )
        } else {
            format!("{} of {} files failed to upload", failed, children.len())
        };
        Self {
            succeeded,
            bucket: bucket.to_string(),
            object_key: prefix.to_string(),
            bytes_transferred,
            part_count,
            message,
            checksum_tag: None,
            children: Some(children),
        }
    }
}

/// Transfers local content to a bucket through a `StoreOperations` backend
pub struct Uploader {
    ops: Arc<dyn StoreOperations>,
    multipart_threshold: u64,
    part_size: u64,
}

impl Uploader {
    pub fn new(ops: Arc<dyn StoreOperations>) -> Self {
        Self {
            ops,
            multipart_threshold: MULTIPART_THRESHOLD_BYTES,
            part_size: PART_SIZE_BYTES,
        }
    }

    /// Override the strategy limits. Tests use small values to exercise
    /// the multipart path without huge fixtures.
    pub fn with_limits(ops: Arc<dyn StoreOperations>, multipart_threshold: u64, part_size: u64) -> Self {
        Self {
            ops,
            multipart_threshold,
            part_size,
        }
    }

    /// Upload one regular file. When no key is given, one is generated
    /// under the timestamped `backups/` prefix from the file name.
    pub async fn upload_file(&self, file: &Path, bucket: &str, key: Option<&str>) -> UploadResult {
        let object_key = match key {
            Some(key) => key.to_string(),
            None => match file.file_name().and_then(|name| name.to_str()) {
                Some(name) => object_key_for(name, Utc::now()),
                None => {
                    return UploadResult::failed(
                        bucket,
                        "",
                        format!("path has no usable file name: {}", file.display()),
                    )
                }
            },
        };

        let metadata = match tokio::fs::metadata(file).await {
            Ok(metadata) => metadata,
            Err(e) => {
                return UploadResult::failed(
                    bucket,
                    &object_key,
                    format!("cannot stat {}: {e}", file.display()),
                )
            }
        };
        if !metadata.is_file() {
            return UploadResult::failed(
                bucket,
                &object_key,
                format!("not a regular file: {}", file.display()),
            );
        }

        let size = metadata.len();
        if size > self.multipart_threshold {
            self.upload_multipart(file, bucket, &object_key, size).await
        } else {
            self.upload_single(file, bucket, &object_key, size).await
        }
    }

    async fn upload_single(&self, file: &Path, bucket: &str, key: &str, size: u64) -> UploadResult {
        let body = match tokio::fs::read(file).await {
            Ok(body) => body,
            Err(e) => {
                return UploadResult::failed(
                    bucket,
                    key,
                    format!("cannot read {}: {e}", file.display()),
                )
            }
        };

        match self
            .ops
            .put_object(bucket, key, content_type_for(file), body)
            .await
        {
            Ok(etag) => {
                info!("Uploaded {} ({} bytes) to {}/{}", file.display(), size, bucket, key);
                UploadResult::uploaded(
                    bucket,
                    key,
                    size,
                    1,
                    etag,
                    format!("uploaded in one request ({size} bytes)"),
                )
            }
            Err(e) => UploadResult::failed(bucket, key, format!("upload failed: {e:#}")),
        }
    }

    async fn upload_multipart(
        &self,
        file: &Path,
        bucket: &str,
        key: &str,
        size: u64,
    ) -> UploadResult {
        // No store call before the file is open
        let reader = match tokio::fs::File::open(file).await {
            Ok(reader) => reader,
            Err(e) => {
                return UploadResult::failed(
                    bucket,
                    key,
                    format!("cannot open {}: {e}", file.display()),
                )
            }
        };

        let upload_id = match self
            .ops
            .create_multipart(bucket, key, content_type_for(file))
            .await
        {
            Ok(id) => id,
            Err(e) => {
                return UploadResult::failed(
                    bucket,
                    key,
                    format!("could not start multipart upload: {e:#}"),
                )
            }
        };

        match self
            .upload_parts(file, reader, bucket, key, &upload_id, size)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                // No completion happened, so abort the session; a dangling
                // session must not leave a partial object visible.
                if let Err(abort_err) = self.ops.abort_multipart(bucket, key, &upload_id).await {
                    warn!(
                        "Could not abort multipart session {}: {:#}",
                        upload_id, abort_err
                    );
                }
                UploadResult::failed(bucket, key, format!("{e:#}"))
            }
        }
    }

    async fn upload_parts(
        &self,
        file: &Path,
        mut reader: tokio::fs::File,
        bucket: &str,
        key: &str,
        upload_id: &str,
        size: u64,
    ) -> Result<UploadResult> {
        let layout = part_layout(size, self.part_size);

        let mut parts = Vec::with_capacity(layout.len());
        for (part_number, part_size) in &layout {
            let mut body = vec![0u8; *part_size as usize];
            reader
                .read_exact(&mut body)
                .await
                .with_context(|| format!("read failed at part {part_number} of {}", file.display()))?;
            let etag = self
                .ops
                .upload_part(bucket, key, upload_id, *part_number, body)
                .await
                .with_context(|| format!("part {part_number} failed"))?;
            parts.push(PartTag {
                number: *part_number,
                etag,
            });
        }

        let part_count = parts.len() as u32;
        let etag = self
            .ops
            .complete_multipart(bucket, key, upload_id, parts)
            .await
            .context("completion failed")?;

        info!(
            "Uploaded {} in {} parts to {}/{}",
            file.display(),
            part_count,
            bucket,
            key
        );
        Ok(UploadResult::uploaded(
            bucket,
            key,
            size,
            part_count,
            etag,
            format!("uploaded in {part_count} parts ({size} bytes)"),
        ))
    }

    /// Upload every regular file under `directory`. Keys are
    /// `<prefix>/<relative path>` with `/` separators; a missing prefix
    /// is generated from the directory name under the timestamped
    /// `backups/` prefix.
    pub async fn upload_directory(
        &self,
        directory: &Path,
        bucket: &str,
        prefix: Option<&str>,
    ) -> UploadResult {
        let prefix = match prefix {
            Some(prefix) => prefix.trim_end_matches('/').to_string(),
            None => match directory.file_name().and_then(|name| name.to_str()) {
                Some(name) => directory_prefix_for(name, Utc::now()),
                None => {
                    return UploadResult::failed(
                        bucket,
                        "",
                        format!("path has no usable directory name: {}", directory.display()),
                    )
                }
            },
        };

        if !directory.is_dir() {
            return UploadResult::failed(
                bucket,
                &prefix,
                format!("not a directory: {}", directory.display()),
            );
        }

        let mut children = Vec::new();
        for entry in WalkDir::new(directory) {
            let entry = match entry {
                Ok(entry) => entry,
                // Unreachable entries become failed children
                Err(e) => {
                    let at = e.path().unwrap_or(directory).display().to_string();
                    warn!("Could not walk {}: {}", at, e);
                    children.push(UploadResult::failed(
                        bucket,
                        &prefix,
                        format!("cannot walk {at}: {e}"),
                    ));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = match entry.path().strip_prefix(directory) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            let key = format!("{}/{}", prefix, relative_key(relative));
            let child = self.upload_file(entry.path(), bucket, Some(&key)).await;
            if !child.succeeded {
                warn!(
                    "Upload failed for {}: {}",
                    entry.path().display(),
                    child.message
                );
            }
            children.push(child);
        }

        let result = UploadResult::aggregate(bucket, &prefix, children);
        info!(
            "Directory upload of {} finished: {}",
            directory.display(),
            result.message
        );
        result
    }
}

/// Object key for a standalone file: `backups/<UTC timestamp>/<name>`.
/// The second-resolution timestamp keeps runs apart without any caller
/// coordination.
pub fn object_key_for(name: &str, at: DateTime<Utc>) -> String {
    format!("backups/{}/{}", at.format("%Y/%m/%d/%H%M%S"), name)
}

/// Key prefix for a directory tree: `backups/<UTC timestamp>/<dirname>`
pub fn directory_prefix_for(dir_name: &str, at: DateTime<Utc>) -> String {
    format!("backups/{}/{}", at.format("%Y/%m/%d/%H%M%S"), dir_name)
}

/// Part numbers (1-based) and sizes covering `size` bytes in fixed
/// `part_size` chunks; the final part carries the remainder.
pub fn part_layout(size: u64, part_size: u64) -> Vec<(i32, u64)> {
    let mut layout = Vec::new();
    let mut offset = 0u64;
    let mut number = 1i32;
    while offset < size {
        let len = part_size.min(size - offset);
        layout.push((number, len));
        offset += len;
        number += 1;
    }
    layout
}

/// Content type from the file extension; unknown content stays a generic
/// binary stream.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("txt") | Some("log") | Some("md") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("csv") => "text/csv",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("tar") => "application/x-tar",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Join path components with `/` regardless of the host separator
fn relative_key(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
