pub mod client;
pub mod ops;
pub mod upload;

// Re-export commonly used types (used by the binary and test crate)
#[allow(unused_imports)]
pub use client::build_client;
#[allow(unused_imports)]
pub use ops::{S3StoreOps, StoreOperations};
#[allow(unused_imports)]
pub use upload::{UploadResult, Uploader, MULTIPART_THRESHOLD_BYTES, PART_SIZE_BYTES};
