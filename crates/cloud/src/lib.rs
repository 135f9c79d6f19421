//! Evidence blob storage backends.
//!
//! Both backends implement [`crashwatch_core::storage::BlobStore`]:
//!
//! - [`S3BlobStore`]: public-read objects in an S3 (or compatible) bucket.
//! - [`LocalBlobStore`]: files under a directory, served from a base URL.

pub mod config;
pub mod local;
pub mod s3;

pub use config::{build_blob_store, StorageBackend, StorageConfig};
pub use local::LocalBlobStore;
pub use s3::S3BlobStore;
