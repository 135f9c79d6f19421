//! Evidence blob storage seam.
//!
//! The recorder uploads one JPEG per incident through [`BlobStore`]. The
//! S3 and local-filesystem implementations live in `crashwatch-cloud`.

use async_trait::async_trait;

use crate::stream::StreamKey;
use crate::types::Timestamp;

/// MIME type of every evidence object.
pub const CONTENT_TYPE_JPEG: &str = "image/jpeg";

/// Error type for blob uploads.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Upload of '{key}' failed: {message}")]
    Upload { key: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write-once object storage that returns a publicly reachable URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` and return the object's public URL.
    async fn put(&self, bytes: Vec<u8>, key: &str) -> Result<String, StorageError>;
}

/// Deterministic object key for an incident screenshot.
///
/// Format: `[{prefix}/]{stream}_{YYYY-mm-ddTHH-MM-SS-mmm}.jpg`. Millisecond
/// precision keeps back-to-back episodes on fast file sources apart.
pub fn evidence_key(prefix: Option<&str>, stream: &StreamKey, at: Timestamp) -> String {
    let name = format!("{}_{}.jpg", stream.slug(), at.format("%Y-%m-%dT%H-%M-%S-%3f"));
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}/{name}"),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn key_without_prefix() {
        let at = chrono::Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 5).unwrap();
        assert_eq!(
            evidence_key(None, &StreamKey::Camera(7), at),
            "7_2024-05-17T08-30-05-000.jpg"
        );
    }

    #[test]
    fn key_with_prefix_trims_slashes() {
        let at = chrono::Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 5).unwrap();
        assert_eq!(
            evidence_key(Some("/incidents/"), &StreamKey::Camera(7), at),
            "incidents/7_2024-05-17T08-30-05-000.jpg"
        );
    }

    #[test]
    fn blank_prefix_is_ignored() {
        let at = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(!evidence_key(Some(""), &StreamKey::Camera(1), at).starts_with('/'));
    }
}
