use std::path::PathBuf;

use async_trait::async_trait;
use crashwatch_core::storage::{BlobStore, StorageError};

/// Writes evidence screenshots to a local directory.
///
/// Intended for development and single-host deployments where a static
/// file server exposes `root` at `base_url`.
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, bytes: Vec<u8>, key: &str) -> Result<String, StorageError> {
        if key.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(StorageError::Upload {
                key: key.to_string(),
                message: "key must be a relative path without '..' segments".into(),
            });
        }

        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), "Wrote evidence to local storage");
        Ok(format!("{}/{key}", self.base_url))
    }
}
