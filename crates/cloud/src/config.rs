use std::sync::Arc;

use crashwatch_core::storage::BlobStore;

use crate::local::LocalBlobStore;
use crate::s3::S3BlobStore;

/// Which blob backend receives evidence screenshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    S3 {
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    },
    Local {
        root: String,
        base_url: String,
    },
}

/// Evidence storage configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Optional folder namespace prepended to every evidence key.
    pub prefix: Option<String>,
}

impl StorageConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                          |
    /// |--------------------------|----------------------------------|
    /// | `STORAGE_BACKEND`        | `local` (`s3` or `local`)        |
    /// | `S3_BUCKET`              | required when backend is `s3`    |
    /// | `S3_REGION`              | `us-east-1`                      |
    /// | `S3_ENDPOINT_URL`        | unset                            |
    /// | `STORAGE_PREFIX`         | unset                            |
    /// | `LOCAL_STORAGE_DIR`      | `./evidence`                     |
    /// | `LOCAL_STORAGE_BASE_URL` | `http://localhost:3000/evidence` |
    pub fn from_env() -> Self {
        let backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".into())
            .as_str()
        {
            "s3" => StorageBackend::S3 {
                bucket: std::env::var("S3_BUCKET")
                    .expect("S3_BUCKET must be set when STORAGE_BACKEND=s3"),
                region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
                endpoint_url: std::env::var("S3_ENDPOINT_URL").ok(),
            },
            "local" => StorageBackend::Local {
                root: std::env::var("LOCAL_STORAGE_DIR").unwrap_or_else(|_| "./evidence".into()),
                base_url: std::env::var("LOCAL_STORAGE_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:3000/evidence".into()),
            },
            other => panic!("STORAGE_BACKEND must be 's3' or 'local', got '{other}'"),
        };

        let prefix = std::env::var("STORAGE_PREFIX")
            .ok()
            .filter(|p| !p.trim().is_empty());

        Self { backend, prefix }
    }
}

/// Construct the configured blob store.
pub async fn build_blob_store(config: &StorageConfig) -> Arc<dyn BlobStore> {
    match &config.backend {
        StorageBackend::S3 {
            bucket,
            region,
            endpoint_url,
        } => {
            tracing::info!(%bucket, %region, "Using S3 evidence storage");
            Arc::new(S3BlobStore::connect(bucket.clone(), region.clone(), endpoint_url.clone()).await)
        }
        StorageBackend::Local { root, base_url } => {
            tracing::info!(%root, %base_url, "Using local evidence storage");
            Arc::new(LocalBlobStore::new(root, base_url.clone()))
        }
    }
}
