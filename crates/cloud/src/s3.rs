use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use crashwatch_core::storage::{BlobStore, StorageError, CONTENT_TYPE_JPEG};

/// Uploads evidence screenshots to S3 as public-read JPEG objects.
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    /// Prefix of every returned object URL, without a trailing slash.
    public_base: String,
}

impl S3BlobStore {
    /// Build a client from the ambient AWS credential chain.
    ///
    /// When `endpoint_url` is set (MinIO, LocalStack) path-style addressing
    /// is used and object URLs are rooted at that endpoint.
    pub async fn connect(bucket: String, region: String, endpoint_url: Option<String>) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;

        let (client, public_base) = match endpoint_url {
            Some(endpoint) => {
                let conf = aws_sdk_s3::config::Builder::from(&sdk_config)
                    .endpoint_url(&endpoint)
                    .force_path_style(true)
                    .build();
                let base = format!("{}/{bucket}", endpoint.trim_end_matches('/'));
                (aws_sdk_s3::Client::from_conf(conf), base)
            }
            None => (
                aws_sdk_s3::Client::new(&sdk_config),
                public_object_base(&bucket, &region),
            ),
        };

        Self {
            client,
            bucket,
            public_base,
        }
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base)
    }
}

/// Virtual-hosted style base URL for a bucket.
fn public_object_base(bucket: &str, region: &str) -> String {
    format!("https://{bucket}.s3.{region}.amazonaws.com")
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, bytes: Vec<u8>, key: &str) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(CONTENT_TYPE_JPEG)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let url = self.object_url(key);
        tracing::debug!(bucket = %self.bucket, %url, "Uploaded evidence to S3");
        Ok(url)
    }
}
