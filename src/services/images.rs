use async_trait::async_trait;
use thiserror::Error;

use crate::config::BucketConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("image storage is not configured")]
    NotConfigured,
    #[error("image upload failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image upload rejected with {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores `bytes` at `path` inside the prescription bucket and returns the stored path.
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// Hosted object storage reached over its REST API.
pub struct BucketImageStore {
    client: reqwest::Client,
    config: BucketConfig,
}

impl BucketImageStore {
    pub fn new(client: reqwest::Client, config: BucketConfig) -> Self {
        BucketImageStore { client, config }
    }
}

#[async_trait]
impl ImageStore for BucketImageStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let (Some(url), Some(key)) = (self.config.url.as_deref(), self.config.service_key.as_deref()) else {
            return Err(StorageError::NotConfigured);
        };
        let response = self
            .client
            .post(format!("{url}/storage/v1/object/{}/{path}", self.config.bucket))
            .bearer_auth(key)
            .header("apikey", key)
            .header("x-upsert", "false")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Status {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(bucket = %self.config.bucket, path, "stored prescription image");
        Ok(path.to_owned())
    }
}
