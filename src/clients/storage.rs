// ABOUTME: Object storage for deployment artifacts.
// ABOUTME: Uploads return references, never the stored bytes.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

/// Where an uploaded artifact lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactUrl {
    pub bucket: String,
    pub key: String,
    pub url: String,
}

impl ArtifactUrl {
    /// The object ARN, as task definitions reference environment files.
    pub fn s3_arn(&self) -> String {
        format!("arn:aws:s3:::{}/{}", self.bucket, self.key)
    }
}

/// Errors from artifact storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("upload {key}: {source}")]
    Io {
        key: String,
        source: std::io::Error,
    },

    #[error("storage service error: {0}")]
    Api(String),
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `body` under `key` in the artifact bucket.
    async fn upload(&self, key: &str, body: Bytes) -> Result<ArtifactUrl, StorageError>;
}
