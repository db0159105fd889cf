// ABOUTME: Filesystem artifact store laid out like a bucket.
// ABOUTME: Objects land under <root>/<bucket>/<key>.

use crate::clients::{ArtifactStore, ArtifactUrl, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
    bucket: String,
}

impl LocalArtifactStore {
    pub fn new(root: PathBuf, bucket: impl Into<String>) -> Self {
        Self {
            root,
            bucket: bucket.into(),
        }
    }

    pub fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(&self.bucket).join(key)
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn upload(&self, key: &str, body: Bytes) -> Result<ArtifactUrl, StorageError> {
        let path = self.object_path(key);
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&path, &body).await.map_err(io_err)?;
        tracing::debug!(key, bytes = body.len(), "stored artifact");
        Ok(ArtifactUrl {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            url: format!("file://{}", path.display()),
        })
    }
}
