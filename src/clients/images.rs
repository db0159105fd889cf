// ABOUTME: Container image build-and-push seam.
// ABOUTME: Requests carry the build inputs; results carry the pushed digest.

use crate::types::ImageRef;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// What to build and where to push it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuildRequest {
    pub context: PathBuf,
    pub dockerfile: PathBuf,
    pub target: Option<String>,
    pub args: BTreeMap<String, String>,
    pub repository: ImageRef,
    pub tags: Vec<String>,
}

/// Content digest of a pushed image, e.g. `sha256:...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ImageDigest(String);

impl ImageDigest {
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors from building or pushing images.
#[derive(Debug, thiserror::Error)]
pub enum ImageBuildError {
    #[error("build failed: {0}")]
    Build(String),

    #[error("push failed: {0}")]
    Push(String),

    #[error("image tool error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ImageBuilder: Send + Sync {
    async fn build_and_push(
        &self,
        request: &ImageBuildRequest,
    ) -> Result<ImageDigest, ImageBuildError>;
}
