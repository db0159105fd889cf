// ABOUTME: Artifact upload pipeline: ordered, fail-fast steps feeding stack assembly.
// ABOUTME: Each step stores content-addressed artifacts and records references in the output.

use super::input::UploadArtifactsOutput;
use crate::clients::{
    ArtifactStore, ImageBuildError, ImageBuildRequest, ImageBuilder, ResourceError,
    ResourceReader, StorageError,
};
use crate::manifest::{ImageConfig, ImageSource, WorkloadKind};
use crate::stack::Addons;
use crate::types::{ImageRef, ParseImageRefError, WorkloadName};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use sha2::{Digest, Sha256};
use snafu::{ResultExt, Snafu};
use std::fmt;
use std::path::{Path, PathBuf};

/// Pipeline phases, in the order variants run them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadPhase {
    ContainerImages,
    EnvironmentFiles,
    AddonsTemplate,
    CustomResources,
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadPhase::ContainerImages => write!(f, "container images"),
            UploadPhase::EnvironmentFiles => write!(f, "environment files"),
            UploadPhase::AddonsTemplate => write!(f, "add-ons template"),
            UploadPhase::CustomResources => write!(f, "custom resources"),
        }
    }
}

/// What went wrong inside a step.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Image(#[from] ImageBuildError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Resources(#[from] ResourceError),

    #[error("pushed image digest: {0}")]
    Digest(#[from] ParseImageRefError),

    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no image repository configured for {0}")]
    MissingRepository(String),
}

/// A failed pipeline run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum UploadError {
    #[snafu(display("upload {phase}: {source}"))]
    Step {
        phase: UploadPhase,
        /// Output of the phases that completed before the failure.
        partial: Box<UploadArtifactsOutput>,
        source: StepError,
    },
}

impl UploadError {
    pub fn phase(&self) -> UploadPhase {
        match self {
            UploadError::Step { phase, .. } => *phase,
        }
    }

    pub fn partial(&self) -> &UploadArtifactsOutput {
        match self {
            UploadError::Step { partial, .. } => partial,
        }
    }

    pub fn step_error(&self) -> &StepError {
        match self {
            UploadError::Step { source, .. } => source,
        }
    }

    /// Whether the cause is a packaging or configuration defect.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.step_error(),
            StepError::Resources(_) | StepError::MissingRepository(_)
        )
    }
}

/// One phase of the pipeline.
#[async_trait]
pub trait UploadStep: Send + Sync {
    fn phase(&self) -> UploadPhase;

    /// Upload this phase's artifacts and record their references in `out`.
    async fn upload(&self, out: &mut UploadArtifactsOutput) -> Result<(), StepError>;
}

/// Run steps in order, stopping at the first failure.
///
/// A failing step never leaks half-written references: the error carries the
/// output as it stood after the last successful step.
pub async fn upload_artifacts(
    steps: &[&dyn UploadStep],
) -> Result<UploadArtifactsOutput, UploadError> {
    let mut out = UploadArtifactsOutput::default();
    for step in steps {
        let phase = step.phase();
        tracing::debug!(%phase, "uploading");
        let mut next = out.clone();
        step.upload(&mut next).await.with_context(|_| StepSnafu {
            phase,
            partial: Box::new(out.clone()),
        })?;
        out = next;
        tracing::debug!(%phase, "uploaded");
    }
    Ok(out)
}

/// `<prefix>/<sha256 of body>/<name>`; re-uploading the same body is a no-op overwrite.
pub fn content_key(prefix: &str, name: &str, body: &[u8]) -> String {
    format!("{}/{:x}/{}", prefix, Sha256::digest(body), name)
}

/// Build and push the workload image, or record a pre-built location.
pub struct ContainerImagesStep<'a> {
    pub workload: &'a WorkloadName,
    pub image: &'a ImageConfig,
    pub workspace: &'a Path,
    pub repository: Option<&'a ImageRef>,
    pub tag: Option<&'a str>,
    pub builder: &'a dyn ImageBuilder,
}

#[async_trait]
impl UploadStep for ContainerImagesStep<'_> {
    fn phase(&self) -> UploadPhase {
        UploadPhase::ContainerImages
    }

    async fn upload(&self, out: &mut UploadArtifactsOutput) -> Result<(), StepError> {
        let build = match &self.image.source {
            ImageSource::Location(location) => {
                out.image = Some(location.clone());
                return Ok(());
            }
            ImageSource::Build(build) => build,
        };
        let repository = self
            .repository
            .ok_or_else(|| StepError::MissingRepository(self.workload.to_string()))?;

        let tag = self.tag.unwrap_or("latest");
        let request = ImageBuildRequest {
            context: self.workspace.join(build.context()),
            dockerfile: self.workspace.join(build.dockerfile()),
            target: build.target().map(str::to_string),
            args: build.args(),
            repository: repository.clone(),
            tags: vec![tag.to_string()],
        };
        let digest = self.builder.build_and_push(&request).await?;
        out.image = Some(repository.with_tag(tag).with_digest(digest.as_str())?);
        out.image_digest = Some(digest);
        Ok(())
    }
}

/// Upload the manifest's `env_file`, if any.
pub struct EnvironmentFilesStep<'a> {
    pub workload: &'a WorkloadName,
    /// Already resolved against the workspace.
    pub env_file: Option<PathBuf>,
    pub store: &'a dyn ArtifactStore,
}

#[async_trait]
impl UploadStep for EnvironmentFilesStep<'_> {
    fn phase(&self) -> UploadPhase {
        UploadPhase::EnvironmentFiles
    }

    async fn upload(&self, out: &mut UploadArtifactsOutput) -> Result<(), StepError> {
        let Some(path) = &self.env_file else {
            return Ok(());
        };
        let body = tokio::fs::read(path).await.map_err(|source| StepError::Read {
            path: path.clone(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "env".to_string());
        let key = content_key(
            &format!("manual/env-files/{}", self.workload),
            &name,
            &body,
        );
        out.env_file = Some(self.store.upload(&key, Bytes::from(body)).await?);
        Ok(())
    }
}

/// Upload the add-ons template, if the workload has one.
pub struct AddonsTemplateStep<'a> {
    pub workload: &'a WorkloadName,
    pub addons: Option<&'a Addons>,
    pub store: &'a dyn ArtifactStore,
}

#[async_trait]
impl UploadStep for AddonsTemplateStep<'_> {
    fn phase(&self) -> UploadPhase {
        UploadPhase::AddonsTemplate
    }

    async fn upload(&self, out: &mut UploadArtifactsOutput) -> Result<(), StepError> {
        let Some(addons) = self.addons else {
            return Ok(());
        };
        let body = addons.template().as_bytes();
        let key = content_key(
            &format!("manual/addons/{}", self.workload),
            "template.yml",
            body,
        );
        let url = self
            .store
            .upload(&key, Bytes::copy_from_slice(body))
            .await?;
        out.addons_template = Some(url);
        Ok(())
    }
}

/// Package the workload kind's custom-resource functions.
pub struct CustomResourcesStep<'a> {
    pub kind: WorkloadKind,
    pub reader: &'a dyn ResourceReader,
    pub store: &'a dyn ArtifactStore,
}

#[async_trait]
impl UploadStep for CustomResourcesStep<'_> {
    fn phase(&self) -> UploadPhase {
        UploadPhase::CustomResources
    }

    async fn upload(&self, out: &mut UploadArtifactsOutput) -> Result<(), StepError> {
        let bundle = self.reader.read_custom_resources(self.kind).await?;
        for function in bundle.functions {
            let key = content_key(
                &format!("manual/scripts/custom-resources/{}", function.name.to_lowercase()),
                &function.handler,
                &function.body,
            );
            let url = self.store.upload(&key, function.body).await?;
            out.custom_resources.insert(function.name, url);
        }
        Ok(())
    }
}
