// ABOUTME: Inputs and outputs of the deployer operations.
// ABOUTME: Everything a deployer is constructed with plus per-call inputs and results.

use crate::clients::{ArtifactUrl, ImageDigest, StackOutcome};
use crate::config::EnvironmentConfig;
use crate::manifest::WorkloadManifest;
use crate::stack::{Addons, TemplateOverrider};
use crate::types::{ImageRef, StackId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// The application a workload belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    pub name: String,
    pub account_id: String,
    pub region: String,
    pub domain: Option<String>,
}

/// Application resources provisioned in the target region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvResources {
    pub artifact_bucket: String,
    /// Encryption key for uploaded artifacts.
    pub artifact_key: String,
    /// Image repository for the workload, required when it builds an image.
    pub repository: Option<ImageRef>,
}

/// Everything a deployer is constructed with.
#[derive(Debug, Clone)]
pub struct DeployerInput {
    pub app: AppContext,
    pub environment: EnvironmentConfig,
    pub manifest: WorkloadManifest,
    /// Manifest text as written, embedded in the template metadata.
    pub raw_manifest: String,
    /// Root that manifest paths (Dockerfiles, env files) are relative to.
    pub workspace: PathBuf,
    pub resources: EnvResources,
    pub image_tag: Option<String>,
    pub overrider: TemplateOverrider,
    pub addons: Option<Addons>,
}

/// Results of the upload pipeline; references only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadArtifactsOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_digest: Option<ImageDigest>,

    /// The image the task runs: a pushed `repo@digest` or the manifest's location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_file: Option<ArtifactUrl>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub addons_template: Option<ArtifactUrl>,

    /// Function name to packaged source.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_resources: BTreeMap<String, ArtifactUrl>,
}

/// Upload results and extra tags handed to stack assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackRuntimeConfiguration {
    pub uploads: UploadArtifactsOutput,
    pub tags: BTreeMap<String, String>,
}

impl From<UploadArtifactsOutput> for StackRuntimeConfiguration {
    fn from(uploads: UploadArtifactsOutput) -> Self {
        Self {
            uploads,
            tags: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOptions {
    /// Roll the service's tasks even when the template is unchanged.
    pub force_new_update: bool,
    pub disable_rollback: bool,
    pub timeout: Duration,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            force_new_update: false,
            disable_rollback: false,
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateTemplateInput {
    pub runtime: StackRuntimeConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateTemplateOutput {
    pub stack_name: String,
    pub template: String,
    pub parameters: String,
}

#[derive(Debug, Clone, Default)]
pub struct DeployWorkloadInput {
    pub runtime: StackRuntimeConfiguration,
    pub options: DeployOptions,
}

/// What the stack operation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployWorkloadOutput {
    pub stack_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_id: Option<StackId>,
    /// False when the template was unchanged.
    pub changed: bool,
    /// True when tasks were rolled without a template change.
    pub forced: bool,
    pub completed_at: DateTime<Utc>,
}

impl DeployWorkloadOutput {
    pub fn new(stack_name: impl Into<String>, outcome: StackOutcome, forced: bool) -> Self {
        let (stack_id, changed) = match outcome {
            StackOutcome::Updated { stack_id } => (Some(stack_id), true),
            StackOutcome::NoChanges => (None, false),
        };
        Self {
            stack_name: stack_name.into(),
            stack_id,
            changed,
            forced,
            completed_at: Utc::now(),
        }
    }
}
