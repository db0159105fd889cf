// ABOUTME: Workspace configuration: launchpad.yml, environments and workload directories.
// ABOUTME: Handles discovery, env var overrides and loading deployer inputs from disk.

mod environment;

pub use environment::{
    EnvironmentConfig, EnvironmentHttpConfig, EnvironmentNetworkConfig, Ingress, IngressConfig,
    Placement,
};

use crate::clients::local::LocalOptions;
use crate::deploy::{AppContext, DeployerInput, EnvResources};
use crate::error::{Error, Result};
use crate::manifest::WorkloadManifest;
use crate::stack::{Addons, TemplateOverrider};
use crate::types::{ImageRef, WorkloadName};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "launchpad.yml";
pub const CONFIG_FILENAME_ALT: &str = "launchpad.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".launchpad/config.yml";

/// Overrides `region` when set.
pub const REGION_ENV_VAR: &str = "LAUNCHPAD_REGION";

pub const ENVIRONMENTS_DIR: &str = "environments";
pub const WORKLOADS_DIR: &str = "workloads";
pub const MANIFEST_FILENAME: &str = "manifest.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    pub app: String,

    pub account_id: String,

    pub region: String,

    #[serde(default)]
    pub domain: Option<String>,

    pub resources: ResourcesConfig,

    #[serde(default)]
    pub deploy: DeployConfig,

    /// Local provider state, relative to the workspace root.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Packaged custom-resource bundles, relative to the workspace root.
    #[serde(default = "default_custom_resources_dir")]
    pub custom_resources_dir: PathBuf,

    /// Directory the configuration was discovered in.
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourcesConfig {
    pub artifact_bucket: String,

    #[serde(default)]
    pub artifact_key: String,

    /// Image repository per workload name.
    #[serde(default)]
    pub repositories: BTreeMap<String, ImageRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    #[serde(default = "default_deploy_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default)]
    pub disable_rollback: bool,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            timeout: default_deploy_timeout(),
            disable_rollback: false,
        }
    }
}

fn default_deploy_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".launchpad/state")
}

fn default_custom_resources_dir() -> PathBuf {
    PathBuf::from(".launchpad/custom-resources")
}

/// A workload's files, loaded and parsed.
#[derive(Debug, Clone)]
pub struct WorkloadFiles {
    pub manifest: WorkloadManifest,
    pub raw_manifest: String,
    pub dir: PathBuf,
    pub overrider: TemplateOverrider,
    pub addons: Option<Addons>,
}

impl WorkspaceConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    /// Load a configuration file rooted at `root`, applying env var overrides.
    pub fn load(path: &Path, root: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.root = root.to_path_buf();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("using configuration {}", path.display());
                return Self::load(path, dir);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(region) = std::env::var(REGION_ENV_VAR)
            && !region.trim().is_empty()
        {
            self.region = region.trim().to_string();
        }
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(&self.state_dir)
    }

    pub fn custom_resources_dir(&self) -> PathBuf {
        self.root.join(&self.custom_resources_dir)
    }

    pub fn app_context(&self) -> AppContext {
        AppContext {
            name: self.app.clone(),
            account_id: self.account_id.clone(),
            region: self.region.clone(),
            domain: self.domain.clone(),
        }
    }

    pub fn env_resources(&self, workload: &WorkloadName) -> EnvResources {
        EnvResources {
            artifact_bucket: self.resources.artifact_bucket.clone(),
            artifact_key: self.resources.artifact_key.clone(),
            repository: self.resources.repositories.get(workload.as_str()).cloned(),
        }
    }

    pub fn local_options(&self) -> LocalOptions {
        LocalOptions {
            workspace: self.root.clone(),
            state_dir: self.state_dir(),
            resources_dir: self.custom_resources_dir(),
            artifact_bucket: self.resources.artifact_bucket.clone(),
        }
    }

    /// Everything a deployer needs for `workload` in `environment`.
    pub fn deployer_input(
        &self,
        environment: EnvironmentConfig,
        workload: WorkloadFiles,
        image_tag: Option<String>,
    ) -> DeployerInput {
        let resources = self.env_resources(workload.manifest.name());
        DeployerInput {
            app: self.app_context(),
            environment,
            manifest: workload.manifest,
            raw_manifest: workload.raw_manifest,
            workspace: self.root.clone(),
            resources,
            image_tag,
            overrider: workload.overrider,
            addons: workload.addons,
        }
    }

    /// Read `environments/<name>.yml`.
    pub fn load_environment(&self, name: &str) -> Result<EnvironmentConfig> {
        let path = self
            .root
            .join(ENVIRONMENTS_DIR)
            .join(format!("{}.yml", name));
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::UnknownEnvironment(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let env = EnvironmentConfig::from_yaml(&content)?;
        if env.name != name {
            return Err(Error::InvalidConfig(format!(
                "{} declares environment {}",
                path.display(),
                env.name
            )));
        }
        Ok(env)
    }

    /// Read `workloads/<name>/` with its manifest, override patches and add-ons.
    pub fn load_workload(&self, name: &str) -> Result<WorkloadFiles> {
        let dir = self.root.join(WORKLOADS_DIR).join(name);
        let raw_manifest = match std::fs::read_to_string(dir.join(MANIFEST_FILENAME)) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::UnknownWorkload(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let manifest = WorkloadManifest::from_yaml(&raw_manifest)?;
        if manifest.name().as_str() != name {
            return Err(Error::InvalidConfig(format!(
                "workload directory {} holds manifest for {}",
                name,
                manifest.name()
            )));
        }
        let overrider = TemplateOverrider::load(&dir)?;
        let addons = Addons::load(&dir)?;
        Ok(WorkloadFiles {
            manifest,
            raw_manifest,
            dir,
            overrider,
            addons,
        })
    }
}
