// ABOUTME: Container image source for a workload: built locally or pulled from a location.
// ABOUTME: Exactly one of `build` or `location` must be present.

use crate::types::ImageRef;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawImageConfig")]
pub struct ImageConfig {
    pub source: ImageSource,
    pub port: Option<u16>,
}

#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Build from a Dockerfile and push to the workload's repository.
    Build(BuildConfig),
    /// Use an existing image as-is.
    Location(ImageRef),
}

impl ImageConfig {
    pub fn build(&self) -> Option<&BuildConfig> {
        match &self.source {
            ImageSource::Build(build) => Some(build),
            ImageSource::Location(_) => None,
        }
    }
}

/// `build: path/to/Dockerfile` or the detailed form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BuildConfig {
    Dockerfile(PathBuf),
    Detailed {
        #[serde(default)]
        dockerfile: Option<PathBuf>,
        #[serde(default)]
        context: Option<PathBuf>,
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        args: BTreeMap<String, String>,
    },
}

impl BuildConfig {
    pub fn dockerfile(&self) -> PathBuf {
        match self {
            BuildConfig::Dockerfile(path) => path.clone(),
            BuildConfig::Detailed {
                dockerfile: Some(path),
                ..
            } => path.clone(),
            BuildConfig::Detailed {
                dockerfile: None,
                context,
                ..
            } => context
                .as_deref()
                .unwrap_or_else(|| Path::new("."))
                .join("Dockerfile"),
        }
    }

    /// Build context; defaults to the Dockerfile's directory.
    pub fn context(&self) -> PathBuf {
        match self {
            BuildConfig::Detailed {
                context: Some(context),
                ..
            } => context.clone(),
            _ => self
                .dockerfile()
                .parent()
                .map(Path::to_path_buf)
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            BuildConfig::Detailed { target, .. } => target.as_deref(),
            BuildConfig::Dockerfile(_) => None,
        }
    }

    pub fn args(&self) -> BTreeMap<String, String> {
        match self {
            BuildConfig::Detailed { args, .. } => args.clone(),
            BuildConfig::Dockerfile(_) => BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawImageConfig {
    #[serde(default)]
    build: Option<BuildConfig>,
    #[serde(default)]
    location: Option<ImageRef>,
    #[serde(default)]
    port: Option<u16>,
}

impl TryFrom<RawImageConfig> for ImageConfig {
    type Error = String;

    fn try_from(raw: RawImageConfig) -> Result<Self, Self::Error> {
        let source = match (raw.build, raw.location) {
            (Some(build), None) => ImageSource::Build(build),
            (None, Some(location)) => ImageSource::Location(location),
            (Some(_), Some(_)) => {
                return Err("image: `build` and `location` are mutually exclusive".to_string());
            }
            (None, None) => return Err("image: one of `build` or `location` is required".to_string()),
        };
        Ok(Self {
            source,
            port: raw.port,
        })
    }
}
