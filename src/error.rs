// ABOUTME: Application-wide error types for launchpad.
// ABOUTME: Uses thiserror for ergonomic error handling at the CLI and config layer.

use crate::clients::local::CatalogError;
use crate::deploy::{DeployError, DeployErrorKind};
use crate::stack::{OverrideError, TemplateError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("unknown workload: {0}")]
    UnknownWorkload(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{kind} is not available in region {region}")]
    ServiceUnavailable { kind: String, region: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Override(#[from] OverrideError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Deploy(#[from] DeployError),
}

/// Process exit codes reported by the CLI.
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_VALIDATION: i32 = 2;
pub const EXIT_FATAL: i32 = 3;

impl Error {
    /// Exit code for this error: validation and fatal configuration problems
    /// are told apart from failures a retry may clear.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Deploy(e) => match e.kind() {
                DeployErrorKind::Validation => EXIT_VALIDATION,
                DeployErrorKind::Fatal => EXIT_FATAL,
                _ => EXIT_FAILURE,
            },
            Error::ConfigNotFound(_)
            | Error::UnknownEnvironment(_)
            | Error::UnknownWorkload(_)
            | Error::InvalidConfig(_)
            | Error::ServiceUnavailable { .. } => EXIT_FATAL,
            _ => EXIT_FAILURE,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
