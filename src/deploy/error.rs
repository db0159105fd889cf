// ABOUTME: Error taxonomy for workload deployment.
// ABOUTME: Fatal configuration, validation, collaborator, upload and override failures.

use super::upload::UploadError;
use crate::clients::LoadBalancerScheme;
use crate::manifest::{RuleLocation, WorkloadKind};
use crate::stack::{OverrideError, TemplateError};
use crate::types::LoadBalancerArn;
use std::fmt;
use std::time::Duration;

/// Configuration problems no retry can fix.
#[derive(Debug, thiserror::Error)]
pub enum FatalConfigError {
    #[error("manifest is a {actual}, expected a {expected}")]
    ManifestKindMismatch {
        expected: WorkloadKind,
        actual: WorkloadKind,
    },

    #[error("workload {workload} builds an image but no repository is configured for it")]
    MissingRepository { workload: String },
}

/// A broken infrastructure constraint, detected before anything is mutated.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error(
        "imported load balancer {arn} is {actual}; {workload} requires an {expected} load balancer"
    )]
    ImportedAlbScheme {
        arn: LoadBalancerArn,
        workload: String,
        expected: LoadBalancerScheme,
        actual: LoadBalancerScheme,
    },

    #[error("imported load balancer {arn} has no listeners")]
    ImportedAlbNoListeners { arn: LoadBalancerArn },

    #[error(
        "imported load balancer {arn} must have exactly one HTTP and one HTTPS listener, found {http} HTTP and {https} HTTPS"
    )]
    ImportedAlbListenerProtocols {
        arn: LoadBalancerArn,
        http: usize,
        https: usize,
    },

    #[error("{workload} must set an alias because environment {environment} has imported certificates")]
    NoAliasWithImportedCerts {
        workload: String,
        environment: String,
    },

    #[error("an alias requires imported certificates, but environment {environment} has none")]
    AliasWithoutImportedCerts { environment: String },

    #[error("alias {alias} is not covered by any certificate imported into environment {environment}")]
    AliasNotCovered { environment: String, alias: String },
}

/// The collaborator call a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    RegionLookup,
    DescribeLoadBalancer,
    ValidateCertificates,
    RenderTemplate,
    ExecuteStack,
    ForceUpdate,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::RegionLookup => "look up region",
            Operation::DescribeLoadBalancer => "describe load balancer",
            Operation::ValidateCertificates => "validate certificates for",
            Operation::RenderTemplate => "render template for",
            Operation::ExecuteStack => "deploy stack",
            Operation::ForceUpdate => "force update",
        };
        f.write_str(name)
    }
}

/// A stack operation that outlived its deadline.
#[derive(Debug)]
pub struct TimedOut(pub Duration);

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "timed out after {}",
            humantime_serde::re::humantime::format_duration(self.0)
        )
    }
}

impl std::error::Error for TimedOut {}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Fatal(#[from] FatalConfigError),

    #[error("{location}: {source}")]
    Validation {
        location: RuleLocation,
        source: ValidationError,
    },

    #[error("{operation} {target}: {source}")]
    Collaborator {
        operation: Operation,
        target: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Override(#[from] OverrideError),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Fatal,
    Validation,
    Collaborator,
    Upload,
    Override,
}

impl DeployErrorKind {
    /// Whether re-running the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeployErrorKind::Collaborator | DeployErrorKind::Upload)
    }
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Fatal(_) => DeployErrorKind::Fatal,
            DeployError::Validation { .. } => DeployErrorKind::Validation,
            DeployError::Collaborator { .. } => DeployErrorKind::Collaborator,
            // A missing or broken custom-resource bundle stays broken on retry.
            DeployError::Upload(e) if e.is_fatal() => DeployErrorKind::Fatal,
            DeployError::Upload(_) => DeployErrorKind::Upload,
            DeployError::Override(_) => DeployErrorKind::Override,
        }
    }

    pub fn collaborator<E>(operation: Operation, target: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DeployError::Collaborator {
            operation,
            target: target.into(),
            source: Box::new(source),
        }
    }

    pub fn validation(location: RuleLocation, source: ValidationError) -> Self {
        DeployError::Validation { location, source }
    }

    /// Template failures: bad patches surface as override errors, the rest as render failures.
    pub fn template(stack_name: &str, err: TemplateError) -> Self {
        match err {
            TemplateError::Override(e) => DeployError::Override(e),
            other => DeployError::collaborator(Operation::RenderTemplate, stack_name, other),
        }
    }

    /// The validation failure, if this is one.
    pub fn as_validation(&self) -> Option<(&RuleLocation, &ValidationError)> {
        match self {
            DeployError::Validation { location, source } => Some((location, source)),
            _ => None,
        }
    }
}

/// Attach collaborator context to a foreign result.
pub trait CollaboratorResultExt<T> {
    fn during(self, operation: Operation, target: impl Into<String>) -> Result<T, DeployError>;
}

impl<T, E> CollaboratorResultExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn during(self, operation: Operation, target: impl Into<String>) -> Result<T, DeployError> {
        self.map_err(|e| DeployError::collaborator(operation, target, e))
    }
}
