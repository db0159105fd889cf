// ABOUTME: Stack engine seam: applies a stack configuration and reports the outcome.
// ABOUTME: Also holds the force-update seam used when a deploy changes nothing.

use crate::stack::{StackConfiguration, TemplateError};
use crate::types::StackId;
use async_trait::async_trait;

/// Engine options for one stack operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    pub disable_rollback: bool,
}

/// Result of a stack operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackOutcome {
    /// The stack was created or updated.
    Updated { stack_id: StackId },
    /// The submitted configuration matches the deployed one.
    NoChanges,
}

/// Errors from the stack engine or the force updater.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("render stack: {0}")]
    Template(#[from] TemplateError),

    #[error("stack operation rejected: {0}")]
    Rejected(String),

    #[error("stack state: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait StackEngine: Send + Sync {
    async fn deploy(
        &self,
        stack: &dyn StackConfiguration,
        options: &ExecuteOptions,
    ) -> Result<StackOutcome, EngineError>;
}

/// Rolls a service's tasks without a template change.
#[async_trait]
pub trait ServiceForceUpdater: Send + Sync {
    async fn force_update(&self, cluster: &str, service: &str) -> Result<(), EngineError>;
}
