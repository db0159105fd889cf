// ABOUTME: Sends an assembled stack to the stack engine and handles the outcome.
// ABOUTME: Also defines the follow-up action recommenders returned to the caller.

use super::error::{CollaboratorResultExt, DeployError, Operation, TimedOut};
use super::input::{DeployOptions, DeployWorkloadOutput};
use crate::clients::{EngineError, ExecuteOptions, ServiceForceUpdater, StackEngine, StackOutcome};
use crate::stack::{StackConfiguration, TemplateError};
use std::fmt;

/// The service a no-change deploy can be forced on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTarget {
    pub cluster: String,
    pub service: String,
}

pub struct DeployExecutor<'a> {
    stacks: &'a dyn StackEngine,
    services: &'a dyn ServiceForceUpdater,
}

impl<'a> DeployExecutor<'a> {
    pub fn new(stacks: &'a dyn StackEngine, services: &'a dyn ServiceForceUpdater) -> Self {
        Self { stacks, services }
    }

    /// Deploy `conf`, bounded by `options.timeout`. Never retries.
    pub async fn execute(
        &self,
        conf: &dyn StackConfiguration,
        service: Option<&ServiceTarget>,
        options: &DeployOptions,
    ) -> Result<DeployWorkloadOutput, DeployError> {
        let stack_name = conf.stack_name().to_string();
        let engine_options = ExecuteOptions {
            disable_rollback: options.disable_rollback,
        };

        tracing::debug!(stack = %stack_name, timeout = ?options.timeout, "deploying stack");
        let outcome = match tokio::time::timeout(
            options.timeout,
            self.stacks.deploy(conf, &engine_options),
        )
        .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(EngineError::Template(TemplateError::Override(e)))) => {
                return Err(DeployError::Override(e));
            }
            Ok(Err(e)) => {
                return Err(DeployError::collaborator(
                    Operation::ExecuteStack,
                    stack_name,
                    e,
                ));
            }
            Err(_) => {
                return Err(DeployError::collaborator(
                    Operation::ExecuteStack,
                    stack_name,
                    TimedOut(options.timeout),
                ));
            }
        };

        let forced = match (&outcome, service) {
            (StackOutcome::Updated { .. }, _) => false,
            (StackOutcome::NoChanges, Some(target)) if options.force_new_update => {
                self.services
                    .force_update(&target.cluster, &target.service)
                    .await
                    .during(Operation::ForceUpdate, target.service.clone())?;
                true
            }
            (StackOutcome::NoChanges, None) if options.force_new_update => {
                tracing::debug!(stack = %stack_name, "no service to force a new deployment on");
                false
            }
            (StackOutcome::NoChanges, _) => {
                tracing::warn!(
                    stack = %stack_name,
                    "no changes to deploy; use --force to roll new tasks anyway"
                );
                false
            }
        };

        let output = DeployWorkloadOutput::new(stack_name, outcome, forced);
        tracing::info!(
            stack = %output.stack_name,
            changed = output.changed,
            forced = output.forced,
            "deploy finished"
        );
        Ok(output)
    }
}

/// Suggests what the user should do after a deploy.
pub trait ActionRecommender: Send + Sync + fmt::Debug {
    fn recommended_actions(&self) -> Vec<String>;
}

/// Nothing to recommend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActionRecommender;

impl ActionRecommender for NoopActionRecommender {
    fn recommended_actions(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Asks the user to point each alias at the load balancer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDnsRecommender {
    pub aliases: Vec<String>,
    /// DNS name the aliases should resolve to.
    pub target: String,
}

impl ActionRecommender for AliasDnsRecommender {
    fn recommended_actions(&self) -> Vec<String> {
        self.aliases
            .iter()
            .map(|alias| {
                format!(
                    "Update the DNS record for {} to point at {} (an A record alias or a CNAME)",
                    alias, self.target
                )
            })
            .collect()
    }
}
