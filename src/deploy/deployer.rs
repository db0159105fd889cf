// ABOUTME: The capability set every variant deployer exposes, and kind-based dispatch.
// ABOUTME: Callers hold a Box<dyn WorkloadDeployer> regardless of workload kind.

use super::error::DeployError;
use super::executor::ActionRecommender;
use super::input::{
    DeployWorkloadInput, DeployerInput, GenerateTemplateInput, GenerateTemplateOutput,
    UploadArtifactsOutput,
};
use super::sealed::Sealed;
use super::validation::ValidatedNetworking;
use super::variants::{
    BackendServiceDeployer, LoadBalancedWebServiceDeployer, ScheduledJobDeployer,
    WorkerServiceDeployer,
};
use crate::clients::Clients;
use crate::manifest::WorkloadKind;
use crate::types::WorkloadName;
use async_trait::async_trait;

/// One deployment protocol shared by every workload kind.
#[async_trait]
pub trait WorkloadDeployer: Sealed + Send + Sync {
    fn kind(&self) -> WorkloadKind;

    fn name(&self) -> &WorkloadName;

    /// Whether the kind's service family is offered in `region`.
    fn is_service_available_in_region(&self, region: &str) -> Result<bool, DeployError>;

    /// Check networking constraints without side effects.
    async fn validate(&self) -> Result<ValidatedNetworking, DeployError>;

    async fn upload_artifacts(&self) -> Result<UploadArtifactsOutput, DeployError>;

    /// Render the stack without uploading or deploying.
    async fn generate_template(
        &self,
        input: GenerateTemplateInput,
    ) -> Result<GenerateTemplateOutput, DeployError>;

    async fn deploy_workload(
        &self,
        input: DeployWorkloadInput,
    ) -> Result<Box<dyn ActionRecommender>, DeployError>;
}

/// Pick the deployer for the manifest's kind.
pub fn new_workload_deployer(
    input: DeployerInput,
    clients: Clients,
) -> Result<Box<dyn WorkloadDeployer>, DeployError> {
    let deployer: Box<dyn WorkloadDeployer> = match input.manifest.kind() {
        WorkloadKind::BackendService => Box::new(BackendServiceDeployer::new(input, clients)?),
        WorkloadKind::LoadBalancedWebService => {
            Box::new(LoadBalancedWebServiceDeployer::new(input, clients)?)
        }
        WorkloadKind::WorkerService => Box::new(WorkerServiceDeployer::new(input, clients)?),
        WorkloadKind::ScheduledJob => Box::new(ScheduledJobDeployer::new(input, clients)?),
    };
    Ok(deployer)
}
