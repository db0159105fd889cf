// ABOUTME: Deployer for scheduled jobs run by a state machine on a schedule.
// ABOUTME: Availability is gated on the state machine service, not the container service.

use crate::clients::Clients;
use crate::deploy::base::WorkloadBase;
use crate::deploy::deployer::WorkloadDeployer;
use crate::deploy::executor::{ActionRecommender, NoopActionRecommender};
use crate::deploy::sealed::Sealed;
use crate::deploy::{
    DeployError, DeployWorkloadInput, DeployerInput, GenerateTemplateInput,
    GenerateTemplateOutput, UploadArtifactsOutput, ValidatedNetworking,
};
use crate::manifest::WorkloadKind;
use crate::types::WorkloadName;
use async_trait::async_trait;

pub struct ScheduledJobDeployer {
    base: WorkloadBase,
}

impl ScheduledJobDeployer {
    pub fn new(input: DeployerInput, clients: Clients) -> Result<Self, DeployError> {
        Ok(Self {
            base: WorkloadBase::new(WorkloadKind::ScheduledJob, input, clients)?,
        })
    }
}

impl Sealed for ScheduledJobDeployer {}

#[async_trait]
impl WorkloadDeployer for ScheduledJobDeployer {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::ScheduledJob
    }

    fn name(&self) -> &WorkloadName {
        self.base.name()
    }

    fn is_service_available_in_region(&self, region: &str) -> Result<bool, DeployError> {
        self.base.is_service_available_in_region(region)
    }

    async fn validate(&self) -> Result<ValidatedNetworking, DeployError> {
        self.base.validate(None).await
    }

    async fn upload_artifacts(&self) -> Result<UploadArtifactsOutput, DeployError> {
        self.base.upload_artifacts().await
    }

    async fn generate_template(
        &self,
        input: GenerateTemplateInput,
    ) -> Result<GenerateTemplateOutput, DeployError> {
        self.base.generate_template(None, &input.runtime).await
    }

    async fn deploy_workload(
        &self,
        input: DeployWorkloadInput,
    ) -> Result<Box<dyn ActionRecommender>, DeployError> {
        let (_, output) = self
            .base
            .deploy(None, &input.runtime, &input.options)
            .await?;
        if !output.changed {
            tracing::debug!(job = %self.base.name(), "schedule unchanged");
        }
        Ok(Box::new(NoopActionRecommender))
    }
}
