// ABOUTME: Deployer for backend services: internal load balancers and private certificates.
// ABOUTME: Deploys recommend nothing further.

use crate::clients::Clients;
use crate::deploy::base::WorkloadBase;
use crate::deploy::deployer::WorkloadDeployer;
use crate::deploy::executor::{ActionRecommender, NoopActionRecommender};
use crate::deploy::sealed::Sealed;
use crate::deploy::{
    DeployError, DeployWorkloadInput, DeployerInput, GenerateTemplateInput,
    GenerateTemplateOutput, NetworkingPolicy, UploadArtifactsOutput, ValidatedNetworking,
};
use crate::manifest::WorkloadKind;
use crate::types::WorkloadName;
use async_trait::async_trait;

const POLICY: Option<NetworkingPolicy> = Some(NetworkingPolicy::BACKEND);

pub struct BackendServiceDeployer {
    base: WorkloadBase,
}

impl BackendServiceDeployer {
    pub fn new(input: DeployerInput, clients: Clients) -> Result<Self, DeployError> {
        Ok(Self {
            base: WorkloadBase::new(WorkloadKind::BackendService, input, clients)?,
        })
    }
}

impl Sealed for BackendServiceDeployer {}

#[async_trait]
impl WorkloadDeployer for BackendServiceDeployer {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::BackendService
    }

    fn name(&self) -> &WorkloadName {
        self.base.name()
    }

    fn is_service_available_in_region(&self, region: &str) -> Result<bool, DeployError> {
        self.base.is_service_available_in_region(region)
    }

    async fn validate(&self) -> Result<ValidatedNetworking, DeployError> {
        self.base.validate(POLICY).await
    }

    async fn upload_artifacts(&self) -> Result<UploadArtifactsOutput, DeployError> {
        self.base.upload_artifacts().await
    }

    async fn generate_template(
        &self,
        input: GenerateTemplateInput,
    ) -> Result<GenerateTemplateOutput, DeployError> {
        self.base.generate_template(POLICY, &input.runtime).await
    }

    async fn deploy_workload(
        &self,
        input: DeployWorkloadInput,
    ) -> Result<Box<dyn ActionRecommender>, DeployError> {
        self.base
            .deploy(POLICY, &input.runtime, &input.options)
            .await?;
        Ok(Box::new(NoopActionRecommender))
    }
}
