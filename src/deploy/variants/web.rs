// ABOUTME: Deployer for load-balanced web services: internet-facing load balancers.
// ABOUTME: Deploys with aliases recommend pointing each alias at the load balancer.

use crate::clients::Clients;
use crate::deploy::base::WorkloadBase;
use crate::deploy::deployer::WorkloadDeployer;
use crate::deploy::executor::{ActionRecommender, AliasDnsRecommender, NoopActionRecommender};
use crate::deploy::sealed::Sealed;
use crate::deploy::{
    DeployError, DeployWorkloadInput, DeployerInput, GenerateTemplateInput,
    GenerateTemplateOutput, NetworkingPolicy, UploadArtifactsOutput, ValidatedNetworking,
};
use crate::manifest::WorkloadKind;
use crate::types::WorkloadName;
use async_trait::async_trait;

const POLICY: Option<NetworkingPolicy> = Some(NetworkingPolicy::WEB);

pub struct LoadBalancedWebServiceDeployer {
    base: WorkloadBase,
}

impl LoadBalancedWebServiceDeployer {
    pub fn new(input: DeployerInput, clients: Clients) -> Result<Self, DeployError> {
        Ok(Self {
            base: WorkloadBase::new(WorkloadKind::LoadBalancedWebService, input, clients)?,
        })
    }

    /// Every alias across the primary and additional rules, first occurrence kept.
    fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = Vec::new();
        if let Some(http) = self.base.manifest().http() {
            for (_, rule) in http.active_rules() {
                for host in rule.hostnames() {
                    if !aliases.contains(&host) {
                        aliases.push(host);
                    }
                }
            }
        }
        aliases
    }
}

impl Sealed for LoadBalancedWebServiceDeployer {}

#[async_trait]
impl WorkloadDeployer for LoadBalancedWebServiceDeployer {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::LoadBalancedWebService
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
        let (validated, _) = self
            .base
            .deploy(POLICY, &input.runtime, &input.options)
            .await?;

        let aliases = self.aliases();
        if aliases.is_empty() {
            return Ok(Box::new(NoopActionRecommender));
        }
        let target = match validated.imported_alb {
            Some(alb) => alb.dns_name,
            None => format!(
                "the public load balancer of environment {}",
                self.base.input().environment.name
            ),
        };
        Ok(Box::new(AliasDnsRecommender { aliases, target }))
    }
}
