// ABOUTME: State and behaviour shared by every variant deployer.
// ABOUTME: Variants compose a WorkloadBase and supply their policy as values.

use super::error::{CollaboratorResultExt, DeployError, FatalConfigError, Operation};
use super::executor::{DeployExecutor, ServiceTarget};
use super::input::{
    DeployOptions, DeployWorkloadOutput, DeployerInput, GenerateTemplateOutput,
    StackRuntimeConfiguration, UploadArtifactsOutput,
};
use super::runtime_config::RuntimeConfig;
use super::upload::{
    AddonsTemplateStep, ContainerImagesStep, CustomResourcesStep, EnvironmentFilesStep,
    UploadStep, upload_artifacts,
};
use super::validation::{NetworkingPolicy, ValidatedNetworking, validate_networking};
use crate::clients::Clients;
use crate::manifest::{ImageSource, WorkloadKind, WorkloadManifest};
use crate::stack::{StackConfiguration, StackInput, wrap_with_template_overrider};
use crate::types::WorkloadName;

pub struct WorkloadBase {
    input: DeployerInput,
    clients: Clients,
}

impl WorkloadBase {
    /// Fails fast when the manifest is not of the deployer's kind, or when it
    /// builds an image with nowhere to push it.
    pub fn new(
        expected: WorkloadKind,
        input: DeployerInput,
        clients: Clients,
    ) -> Result<Self, DeployError> {
        let actual = input.manifest.kind();
        if actual != expected {
            return Err(FatalConfigError::ManifestKindMismatch { expected, actual }.into());
        }
        if matches!(input.manifest.task().image.source, ImageSource::Build(_))
            && input.resources.repository.is_none()
        {
            return Err(FatalConfigError::MissingRepository {
                workload: input.manifest.name().to_string(),
            }
            .into());
        }
        Ok(Self { input, clients })
    }

    pub fn input(&self) -> &DeployerInput {
        &self.input
    }

    pub fn manifest(&self) -> &WorkloadManifest {
        &self.input.manifest
    }

    pub fn name(&self) -> &WorkloadName {
        self.input.manifest.name()
    }

    pub fn kind(&self) -> WorkloadKind {
        self.input.manifest.kind()
    }

    /// `<app>-<env>-<workload>`.
    pub fn stack_name(&self) -> String {
        format!(
            "{}-{}-{}",
            self.input.app.name,
            self.input.environment.name,
            self.name()
        )
    }

    /// The ECS service a forced deploy rolls.
    pub fn service_target(&self) -> ServiceTarget {
        ServiceTarget {
            cluster: format!("{}-{}", self.input.app.name, self.input.environment.name),
            service: self.stack_name(),
        }
    }

    pub fn is_service_available_in_region(&self, region: &str) -> Result<bool, DeployError> {
        self.clients
            .regions
            .is_available_in_region(self.kind().service_family(), region)
            .during(Operation::RegionLookup, region)
    }

    /// Kinds without networking pass `None` and always validate.
    pub async fn validate(
        &self,
        policy: Option<NetworkingPolicy>,
    ) -> Result<ValidatedNetworking, DeployError> {
        let Some(policy) = policy else {
            return Ok(ValidatedNetworking::default());
        };
        validate_networking(
            self.manifest().http(),
            self.name(),
            &self.input.environment,
            policy,
            self.clients.load_balancers.as_ref(),
            self.clients.certificates.as_ref(),
        )
        .await
    }

    /// The standard pipeline: images, environment files, add-ons, custom resources.
    pub async fn upload_artifacts(&self) -> Result<UploadArtifactsOutput, DeployError> {
        let task = self.manifest().task();
        let images = ContainerImagesStep {
            workload: self.name(),
            image: &task.image,
            workspace: &self.input.workspace,
            repository: self.input.resources.repository.as_ref(),
            tag: self.input.image_tag.as_deref(),
            builder: self.clients.images.as_ref(),
        };
        let env_files = EnvironmentFilesStep {
            workload: self.name(),
            env_file: task
                .env_file
                .as_ref()
                .map(|path| self.input.workspace.join(path)),
            store: self.clients.artifacts.as_ref(),
        };
        let addons = AddonsTemplateStep {
            workload: self.name(),
            addons: self.input.addons.as_ref(),
            store: self.clients.artifacts.as_ref(),
        };
        let custom_resources = CustomResourcesStep {
            kind: self.kind(),
            reader: self.clients.resources.as_ref(),
            store: self.clients.artifacts.as_ref(),
        };
        let steps: [&dyn UploadStep; 4] = [&images, &env_files, &addons, &custom_resources];

        let output = upload_artifacts(&steps).await?;
        tracing::info!(workload = %self.name(), "artifacts uploaded");
        Ok(output)
    }

    /// Assemble the stack from validated networking and resolved runtime facts,
    /// layered with the workload's override patches.
    pub fn build_stack(
        &self,
        validated: ValidatedNetworking,
        runtime: &StackRuntimeConfiguration,
    ) -> Result<Box<dyn StackConfiguration>, DeployError> {
        let input = &self.input;
        let resolved = RuntimeConfig::resolve(
            &input.app,
            &input.environment,
            &input.resources,
            &input.manifest,
            input.image_tag.as_deref(),
            runtime,
        )?;
        let conf = self
            .clients
            .builder
            .build(StackInput {
                app: &input.app,
                environment: &input.environment,
                manifest: &input.manifest,
                raw_manifest: &input.raw_manifest,
                runtime: resolved,
                addons: input.addons.as_ref(),
                imported_alb: validated.imported_alb,
            })
            .map_err(|e| DeployError::template(&self.stack_name(), e))?;
        Ok(wrap_with_template_overrider(conf, input.overrider.clone()))
    }

    /// Validate, build and render; nothing is uploaded or deployed.
    pub async fn generate_template(
        &self,
        policy: Option<NetworkingPolicy>,
        runtime: &StackRuntimeConfiguration,
    ) -> Result<GenerateTemplateOutput, DeployError> {
        let validated = self.validate(policy).await?;
        let conf = self.build_stack(validated, runtime)?;
        let stack_name = conf.stack_name().to_string();
        let template = conf
            .template()
            .map_err(|e| DeployError::template(&stack_name, e))?;
        let parameters = conf
            .serialized_parameters()
            .map_err(|e| DeployError::template(&stack_name, e))?;
        Ok(GenerateTemplateOutput {
            stack_name,
            template,
            parameters,
        })
    }

    /// Validate, build and execute. Validation runs exactly once.
    pub async fn deploy(
        &self,
        policy: Option<NetworkingPolicy>,
        runtime: &StackRuntimeConfiguration,
        options: &DeployOptions,
    ) -> Result<(ValidatedNetworking, DeployWorkloadOutput), DeployError> {
        let validated = self.validate(policy).await?;
        let conf = self.build_stack(validated.clone(), runtime)?;
        let service = self.kind().is_service().then(|| self.service_target());
        let output = DeployExecutor::new(
            self.clients.stacks.as_ref(),
            self.clients.services.as_ref(),
        )
        .execute(conf.as_ref(), service.as_ref(), options)
        .await?;
        Ok((validated, output))
    }
}
