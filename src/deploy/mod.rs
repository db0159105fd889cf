// ABOUTME: Polymorphic workload deployment: validation, upload, stack assembly and execution.
// ABOUTME: Exports the WorkloadDeployer protocol, its inputs/outputs and the error taxonomy.

mod base;
mod deployer;
mod error;
mod executor;
mod input;
mod runtime_config;
pub(crate) mod sealed;
mod upload;
mod validation;
mod variants;

pub use base::WorkloadBase;
pub use deployer::{WorkloadDeployer, new_workload_deployer};
pub use error::{
    CollaboratorResultExt, DeployError, DeployErrorKind, FatalConfigError, Operation, TimedOut,
    ValidationError,
};
pub use executor::{
    ActionRecommender, AliasDnsRecommender, DeployExecutor, NoopActionRecommender, ServiceTarget,
};
pub use input::{
    AppContext, DeployOptions, DeployWorkloadInput, DeployWorkloadOutput, DeployerInput,
    EnvResources, GenerateTemplateInput, GenerateTemplateOutput, StackRuntimeConfiguration,
    UploadArtifactsOutput,
};
pub use runtime_config::RuntimeConfig;
pub use upload::{
    AddonsTemplateStep, ContainerImagesStep, CustomResourcesStep, EnvironmentFilesStep, StepError,
    UploadError, UploadPhase, UploadStep, content_key, upload_artifacts,
};
pub use validation::{
    NetworkingPolicy, ValidatedNetworking, check_imported_alb, validate_networking,
};
pub use variants::{
    BackendServiceDeployer, LoadBalancedWebServiceDeployer, ScheduledJobDeployer,
    WorkerServiceDeployer,
};
