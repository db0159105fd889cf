// ABOUTME: Test support utilities.
// ABOUTME: Recording fakes for every deploy collaborator plus fixture builders.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use launchpad::clients::local::domain_covers;
use launchpad::clients::{
    AliasCertValidator, ArtifactStore, ArtifactUrl, CertValidationError, Clients,
    CustomResourceBundle, CustomResourceFunction, EngineError, ExecuteOptions, ImageBuildError,
    ImageBuildRequest, ImageBuilder, ImageDigest, ImportedLoadBalancer, Listener,
    ListenerProtocol, LoadBalancerLookup, LoadBalancerScheme, LookupError, ResourceError,
    ResourceReader, ServiceForceUpdater, StackEngine, StackOutcome, StaticRegionCatalog,
    StorageError,
};
use launchpad::config::EnvironmentConfig;
use launchpad::deploy::{AppContext, DeployerInput, EnvResources};
use launchpad::manifest::{WorkloadKind, WorkloadManifest};
use launchpad::stack::{StackConfiguration, TemplateOverrider, TemplateStackBuilder};
use launchpad::types::{CertificateArn, ImageRef, ListenerArn, LoadBalancerArn, StackId};
use nonempty::NonEmpty;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::{Arc, Once};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("launchpad=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const ALB_ARN: &str =
    "arn:aws:elasticloadbalancing:us-west-2:123456789012:loadbalancer/app/shared/50dc6c495c0c9188";
pub const WILDCARD_CERT: &str =
    "arn:aws:acm:us-west-2:123456789012:certificate/11111111-2222-3333-4444-555555555555";

pub fn alb(scheme: LoadBalancerScheme, protocols: &[ListenerProtocol]) -> ImportedLoadBalancer {
    ImportedLoadBalancer {
        arn: LoadBalancerArn::new(ALB_ARN),
        name: "shared".to_string(),
        dns_name: "shared-1234567890.us-west-2.elb.amazonaws.com".to_string(),
        scheme,
        listeners: protocols
            .iter()
            .enumerate()
            .map(|(i, protocol)| Listener {
                arn: ListenerArn::new(format!("{}/listener/{}", ALB_ARN, i)),
                protocol: *protocol,
                port: match protocol {
                    ListenerProtocol::Https => 443,
                    _ => 80,
                },
            })
            .collect(),
    }
}

/// Load balancer lookup over a replaceable set, counting calls.
#[derive(Default)]
pub struct FakeLoadBalancers {
    albs: Mutex<Vec<ImportedLoadBalancer>>,
    calls: Mutex<Vec<String>>,
}

impl FakeLoadBalancers {
    pub fn new(albs: Vec<ImportedLoadBalancer>) -> Self {
        Self {
            albs: Mutex::new(albs),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Swap the load balancers later lookups see.
    pub fn replace(&self, albs: Vec<ImportedLoadBalancer>) {
        *self.albs.lock() = albs;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl LoadBalancerLookup for FakeLoadBalancers {
    async fn load_balancer(&self, id: &str) -> Result<ImportedLoadBalancer, LookupError> {
        self.calls.lock().push(id.to_string());
        self.albs
            .lock()
            .iter()
            .find(|alb| alb.matches(id))
            .cloned()
            .ok_or_else(|| LookupError::NotFound(id.to_string()))
    }
}

/// Certificate validator over fixed certificate domains, counting calls.
#[derive(Default)]
pub struct FakeCertificates {
    certificates: Vec<(String, Vec<String>)>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeCertificates {
    pub fn new(certificates: &[(&str, &[&str])]) -> Self {
        Self {
            certificates: certificates
                .iter()
                .map(|(arn, domains)| {
                    (
                        arn.to_string(),
                        domains.iter().map(|d| d.to_string()).collect(),
                    )
                })
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// One certificate for `*.example.com` and `example.com`.
    pub fn wildcard() -> Self {
        Self::new(&[(WILDCARD_CERT, &["*.example.com", "example.com"])])
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AliasCertValidator for FakeCertificates {
    async fn validate_aliases(
        &self,
        aliases: &[String],
        certificates: &[CertificateArn],
    ) -> Result<(), CertValidationError> {
        self.calls.lock().push(aliases.to_vec());
        let mut domains = Vec::new();
        for arn in certificates {
            let (_, covered) = self
                .certificates
                .iter()
                .find(|(known, _)| known == arn.as_str())
                .ok_or_else(|| CertValidationError::CertificateNotFound(arn.to_string()))?;
            domains.extend(covered.iter().cloned());
        }
        for alias in aliases {
            if !domains.iter().any(|domain| domain_covers(domain, alias)) {
                return Err(CertValidationError::AliasNotCovered {
                    alias: alias.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Artifact store that records keys; fails every upload when `failing`.
#[derive(Default)]
pub struct RecordingStore {
    pub failing: bool,
    keys: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            failing: true,
            keys: Mutex::new(Vec::new()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().clone()
    }
}

#[async_trait]
impl ArtifactStore for RecordingStore {
    async fn upload(&self, key: &str, _body: Bytes) -> Result<ArtifactUrl, StorageError> {
        if self.failing {
            return Err(StorageError::Api("service unavailable".to_string()));
        }
        self.keys.lock().push(key.to_string());
        Ok(ArtifactUrl {
            bucket: "demo-artifacts".to_string(),
            key: key.to_string(),
            url: format!("https://demo-artifacts.s3.amazonaws.com/{}", key),
        })
    }
}

pub const PUSHED_DIGEST: &str =
    "sha256:9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

/// Image builder that records requests and returns a fixed digest.
#[derive(Default)]
pub struct FakeImages {
    requests: Mutex<Vec<ImageBuildRequest>>,
}

impl FakeImages {
    pub fn requests(&self) -> Vec<ImageBuildRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ImageBuilder for FakeImages {
    async fn build_and_push(
        &self,
        request: &ImageBuildRequest,
    ) -> Result<ImageDigest, ImageBuildError> {
        self.requests.lock().push(request.clone());
        Ok(ImageDigest::new(PUSHED_DIGEST))
    }
}

/// Custom-resource reader returning one function per kind, or nothing.
#[derive(Default)]
pub struct FakeResources {
    pub missing: bool,
}

#[async_trait]
impl ResourceReader for FakeResources {
    async fn read_custom_resources(
        &self,
        kind: WorkloadKind,
    ) -> Result<CustomResourceBundle, ResourceError> {
        if self.missing {
            return Err(ResourceError::Missing {
                kind,
                path: format!("custom-resources/{}.yml", kind.slug()),
            });
        }
        Ok(CustomResourceBundle {
            kind,
            functions: NonEmpty::new(CustomResourceFunction {
                name: "EnvControllerFunction".to_string(),
                handler: "env-controller.js".to_string(),
                body: Bytes::from_static(b"exports.handler = async () => {};"),
            }),
        })
    }
}

/// Stack engine returning a fixed outcome and recording rendered templates.
pub struct FakeEngine {
    outcome: StackOutcome,
    deployed: Mutex<Vec<(String, String)>>,
}

impl FakeEngine {
    pub fn updated() -> Self {
        Self {
            outcome: StackOutcome::Updated {
                stack_id: StackId::new("arn:aws:cloudformation:us-west-2:123456789012:stack/demo/1"),
            },
            deployed: Mutex::new(Vec::new()),
        }
    }

    pub fn unchanged() -> Self {
        Self {
            outcome: StackOutcome::NoChanges,
            deployed: Mutex::new(Vec::new()),
        }
    }

    /// Stack name and rendered template of every deploy.
    pub fn deployed(&self) -> Vec<(String, String)> {
        self.deployed.lock().clone()
    }
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::updated()
    }
}

#[async_trait]
impl StackEngine for FakeEngine {
    async fn deploy(
        &self,
        stack: &dyn StackConfiguration,
        _options: &ExecuteOptions,
    ) -> Result<StackOutcome, EngineError> {
        let template = stack.template()?;
        self.deployed
            .lock()
            .push((stack.stack_name().to_string(), template));
        Ok(self.outcome.clone())
    }
}

#[derive(Default)]
pub struct FakeForceUpdater {
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeForceUpdater {
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ServiceForceUpdater for FakeForceUpdater {
    async fn force_update(&self, cluster: &str, service: &str) -> Result<(), EngineError> {
        self.calls
            .lock()
            .push((cluster.to_string(), service.to_string()));
        Ok(())
    }
}

/// Every fake, kept around for inspection after the deployer consumed the clients.
pub struct Fakes {
    pub load_balancers: Arc<FakeLoadBalancers>,
    pub certificates: Arc<FakeCertificates>,
    pub artifacts: Arc<RecordingStore>,
    pub images: Arc<FakeImages>,
    pub resources: Arc<FakeResources>,
    pub stacks: Arc<FakeEngine>,
    pub services: Arc<FakeForceUpdater>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self {
            load_balancers: Arc::new(FakeLoadBalancers::default()),
            certificates: Arc::new(FakeCertificates::wildcard()),
            artifacts: Arc::new(RecordingStore::default()),
            images: Arc::new(FakeImages::default()),
            resources: Arc::new(FakeResources::default()),
            stacks: Arc::new(FakeEngine::default()),
            services: Arc::new(FakeForceUpdater::default()),
        }
    }
}

impl Fakes {
    pub fn with_albs(mut self, albs: Vec<ImportedLoadBalancer>) -> Self {
        self.load_balancers = Arc::new(FakeLoadBalancers::new(albs));
        self
    }

    pub fn with_engine(mut self, engine: FakeEngine) -> Self {
        self.stacks = Arc::new(engine);
        self
    }

    pub fn clients(&self) -> Clients {
        Clients {
            load_balancers: self.load_balancers.clone(),
            certificates: self.certificates.clone(),
            regions: Arc::new(StaticRegionCatalog::new()),
            resources: self.resources.clone(),
            artifacts: self.artifacts.clone(),
            images: self.images.clone(),
            stacks: self.stacks.clone(),
            services: self.services.clone(),
            builder: Arc::new(TemplateStackBuilder),
        }
    }
}

pub fn app() -> AppContext {
    AppContext {
        name: "demo".to_string(),
        account_id: "123456789012".to_string(),
        region: "us-west-2".to_string(),
        domain: None,
    }
}

/// Environment `test`, optionally with certificates on both ingresses.
pub fn environment(with_certs: bool) -> EnvironmentConfig {
    let yaml = if with_certs {
        format!(
            "name: test\nhttp:\n  public:\n    certificates: [{cert}]\n  private:\n    certificates: [{cert}]\n",
            cert = WILDCARD_CERT
        )
    } else {
        "name: test\n".to_string()
    };
    EnvironmentConfig::from_yaml(&yaml).unwrap()
}

pub fn input(manifest_yaml: &str, environment: EnvironmentConfig) -> DeployerInput {
    DeployerInput {
        app: app(),
        environment,
        manifest: WorkloadManifest::from_yaml(manifest_yaml).unwrap(),
        raw_manifest: manifest_yaml.to_string(),
        workspace: PathBuf::from("."),
        resources: EnvResources {
            artifact_bucket: "demo-artifacts".to_string(),
            artifact_key: "arn:aws:kms:us-west-2:123456789012:key/demo".to_string(),
            repository: Some(
                ImageRef::parse("123456789012.dkr.ecr.us-west-2.amazonaws.com/demo/api").unwrap(),
            ),
        },
        image_tag: Some("v1".to_string()),
        overrider: TemplateOverrider::default(),
        addons: None,
    }
}
