// ABOUTME: Collaborator seams consumed by the deployers: cloud lookups, storage, images, stacks.
// ABOUTME: Every collaborator is an injected trait object; local providers live in `local`.

mod acm;
mod elb;
mod engine;
mod images;
pub mod local;
mod regions;
mod resources;
mod storage;

pub use acm::{AliasCertValidator, CertValidationError};
pub use elb::{
    ImportedLoadBalancer, Listener, ListenerProtocol, LoadBalancerLookup, LoadBalancerScheme,
    LookupError,
};
pub use engine::{EngineError, ExecuteOptions, ServiceForceUpdater, StackEngine, StackOutcome};
pub use images::{ImageBuildError, ImageBuildRequest, ImageBuilder, ImageDigest};
pub use regions::{RegionCatalog, RegionError, StaticRegionCatalog};
pub use resources::{CustomResourceBundle, CustomResourceFunction, ResourceError, ResourceReader};
pub use storage::{ArtifactStore, ArtifactUrl, StorageError};

use crate::stack::StackBuilder;
use std::sync::Arc;

/// The collaborators of one deploy session.
///
/// Cloned into each deployer; nothing here is global.
#[derive(Clone)]
pub struct Clients {
    pub load_balancers: Arc<dyn LoadBalancerLookup>,
    pub certificates: Arc<dyn AliasCertValidator>,
    pub regions: Arc<dyn RegionCatalog>,
    pub resources: Arc<dyn ResourceReader>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub images: Arc<dyn ImageBuilder>,
    pub stacks: Arc<dyn StackEngine>,
    pub services: Arc<dyn ServiceForceUpdater>,
    pub builder: Arc<dyn StackBuilder>,
}

impl std::fmt::Debug for Clients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clients").finish_non_exhaustive()
    }
}
