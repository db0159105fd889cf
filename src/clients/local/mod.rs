// ABOUTME: Local providers backing every collaborator with the filesystem and local tools.
// ABOUTME: Used by the CLI; state is written under the workspace state directory.

mod catalog;
mod docker;
mod engine;
mod resources;
mod storage;

pub use catalog::{CATALOG_FILENAME, CatalogError, CertificateEntry, CloudCatalog, domain_covers};
pub use docker::DockerCli;
pub use engine::{LocalForceUpdater, LocalStackEngine};
pub use resources::FsResourceReader;
pub use storage::LocalArtifactStore;

use super::{Clients, StaticRegionCatalog};
use crate::stack::TemplateStackBuilder;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the local providers read and write.
#[derive(Debug, Clone)]
pub struct LocalOptions {
    pub workspace: PathBuf,
    pub state_dir: PathBuf,
    pub resources_dir: PathBuf,
    pub artifact_bucket: String,
}

impl Clients {
    /// Collaborators backed by local files and the docker CLI.
    pub fn local(options: LocalOptions) -> Result<Self, CatalogError> {
        let catalog = Arc::new(CloudCatalog::discover(&options.workspace)?);
        Ok(Self {
            load_balancers: catalog.clone(),
            certificates: catalog,
            regions: Arc::new(StaticRegionCatalog::new()),
            resources: Arc::new(FsResourceReader::new(options.resources_dir)),
            artifacts: Arc::new(LocalArtifactStore::new(
                options.state_dir.join("artifacts"),
                options.artifact_bucket,
            )),
            images: Arc::new(DockerCli::new()),
            stacks: Arc::new(LocalStackEngine::new(options.state_dir.join("stacks"))),
            services: Arc::new(LocalForceUpdater::new(options.state_dir)),
            builder: Arc::new(TemplateStackBuilder),
        })
    }
}
