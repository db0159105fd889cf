// ABOUTME: Shared helper for opening a deployer for one workload in one environment.
// ABOUTME: Eliminates duplication across deploy, package and validate commands.

use launchpad::clients::Clients;
use launchpad::config::WorkspaceConfig;
use launchpad::deploy::{WorkloadDeployer, new_workload_deployer};
use launchpad::error::Result;
use launchpad::output::Output;

/// Load the workload and environment from disk and build its deployer.
///
/// Collaborators are created per call so nothing is shared between sessions.
pub fn open_deployer(
    config: &WorkspaceConfig,
    workload: &str,
    environment: &str,
    image_tag: Option<String>,
    output: &Output,
) -> Result<Box<dyn WorkloadDeployer>> {
    let env = config.load_environment(environment)?;
    let files = config.load_workload(workload)?;
    output.progress(&format!(
        "  → {} ({}) in environment {}",
        files.manifest.name(),
        files.manifest.kind(),
        env.name
    ));

    let clients = Clients::local(config.local_options())?;
    let input = config.deployer_input(env, files, image_tag);
    Ok(new_workload_deployer(input, clients)?)
}

/// Fail unless the deployer's kind is offered in the configured region.
pub fn ensure_region(config: &WorkspaceConfig, deployer: &dyn WorkloadDeployer) -> Result<()> {
    if deployer.is_service_available_in_region(&config.region)? {
        return Ok(());
    }
    Err(launchpad::error::Error::ServiceUnavailable {
        kind: deployer.kind().to_string(),
        region: config.region.clone(),
    })
}
