// ABOUTME: Deploy command implementation.
// ABOUTME: Drives validate, upload and deploy for one workload and prints follow-up actions.

use super::session::{ensure_region, open_deployer};
use launchpad::config::WorkspaceConfig;
use launchpad::deploy::{DeployOptions, DeployWorkloadInput, StackRuntimeConfiguration};
use launchpad::error::Result;
use launchpad::output::Output;

pub struct DeployArgs {
    pub name: String,
    pub env: String,
    pub force: bool,
    pub disable_rollback: bool,
    pub tag: Option<String>,
    pub resource_tags: Vec<(String, String)>,
}

/// Deploy one workload.
///
/// Validation runs before any upload so a broken constraint never leaves
/// artifacts behind.
pub async fn deploy(config: WorkspaceConfig, args: DeployArgs, mut output: Output) -> Result<()> {
    output.start_timer();
    output.progress(&format!("Deploying {} to {}", args.name, args.env));

    let deployer = open_deployer(&config, &args.name, &args.env, args.tag, &output)?;
    ensure_region(&config, deployer.as_ref())?;

    output.progress("  → Validating networking...");
    deployer.validate().await?;

    output.progress("  → Uploading artifacts...");
    let uploads = deployer.upload_artifacts().await?;
    if let Some(image) = &uploads.image {
        output.progress(&format!("  → Image {}", image));
    }

    output.progress("  → Deploying stack...");
    let mut runtime = StackRuntimeConfiguration::from(uploads);
    runtime.tags.extend(args.resource_tags);
    let options = DeployOptions {
        force_new_update: args.force,
        disable_rollback: args.disable_rollback || config.deploy.disable_rollback,
        timeout: config.deploy.timeout,
    };
    let recommender = deployer
        .deploy_workload(DeployWorkloadInput { runtime, options })
        .await?;

    output.success(&format!("Deployed {} to {}", args.name, args.env));
    output.actions(&recommender.recommended_actions());
    Ok(())
}
