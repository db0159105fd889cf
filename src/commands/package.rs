// ABOUTME: Package command implementation.
// ABOUTME: Renders a workload's stack template and parameters without uploading or deploying.

use super::session::{ensure_region, open_deployer};
use launchpad::config::WorkspaceConfig;
use launchpad::deploy::{GenerateTemplateInput, StackRuntimeConfiguration};
use launchpad::error::Result;
use launchpad::output::Output;
use std::path::PathBuf;

/// Render the template. With `output_dir`, writes `<stack>.yml` and
/// `<stack>.params.json` there; otherwise prints the template.
pub async fn package(
    config: WorkspaceConfig,
    name: String,
    env: String,
    tag: Option<String>,
    output_dir: Option<PathBuf>,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    output.progress(&format!("Packaging {} for {}", name, env));

    let deployer = open_deployer(&config, &name, &env, tag, &output)?;
    ensure_region(&config, deployer.as_ref())?;

    let rendered = deployer
        .generate_template(GenerateTemplateInput {
            runtime: StackRuntimeConfiguration::default(),
        })
        .await?;

    match output_dir {
        Some(dir) => {
            tokio::fs::create_dir_all(&dir).await?;
            let template_path = dir.join(format!("{}.yml", rendered.stack_name));
            let params_path = dir.join(format!("{}.params.json", rendered.stack_name));
            tokio::fs::write(&template_path, &rendered.template).await?;
            tokio::fs::write(&params_path, &rendered.parameters).await?;
            tracing::debug!(template = %template_path.display(), "wrote template");
            output.success(&format!(
                "Wrote {} and {}",
                template_path.display(),
                params_path.display()
            ));
        }
        None => {
            println!("{}", rendered.template);
            output.success(&format!("Rendered {}", rendered.stack_name));
        }
    }
    Ok(())
}
