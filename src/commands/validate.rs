// ABOUTME: Validate command implementation.
// ABOUTME: Checks networking constraints for one workload or every workload concurrently.

use super::session::open_deployer;
use futures::future::join_all;
use launchpad::config::{WORKLOADS_DIR, WorkspaceConfig};
use launchpad::error::{Error, Result};
use launchpad::output::Output;

pub async fn validate(
    config: WorkspaceConfig,
    name: Option<String>,
    env: String,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let names = match name {
        Some(name) => vec![name],
        None => workload_names(&config)?,
    };
    output.progress(&format!(
        "Validating {} workload(s) in {}",
        names.len(),
        env
    ));

    let deployers = names
        .iter()
        .map(|name| open_deployer(&config, name, &env, None, &output))
        .collect::<Result<Vec<_>>>()?;

    let results = join_all(deployers.iter().map(|deployer| deployer.validate())).await;

    let mut first_error = None;
    for (deployer, result) in deployers.iter().zip(results) {
        match result {
            Ok(_) => output.progress(&format!("  ✓ {}", deployer.name())),
            Err(e) => {
                output.error(&format!("{}: {}", deployer.name(), e));
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_error {
        return Err(Error::Deploy(e));
    }

    output.success("Networking is valid");
    Ok(())
}

/// Directories under `workloads/` holding a manifest, sorted.
fn workload_names(config: &WorkspaceConfig) -> Result<Vec<String>> {
    let dir = config.root.join(WORKLOADS_DIR);
    let mut names = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir()
            && entry
                .path()
                .join(launchpad::config::MANIFEST_FILENAME)
                .exists()
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
