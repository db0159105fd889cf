// ABOUTME: Filesystem stack engine recording rendered templates per stack.
// ABOUTME: A deploy whose template and parameters hash unchanged reports no changes.

use crate::clients::{EngineError, ExecuteOptions, ServiceForceUpdater, StackEngine, StackOutcome};
use crate::stack::StackConfiguration;
use crate::types::StackId;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct LocalStackEngine {
    dir: PathBuf,
}

impl LocalStackEngine {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn template_path(&self, stack_name: &str) -> PathBuf {
        self.dir.join(format!("{}.yml", stack_name))
    }

    fn digest_path(&self, stack_name: &str) -> PathBuf {
        self.dir.join(format!("{}.sha256", stack_name))
    }
}

#[async_trait]
impl StackEngine for LocalStackEngine {
    async fn deploy(
        &self,
        stack: &dyn StackConfiguration,
        options: &ExecuteOptions,
    ) -> Result<StackOutcome, EngineError> {
        let name = stack.stack_name();
        let template = stack.template()?;
        let parameters = stack.serialized_parameters()?;

        let mut hasher = Sha256::new();
        hasher.update(template.as_bytes());
        hasher.update(parameters.as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        match tokio::fs::read_to_string(self.digest_path(name)).await {
            Ok(previous) if previous.trim() == digest => {
                tracing::debug!(stack = name, "template unchanged");
                return Ok(StackOutcome::NoChanges);
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.template_path(name), &template).await?;
        tokio::fs::write(
            self.dir.join(format!("{}.params.json", name)),
            &parameters,
        )
        .await?;
        tokio::fs::write(self.digest_path(name), &digest).await?;

        tracing::info!(
            stack = name,
            disable_rollback = options.disable_rollback,
            "stack updated"
        );
        Ok(StackOutcome::Updated {
            stack_id: StackId::new(format!("local:stack/{}/{}", name, &digest[..12])),
        })
    }
}

/// Records force-update requests in `<state>/force-updates.log`.
#[derive(Debug, Clone)]
pub struct LocalForceUpdater {
    state_dir: PathBuf,
}

impl LocalForceUpdater {
    pub fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    pub fn log_path(&self) -> PathBuf {
        self.state_dir.join("force-updates.log")
    }
}

#[async_trait]
impl ServiceForceUpdater for LocalForceUpdater {
    async fn force_update(&self, cluster: &str, service: &str) -> Result<(), EngineError> {
        tokio::fs::create_dir_all(&self.state_dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path())
            .await?;
        let line = format!("{} {} {}\n", chrono::Utc::now().to_rfc3339(), cluster, service);
        file.write_all(line.as_bytes()).await?;
        tracing::info!(cluster, service, "forced new deployment");
        Ok(())
    }
}
