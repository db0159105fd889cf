// ABOUTME: Image builder shelling out to the docker CLI.
// ABOUTME: Builds, tags and pushes, then reads the pushed digest back.

use crate::clients::{ImageBuildError, ImageBuildRequest, ImageBuilder, ImageDigest};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another docker-compatible CLI, e.g. `podman`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[String]) -> Result<String, std::io::Error> {
        tracing::debug!("{} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(std::io::Error::other(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}

/// Arguments for `docker build`.
fn build_args(request: &ImageBuildRequest) -> Vec<String> {
    let mut args = vec![
        "build".to_string(),
        "--file".to_string(),
        request.dockerfile.display().to_string(),
    ];
    for tag in &request.tags {
        args.push("--tag".to_string());
        args.push(format!("{}:{}", request.repository.repository(), tag));
    }
    if let Some(target) = &request.target {
        args.push("--target".to_string());
        args.push(target.clone());
    }
    for (key, value) in &request.args {
        args.push("--build-arg".to_string());
        args.push(format!("{}={}", key, value));
    }
    args.push(request.context.display().to_string());
    args
}

#[async_trait]
impl ImageBuilder for DockerCli {
    async fn build_and_push(
        &self,
        request: &ImageBuildRequest,
    ) -> Result<ImageDigest, ImageBuildError> {
        let repository = request.repository.repository();
        let Some(first_tag) = request.tags.first() else {
            return Err(ImageBuildError::Build("no image tags requested".to_string()));
        };

        self.run(&build_args(request))
            .await
            .map_err(|e| ImageBuildError::Build(e.to_string()))?;

        for tag in &request.tags {
            self.run(&["push".to_string(), format!("{}:{}", repository, tag)])
                .await
                .map_err(|e| ImageBuildError::Push(e.to_string()))?;
        }

        let inspect = self
            .run(&[
                "image".to_string(),
                "inspect".to_string(),
                "--format".to_string(),
                "{{index .RepoDigests 0}}".to_string(),
                format!("{}:{}", repository, first_tag),
            ])
            .await?;
        let digest = inspect
            .trim()
            .rsplit_once('@')
            .map(|(_, digest)| digest.to_string())
            .ok_or_else(|| ImageBuildError::Push(format!("no digest for {}", repository)))?;
        tracing::info!(%repository, %digest, "pushed image");
        Ok(ImageDigest::new(digest))
    }
}
