// ABOUTME: Resolves the concrete runtime facts a stack needs from context and upload results.
// ABOUTME: Pure data assembly; computed once per deploy attempt and never mutated.

use super::error::FatalConfigError;
use super::input::{AppContext, EnvResources, StackRuntimeConfiguration};
use crate::clients::ArtifactUrl;
use crate::config::EnvironmentConfig;
use crate::manifest::{ImageSource, WorkloadManifest};
use crate::types::ImageRef;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub account_id: String,
    pub region: String,
    pub artifact_bucket: String,
    pub artifact_key: String,
    /// Image the main container runs.
    pub image: ImageRef,
    pub env_file: Option<ArtifactUrl>,
    pub addons_template: Option<ArtifactUrl>,
    pub custom_resources: BTreeMap<String, ArtifactUrl>,
    pub service_discovery_endpoint: String,
    pub additional_tags: BTreeMap<String, String>,
}

impl RuntimeConfig {
    pub fn resolve(
        app: &AppContext,
        environment: &EnvironmentConfig,
        resources: &EnvResources,
        manifest: &WorkloadManifest,
        image_tag: Option<&str>,
        stack: &StackRuntimeConfiguration,
    ) -> Result<Self, FatalConfigError> {
        let uploads = &stack.uploads;
        let image = match (&uploads.image, &manifest.task().image.source) {
            (Some(uploaded), _) => uploaded.clone(),
            (None, ImageSource::Location(location)) => location.clone(),
            // Nothing uploaded yet: reference the tag the upload would push.
            (None, ImageSource::Build(_)) => resources
                .repository
                .as_ref()
                .map(|repo| repo.with_tag(image_tag.unwrap_or("latest")))
                .ok_or_else(|| FatalConfigError::MissingRepository {
                    workload: manifest.name().to_string(),
                })?,
        };

        Ok(Self {
            account_id: app.account_id.clone(),
            region: app.region.clone(),
            artifact_bucket: resources.artifact_bucket.clone(),
            artifact_key: resources.artifact_key.clone(),
            image,
            env_file: uploads.env_file.clone(),
            addons_template: uploads.addons_template.clone(),
            custom_resources: uploads.custom_resources.clone(),
            service_discovery_endpoint: format!("{}.{}.local", environment.name, app.name),
            additional_tags: stack.tags.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::UploadArtifactsOutput;

    fn app() -> AppContext {
        AppContext {
            name: "demo".to_string(),
            account_id: "123456789012".to_string(),
            region: "us-west-2".to_string(),
            domain: None,
        }
    }

    fn manifest(image: &str) -> WorkloadManifest {
        WorkloadManifest::from_yaml(&format!(
            "type: Worker Service\nname: jobs\nimage:\n  {}\n",
            image
        ))
        .unwrap()
    }

    #[test]
    fn location_image_is_used_verbatim() {
        let env = EnvironmentConfig::from_yaml("name: test").unwrap();
        let config = RuntimeConfig::resolve(
            &app(),
            &env,
            &EnvResources::default(),
            &manifest("location: nginx:1.25"),
            None,
            &StackRuntimeConfiguration::default(),
        )
        .unwrap();
        assert_eq!(config.image.to_string(), "nginx:1.25");
        assert_eq!(config.service_discovery_endpoint, "test.demo.local");
    }

    #[test]
    fn uploaded_image_wins() {
        let env = EnvironmentConfig::from_yaml("name: test").unwrap();
        let pushed = ImageRef::parse("registry.example.com/demo/jobs:v2@sha256:abcd").unwrap();
        let stack = StackRuntimeConfiguration::from(UploadArtifactsOutput {
            image: Some(pushed.clone()),
            ..Default::default()
        });
        let config = RuntimeConfig::resolve(
            &app(),
            &env,
            &EnvResources::default(),
            &manifest("build: Dockerfile"),
            None,
            &stack,
        )
        .unwrap();
        assert_eq!(config.image, pushed);
    }

    #[test]
    fn build_without_repository_is_fatal() {
        let env = EnvironmentConfig::from_yaml("name: test").unwrap();
        let err = RuntimeConfig::resolve(
            &app(),
            &env,
            &EnvResources::default(),
            &manifest("build: Dockerfile"),
            None,
            &StackRuntimeConfiguration::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FatalConfigError::MissingRepository { .. }));
    }
}
