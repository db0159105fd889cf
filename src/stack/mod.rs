// ABOUTME: Stack configuration: the desired-state object handed to the stack engine.
// ABOUTME: Defines the StackConfiguration and StackBuilder seams plus add-on templates.

mod builder;
mod overrides;

pub use builder::{TemplateStackBuilder, WorkloadStack};
pub use overrides::{OverrideError, OverriddenStack, PATCHES_FILENAME, PatchOp, TemplateOverrider};

use crate::clients::ImportedLoadBalancer;
use crate::config::EnvironmentConfig;
use crate::deploy::{AppContext, RuntimeConfig};
use crate::manifest::WorkloadManifest;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Tag keys stamped on every workload stack.
pub const APP_TAG: &str = "launchpad-application";
pub const ENV_TAG: &str = "launchpad-environment";
pub const WORKLOAD_TAG: &str = "launchpad-workload";

/// A stack parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    pub parameter_key: String,
    pub parameter_value: String,
}

impl Parameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            parameter_key: key.into(),
            parameter_value: value.into(),
        }
    }
}

/// Errors from rendering a stack configuration.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("render template: {0}")]
    Render(String),

    #[error("apply template overrides: {0}")]
    Override(#[from] OverrideError),

    #[error("serialize template: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("serialize parameters: {0}")]
    Json(#[from] serde_json::Error),
}

/// The assembled desired state of one workload stack.
pub trait StackConfiguration: Send + Sync + fmt::Debug {
    fn stack_name(&self) -> &str;

    /// The template as a structured document.
    fn document(&self) -> Result<Value, TemplateError>;

    fn parameters(&self) -> Result<Vec<Parameter>, TemplateError>;

    fn tags(&self) -> BTreeMap<String, String>;

    /// Patches already layered on this configuration's document.
    fn override_count(&self) -> usize {
        0
    }

    /// The template rendered as YAML.
    fn template(&self) -> Result<String, TemplateError> {
        Ok(serde_yaml::to_string(&self.document()?)?)
    }

    /// Parameters and tags as a JSON configuration file.
    fn serialized_parameters(&self) -> Result<String, TemplateError> {
        let parameters: BTreeMap<String, String> = self
            .parameters()?
            .into_iter()
            .map(|p| (p.parameter_key, p.parameter_value))
            .collect();
        let config = serde_json::json!({
            "Parameters": parameters,
            "Tags": self.tags(),
        });
        Ok(serde_json::to_string_pretty(&config)?)
    }
}

/// Wrap a configuration with user patches.
pub fn wrap_with_template_overrider(
    conf: Box<dyn StackConfiguration>,
    overrider: TemplateOverrider,
) -> Box<dyn StackConfiguration> {
    Box::new(OverriddenStack::wrap(conf, overrider))
}

/// Everything a builder needs to assemble one workload stack.
#[derive(Debug)]
pub struct StackInput<'a> {
    pub app: &'a AppContext,
    pub environment: &'a EnvironmentConfig,
    pub manifest: &'a WorkloadManifest,
    pub raw_manifest: &'a str,
    pub runtime: RuntimeConfig,
    pub addons: Option<&'a Addons>,
    /// Present only when validation accepted an imported load balancer.
    pub imported_alb: Option<ImportedLoadBalancer>,
}

/// Assembles a stack configuration from resolved inputs.
pub trait StackBuilder: Send + Sync {
    fn build(&self, input: StackInput<'_>) -> Result<Box<dyn StackConfiguration>, TemplateError>;
}

/// File name of a workload's add-ons template.
pub const ADDONS_FILENAME: &str = "addons.yml";

/// Add-on resources deployed as a nested stack next to the workload.
#[derive(Debug, Clone, PartialEq)]
pub struct Addons {
    template: String,
    outputs: Vec<String>,
}

impl Addons {
    /// Parse an add-ons template; it must declare at least one resource.
    pub fn from_yaml(template: &str) -> Result<Self, TemplateError> {
        // serde_yaml::Value keeps short-form intrinsics such as `!Ref` as tagged values.
        let doc: serde_yaml::Value = serde_yaml::from_str(template)?;
        let has_resources = doc
            .get("Resources")
            .and_then(serde_yaml::Value::as_mapping)
            .is_some_and(|resources| !resources.is_empty());
        if !has_resources {
            return Err(TemplateError::Render(
                "add-ons template must declare at least one resource".to_string(),
            ));
        }
        let outputs = doc
            .get("Outputs")
            .and_then(serde_yaml::Value::as_mapping)
            .map(|outputs| {
                outputs
                    .keys()
                    .filter_map(serde_yaml::Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            template: template.to_string(),
            outputs,
        })
    }

    /// Load `addons.yml` from a workload directory, if present.
    pub fn load(workload_dir: &Path) -> Result<Option<Self>, TemplateError> {
        let path = workload_dir.join(ADDONS_FILENAME);
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_yaml(&content).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TemplateError::Render(format!(
                "read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Output names, exposed to the main container as environment variables.
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addons_collect_output_names() {
        let template = r#"
Resources:
  Table:
    Type: AWS::DynamoDB::Table
Outputs:
  TableName:
    Value: !Ref Table
"#;
        let addons = Addons::from_yaml(template).unwrap();
        assert_eq!(addons.outputs(), ["TableName".to_string()]);
    }

    #[test]
    fn addons_without_resources_are_rejected() {
        assert!(Addons::from_yaml("Outputs: {}").is_err());
    }
}
