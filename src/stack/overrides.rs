// ABOUTME: Template override layer applying user patch documents on generated templates.
// ABOUTME: Patches are RFC 6902-style add/remove/replace operations addressed by JSON pointer.

use super::{Parameter, StackConfiguration, TemplateError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// File name of the patch document inside a workload's `overrides/` directory.
pub const PATCHES_FILENAME: &str = "cfn.patches.yml";

/// A single patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Add { path, .. } | PatchOp::Remove { path } | PatchOp::Replace { path, .. } => {
                path
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            PatchOp::Add { .. } => "add",
            PatchOp::Remove { .. } => "remove",
            PatchOp::Replace { .. } => "replace",
        }
    }
}

/// Errors from parsing or applying override patches.
#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    #[error("parse override patches: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("read override patches {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("patch {index} ({op} {path}): {reason}")]
    InvalidPath {
        index: usize,
        op: &'static str,
        path: String,
        reason: String,
    },

    #[error("patch {index} ({op} {path}): target does not exist")]
    MissingTarget {
        index: usize,
        op: &'static str,
        path: String,
    },
}

/// An ordered list of patches applied on top of a generated template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateOverrider {
    patches: Vec<PatchOp>,
}

impl TemplateOverrider {
    pub fn new(patches: Vec<PatchOp>) -> Self {
        Self { patches }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, OverrideError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(Self::new(serde_yaml::from_str(yaml)?))
    }

    /// Load `overrides/cfn.patches.yml` from a workload directory; absent file means no patches.
    pub fn load(workload_dir: &Path) -> Result<Self, OverrideError> {
        let path = workload_dir.join("overrides").join(PATCHES_FILENAME);
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_yaml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(OverrideError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn patches(&self) -> &[PatchOp] {
        &self.patches
    }

    /// Patches of `self` followed by patches of `next`.
    pub fn then(mut self, next: TemplateOverrider) -> Self {
        self.patches.extend(next.patches);
        self
    }

    /// Apply every patch in order.
    pub fn apply(&self, doc: Value) -> Result<Value, OverrideError> {
        self.apply_after(doc, 0)
    }

    /// Apply every patch in order, numbering them from `preceding` in errors.
    pub fn apply_after(&self, mut doc: Value, preceding: usize) -> Result<Value, OverrideError> {
        for (index, patch) in self.patches.iter().enumerate() {
            apply_patch(&mut doc, preceding + index, patch)?;
        }
        Ok(doc)
    }
}

fn parse_pointer(index: usize, patch: &PatchOp) -> Result<Vec<String>, OverrideError> {
    let path = patch.path();
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(OverrideError::InvalidPath {
            index,
            op: patch.name(),
            path: path.to_string(),
            reason: "pointer must start with '/'".to_string(),
        });
    };
    Ok(rest
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect())
}

fn apply_patch(doc: &mut Value, index: usize, patch: &PatchOp) -> Result<(), OverrideError> {
    let invalid = |reason: &str| OverrideError::InvalidPath {
        index,
        op: patch.name(),
        path: patch.path().to_string(),
        reason: reason.to_string(),
    };
    let missing = || OverrideError::MissingTarget {
        index,
        op: patch.name(),
        path: patch.path().to_string(),
    };

    let mut tokens = parse_pointer(index, patch)?;
    let Some(last) = tokens.pop() else {
        return match patch {
            PatchOp::Add { value, .. } | PatchOp::Replace { value, .. } => {
                *doc = value.clone();
                Ok(())
            }
            PatchOp::Remove { .. } => Err(invalid("cannot remove the document root")),
        };
    };

    let mut parent = doc;
    for token in &tokens {
        parent = match parent {
            Value::Object(map) => map.get_mut(token).ok_or_else(missing)?,
            Value::Array(items) => {
                let idx: usize = token.parse().map_err(|_| invalid("array index expected"))?;
                items.get_mut(idx).ok_or_else(missing)?
            }
            _ => return Err(missing()),
        };
    }

    match (patch, parent) {
        (PatchOp::Add { value, .. }, Value::Object(map)) => {
            map.insert(last, value.clone());
        }
        (PatchOp::Add { value, .. }, Value::Array(items)) => {
            if last == "-" {
                items.push(value.clone());
            } else {
                let idx: usize = last.parse().map_err(|_| invalid("array index expected"))?;
                if idx > items.len() {
                    return Err(invalid("array index out of bounds"));
                }
                items.insert(idx, value.clone());
            }
        }
        (PatchOp::Remove { .. }, Value::Object(map)) => {
            map.remove(&last).ok_or_else(missing)?;
        }
        (PatchOp::Remove { .. }, Value::Array(items)) => {
            let idx: usize = last.parse().map_err(|_| invalid("array index expected"))?;
            if idx >= items.len() {
                return Err(missing());
            }
            items.remove(idx);
        }
        (PatchOp::Replace { value, .. }, Value::Object(map)) => {
            let slot = map.get_mut(&last).ok_or_else(missing)?;
            *slot = value.clone();
        }
        (PatchOp::Replace { value, .. }, Value::Array(items)) => {
            let idx: usize = last.parse().map_err(|_| invalid("array index expected"))?;
            let slot = items.get_mut(idx).ok_or_else(missing)?;
            *slot = value.clone();
        }
        _ => return Err(missing()),
    }
    Ok(())
}

/// A stack configuration with user patches layered on its template.
///
/// The wrapped configuration is never re-assembled: changing only the patches
/// re-uses the inner document. Wrapping twice is the same as wrapping once
/// with the concatenated patch list.
#[derive(Debug)]
pub struct OverriddenStack {
    inner: Box<dyn StackConfiguration>,
    overrider: TemplateOverrider,
}

impl OverriddenStack {
    pub fn wrap(inner: Box<dyn StackConfiguration>, overrider: TemplateOverrider) -> Self {
        Self { inner, overrider }
    }

    /// Layer more patches after the existing ones.
    pub fn with_overrides(self, more: TemplateOverrider) -> Self {
        Self {
            inner: self.inner,
            overrider: self.overrider.then(more),
        }
    }

    pub fn overrider(&self) -> &TemplateOverrider {
        &self.overrider
    }
}

impl StackConfiguration for OverriddenStack {
    fn stack_name(&self) -> &str {
        self.inner.stack_name()
    }

    fn document(&self) -> Result<Value, TemplateError> {
        let doc = self.inner.document()?;
        Ok(self
            .overrider
            .apply_after(doc, self.inner.override_count())?)
    }

    fn override_count(&self) -> usize {
        self.inner.override_count() + self.overrider.patches().len()
    }

    fn parameters(&self) -> Result<Vec<Parameter>, TemplateError> {
        self.inner.parameters()
    }

    fn tags(&self) -> BTreeMap<String, String> {
        self.inner.tags()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "Resources": {
                "Service": {"Properties": {"DesiredCount": 1}},
                "LogGroup": {"Properties": {"RetentionInDays": 30}}
            },
            "Outputs": {"Names": ["a", "b"]}
        })
    }

    #[test]
    fn parses_yaml_patch_document() {
        let yaml = r#"
- op: replace
  path: /Resources/Service/Properties/DesiredCount
  value: 3
- op: remove
  path: /Resources/LogGroup
- op: add
  path: /Outputs/Names/-
  value: c
"#;
        let overrider = TemplateOverrider::from_yaml(yaml).unwrap();
        assert_eq!(overrider.patches().len(), 3);

        let patched = overrider.apply(doc()).unwrap();
        assert_eq!(patched["Resources"]["Service"]["Properties"]["DesiredCount"], 3);
        assert!(patched["Resources"].get("LogGroup").is_none());
        assert_eq!(patched["Outputs"]["Names"], json!(["a", "b", "c"]));
    }

    #[test]
    fn pointer_escapes_are_decoded() {
        let overrider = TemplateOverrider::new(vec![PatchOp::Add {
            path: "/Resources/a~1b~0c".to_string(),
            value: json!(true),
        }]);
        let patched = overrider.apply(doc()).unwrap();
        assert_eq!(patched["Resources"]["a/b~c"], true);
    }

    #[test]
    fn replace_requires_existing_target() {
        let overrider = TemplateOverrider::new(vec![PatchOp::Replace {
            path: "/Resources/Missing/Type".to_string(),
            value: json!("x"),
        }]);
        let err = overrider.apply(doc()).unwrap_err();
        assert!(matches!(err, OverrideError::MissingTarget { index: 0, .. }));
    }

    #[test]
    fn add_inserts_at_array_index() {
        let overrider = TemplateOverrider::new(vec![PatchOp::Add {
            path: "/Outputs/Names/0".to_string(),
            value: json!("z"),
        }]);
        let patched = overrider.apply(doc()).unwrap();
        assert_eq!(patched["Outputs"]["Names"], json!(["z", "a", "b"]));
    }

    #[test]
    fn pointer_without_leading_slash_is_invalid() {
        let overrider = TemplateOverrider::new(vec![PatchOp::Remove {
            path: "Resources".to_string(),
        }]);
        assert!(matches!(
            overrider.apply(doc()),
            Err(OverrideError::InvalidPath { .. })
        ));
    }

    #[test]
    fn error_reports_failing_patch_index() {
        let overrider = TemplateOverrider::new(vec![
            PatchOp::Remove {
                path: "/Resources/LogGroup".to_string(),
            },
            PatchOp::Remove {
                path: "/Resources/LogGroup".to_string(),
            },
        ]);
        let err = overrider.apply(doc()).unwrap_err();
        assert!(matches!(err, OverrideError::MissingTarget { index: 1, .. }));
    }

    #[test]
    fn empty_file_means_no_patches() {
        assert!(TemplateOverrider::from_yaml("\n").unwrap().is_empty());
    }
}
