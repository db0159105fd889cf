// ABOUTME: Reads custom-resource bundles from a directory of packaged helper functions.
// ABOUTME: `<root>/<kind>.yml` lists functions; sources live in `<root>/lambdas/`.

use crate::clients::{CustomResourceBundle, CustomResourceFunction, ResourceError, ResourceReader};
use crate::manifest::WorkloadKind;
use async_trait::async_trait;
use bytes::Bytes;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct BundleFile {
    #[serde(deserialize_with = "deserialize_functions")]
    functions: NonEmpty<FunctionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct FunctionEntry {
    name: String,
    handler: String,
}

fn deserialize_functions<'de, D>(deserializer: D) -> Result<NonEmpty<FunctionEntry>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<FunctionEntry> = Vec::deserialize(deserializer)?;
    NonEmpty::from_vec(values)
        .ok_or_else(|| serde::de::Error::custom("at least one function is required"))
}

#[derive(Debug, Clone)]
pub struct FsResourceReader {
    root: PathBuf,
}

impl FsResourceReader {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn bundle_path(&self, kind: WorkloadKind) -> PathBuf {
        self.root.join(format!("{}.yml", kind.slug()))
    }
}

#[async_trait]
impl ResourceReader for FsResourceReader {
    async fn read_custom_resources(
        &self,
        kind: WorkloadKind,
    ) -> Result<CustomResourceBundle, ResourceError> {
        let path = self.bundle_path(kind);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| ResourceError::Missing {
                kind,
                path: path.display().to_string(),
            })?;
        let file: BundleFile =
            serde_yaml::from_str(&content).map_err(|e| ResourceError::Malformed {
                kind,
                reason: e.to_string(),
            })?;

        let mut functions = Vec::with_capacity(file.functions.len());
        for entry in file.functions {
            let source = self.root.join("lambdas").join(&entry.handler);
            let body = tokio::fs::read(&source)
                .await
                .map_err(|e| ResourceError::Malformed {
                    kind,
                    reason: format!("{}: {}", source.display(), e),
                })?;
            functions.push(CustomResourceFunction {
                name: entry.name,
                handler: entry.handler,
                body: Bytes::from(body),
            });
        }
        let functions = NonEmpty::from_vec(functions).ok_or_else(|| ResourceError::Malformed {
            kind,
            reason: "bundle lists no functions".to_string(),
        })?;
        Ok(CustomResourceBundle { kind, functions })
    }
}
