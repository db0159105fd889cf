// ABOUTME: Custom-resource bundles: helper functions a workload kind deploys alongside its stack.
// ABOUTME: A bundle always lists at least one function with its handler source.

use crate::manifest::WorkloadKind;
use async_trait::async_trait;
use bytes::Bytes;
use nonempty::NonEmpty;

/// One helper function and its packaged source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomResourceFunction {
    /// Logical name, used as the template resource id.
    pub name: String,
    /// Handler file name inside the bundle.
    pub handler: String,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomResourceBundle {
    pub kind: WorkloadKind,
    pub functions: NonEmpty<CustomResourceFunction>,
}

/// Errors from reading custom-resource bundles.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("no custom resources packaged for {kind} at {path}")]
    Missing { kind: WorkloadKind, path: String },

    #[error("custom resources for {kind} are malformed: {reason}")]
    Malformed { kind: WorkloadKind, reason: String },
}

#[async_trait]
pub trait ResourceReader: Send + Sync {
    async fn read_custom_resources(
        &self,
        kind: WorkloadKind,
    ) -> Result<CustomResourceBundle, ResourceError>;
}
