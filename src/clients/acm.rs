// ABOUTME: Certificate coverage checks for workload aliases.
// ABOUTME: A validator confirms every alias is covered by at least one imported certificate.

use crate::types::CertificateArn;
use async_trait::async_trait;

/// Errors from alias/certificate validation.
#[derive(Debug, thiserror::Error)]
pub enum CertValidationError {
    #[error("alias {alias} is not covered by any imported certificate")]
    AliasNotCovered { alias: String },

    #[error("certificate not found: {0}")]
    CertificateNotFound(String),

    #[error("certificate service error: {0}")]
    Api(String),
}

#[async_trait]
pub trait AliasCertValidator: Send + Sync {
    /// Succeeds only if every alias is covered; otherwise names the first uncovered alias.
    async fn validate_aliases(
        &self,
        aliases: &[String],
        certificates: &[CertificateArn],
    ) -> Result<(), CertValidationError>;
}
