// ABOUTME: YAML cloud catalog describing load balancers and certificates known to the workspace.
// ABOUTME: Implements load balancer lookup and wildcard-aware alias coverage.

use crate::clients::{
    AliasCertValidator, CertValidationError, ImportedLoadBalancer, LoadBalancerLookup, LookupError,
};
use crate::types::CertificateArn;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

pub const CATALOG_FILENAME: &str = ".launchpad/catalog.yml";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("read catalog {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CertificateEntry {
    pub arn: CertificateArn,
    /// Domain names on the certificate; `*.example.com` covers one label.
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudCatalog {
    #[serde(default)]
    pub load_balancers: Vec<ImportedLoadBalancer>,

    #[serde(default)]
    pub certificates: Vec<CertificateEntry>,
}

impl CloudCatalog {
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load the workspace catalog; a workspace without one has an empty catalog.
    pub fn discover(workspace: &Path) -> Result<Self, CatalogError> {
        let path = workspace.join(CATALOG_FILENAME);
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_yaml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no catalog at {}", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(CatalogError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

/// Whether a certificate domain covers a hostname.
///
/// A wildcard matches exactly one leading label: `*.example.com` covers
/// `api.example.com` but neither `example.com` nor `a.b.example.com`.
pub fn domain_covers(domain: &str, host: &str) -> bool {
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    match domain.strip_prefix("*.") {
        Some(suffix) => host
            .split_once('.')
            .is_some_and(|(label, rest)| !label.is_empty() && rest == suffix),
        None => domain == host,
    }
}

#[async_trait]
impl LoadBalancerLookup for CloudCatalog {
    async fn load_balancer(&self, id: &str) -> Result<ImportedLoadBalancer, LookupError> {
        self.load_balancers
            .iter()
            .find(|alb| alb.matches(id))
            .cloned()
            .ok_or_else(|| LookupError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl AliasCertValidator for CloudCatalog {
    async fn validate_aliases(
        &self,
        aliases: &[String],
        certificates: &[CertificateArn],
    ) -> Result<(), CertValidationError> {
        let mut domains = Vec::new();
        for arn in certificates {
            let entry = self
                .certificates
                .iter()
                .find(|entry| &entry.arn == arn)
                .ok_or_else(|| CertValidationError::CertificateNotFound(arn.to_string()))?;
            domains.extend(entry.domains.iter().map(String::as_str));
        }
        for alias in aliases {
            if !domains.iter().any(|domain| domain_covers(domain, alias)) {
                return Err(CertValidationError::AliasNotCovered {
                    alias: alias.clone(),
                });
            }
        }
        Ok(())
    }
}
