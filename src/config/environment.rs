// ABOUTME: Target environment configuration: imported certificates and network placement.
// ABOUTME: Read-only input to validation and stack assembly.

use crate::types::CertificateArn;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    pub name: String,

    #[serde(default)]
    pub http: EnvironmentHttpConfig,

    #[serde(default)]
    pub network: EnvironmentNetworkConfig,

    /// Version of the environment stack; workload templates depend on its exports.
    #[serde(default = "default_env_version")]
    pub version: String,
}

fn default_env_version() -> String {
    "v1.0.0".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentHttpConfig {
    #[serde(default)]
    pub public: IngressConfig,

    #[serde(default)]
    pub private: IngressConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngressConfig {
    #[serde(default)]
    pub certificates: Vec<CertificateArn>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentNetworkConfig {
    #[serde(default)]
    pub placement: Placement,
}

/// Subnets that workload tasks are launched into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    #[default]
    Public,
    Private,
}

/// Which of the environment's load balancers a workload is exposed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingress {
    /// Internet-facing load balancer.
    Public,
    /// Internal load balancer.
    Private,
}

impl EnvironmentConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Certificates imported for the given ingress.
    pub fn imported_certificates(&self, ingress: Ingress) -> &[CertificateArn] {
        match ingress {
            Ingress::Public => &self.http.public.certificates,
            Ingress::Private => &self.http.private.certificates,
        }
    }

    pub fn has_imported_certificates(&self, ingress: Ingress) -> bool {
        !self.imported_certificates(ingress).is_empty()
    }
}
