// ABOUTME: Load balancer lookup: descriptors of externally owned application load balancers.
// ABOUTME: Snapshots are fetched per validation and never cached.

use crate::types::{ListenerArn, LoadBalancerArn};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadBalancerScheme {
    #[serde(rename = "internal")]
    Internal,
    #[serde(rename = "internet-facing")]
    InternetFacing,
}

impl fmt::Display for LoadBalancerScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadBalancerScheme::Internal => write!(f, "internal"),
            LoadBalancerScheme::InternetFacing => write!(f, "internet-facing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListenerProtocol {
    Http,
    Https,
    /// TCP, TLS and anything else a load balancer may report.
    #[serde(other)]
    Other,
}

impl fmt::Display for ListenerProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerProtocol::Http => write!(f, "HTTP"),
            ListenerProtocol::Https => write!(f, "HTTPS"),
            ListenerProtocol::Other => write!(f, "OTHER"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub arn: ListenerArn,
    pub protocol: ListenerProtocol,
    pub port: u16,
}

/// A fetched load balancer descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedLoadBalancer {
    pub arn: LoadBalancerArn,
    pub name: String,
    pub dns_name: String,
    pub scheme: LoadBalancerScheme,
    /// Listeners in the order the lookup reported them.
    #[serde(default)]
    pub listeners: Vec<Listener>,
}

impl ImportedLoadBalancer {
    /// Number of HTTP and HTTPS listeners.
    pub fn protocol_tally(&self) -> (usize, usize) {
        self.listeners
            .iter()
            .fold((0, 0), |(http, https), listener| match listener.protocol {
                ListenerProtocol::Http => (http + 1, https),
                ListenerProtocol::Https => (http, https + 1),
                ListenerProtocol::Other => (http, https),
            })
    }

    /// Whether `id` names this load balancer by ARN or by name.
    pub fn matches(&self, id: &str) -> bool {
        self.arn.as_str() == id || self.name == id
    }
}

/// Errors from load balancer lookups.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("load balancer not found: {0}")]
    NotFound(String),

    #[error("load balancer lookup failed: {0}")]
    Api(String),
}

/// Describes load balancers by name or ARN.
#[async_trait]
pub trait LoadBalancerLookup: Send + Sync {
    async fn load_balancer(&self, id: &str) -> Result<ImportedLoadBalancer, LookupError>;
}
