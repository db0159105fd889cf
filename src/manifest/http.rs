// ABOUTME: HTTP routing configuration for load-balanced workloads.
// ABOUTME: A primary routing rule, optional imported ALB and additional rules.

use serde::Deserialize;
use std::fmt;

/// The `http` block of a manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfig {
    #[serde(flatten)]
    pub main: RoutingRule,

    /// Name or ARN of an externally owned load balancer to attach to.
    #[serde(default)]
    pub alb: Option<String>,

    #[serde(default)]
    pub additional_rules: Vec<RoutingRule>,
}

impl HttpConfig {
    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.alb.is_none() && self.additional_rules.is_empty()
    }

    pub fn imported_alb(&self) -> Option<&str> {
        self.alb.as_deref()
    }

    /// The primary rule followed by every additional rule, each with its location.
    pub fn rules(&self) -> impl Iterator<Item = (RuleLocation, &RoutingRule)> {
        std::iter::once((RuleLocation::Main, &self.main)).chain(
            self.additional_rules
                .iter()
                .enumerate()
                .map(|(idx, rule)| (RuleLocation::Additional(idx), rule)),
        )
    }

    /// Every rule that is actually in use.
    pub fn active_rules(&self) -> impl Iterator<Item = (RuleLocation, &RoutingRule)> {
        self.rules().filter(|(_, rule)| !rule.is_empty())
    }
}

/// A single listener rule routing traffic to the workload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutingRule {
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub target_port: Option<u16>,

    #[serde(default)]
    pub healthcheck: Option<String>,

    #[serde(default)]
    pub alias: Option<Alias>,

    #[serde(default)]
    pub allowed_source_ips: Vec<String>,
}

impl RoutingRule {
    pub fn is_empty(&self) -> bool {
        self.path.is_none()
            && self.target_port.is_none()
            && self.healthcheck.is_none()
            && self.alias.is_none()
            && self.allowed_source_ips.is_empty()
    }

    /// Hostnames declared by this rule; empty when no alias is set.
    pub fn hostnames(&self) -> Vec<String> {
        self.alias.as_ref().map(Alias::hostnames).unwrap_or_default()
    }

    pub fn has_alias(&self) -> bool {
        self.alias.as_ref().is_some_and(|alias| !alias.is_empty())
    }
}

/// One hostname or a list of hostnames.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Alias {
    One(String),
    Many(Vec<String>),
}

impl Alias {
    pub fn hostnames(&self) -> Vec<String> {
        match self {
            Alias::One(host) if host.trim().is_empty() => Vec::new(),
            Alias::One(host) => vec![host.trim().to_string()],
            Alias::Many(hosts) => hosts
                .iter()
                .map(|h| h.trim())
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hostnames().is_empty()
    }
}

/// Where in the `http` block a routing rule lives, for error attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleLocation {
    /// The `http` block's own imported-ALB reference.
    ImportedAlb,
    /// The primary rule declared directly under `http`.
    Main,
    /// `http.additional_rules[idx]`.
    Additional(usize),
}

impl fmt::Display for RuleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleLocation::ImportedAlb => write!(f, "http.alb"),
            RuleLocation::Main => write!(f, "http"),
            RuleLocation::Additional(idx) => write!(f, "http.additional_rules[{}]", idx),
        }
    }
}
