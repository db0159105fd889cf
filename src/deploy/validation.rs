// ABOUTME: Networking validation: imported load balancer shape and alias/certificate rules.
// ABOUTME: Runs to completion before anything is uploaded or deployed; first failure wins.

use super::error::{CollaboratorResultExt, DeployError, Operation, ValidationError};
use crate::clients::{
    AliasCertValidator, CertValidationError, ImportedLoadBalancer, LoadBalancerLookup,
    LoadBalancerScheme,
};
use crate::config::{EnvironmentConfig, Ingress};
use crate::manifest::{HttpConfig, RuleLocation};
use crate::types::WorkloadName;

/// Per-kind networking expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkingPolicy {
    /// Scheme an imported load balancer must have.
    pub expected_scheme: LoadBalancerScheme,
    /// Which of the environment's certificate lists counts as imported.
    pub ingress: Ingress,
}

impl NetworkingPolicy {
    /// Backend services sit behind internal load balancers.
    pub const BACKEND: NetworkingPolicy = NetworkingPolicy {
        expected_scheme: LoadBalancerScheme::Internal,
        ingress: Ingress::Private,
    };

    /// Load-balanced web services face the internet.
    pub const WEB: NetworkingPolicy = NetworkingPolicy {
        expected_scheme: LoadBalancerScheme::InternetFacing,
        ingress: Ingress::Public,
    };
}

/// What validation accepted, handed on to stack assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedNetworking {
    pub imported_alb: Option<ImportedLoadBalancer>,
}

/// Validate a workload's `http` block against its environment.
///
/// An absent or empty block succeeds without calling any collaborator. The
/// imported load balancer is fetched fresh on every call.
pub async fn validate_networking(
    http: Option<&HttpConfig>,
    workload: &WorkloadName,
    environment: &EnvironmentConfig,
    policy: NetworkingPolicy,
    load_balancers: &dyn LoadBalancerLookup,
    certificates: &dyn AliasCertValidator,
) -> Result<ValidatedNetworking, DeployError> {
    let Some(http) = http.filter(|http| !http.is_empty()) else {
        tracing::debug!(%workload, "no networking to validate");
        return Ok(ValidatedNetworking::default());
    };

    let imported_alb = match http.imported_alb() {
        Some(id) => {
            let alb = load_balancers
                .load_balancer(id)
                .await
                .during(Operation::DescribeLoadBalancer, id)?;
            check_imported_alb(&alb, workload, policy.expected_scheme)
                .map_err(|e| DeployError::validation(RuleLocation::ImportedAlb, e))?;
            Some(alb)
        }
        None => None,
    };

    let imported_certs = environment.imported_certificates(policy.ingress);
    for (location, rule) in http.rules() {
        if rule.is_empty() {
            continue;
        }
        let aliases = rule.hostnames();
        match (aliases.is_empty(), imported_certs.is_empty()) {
            (true, false) => {
                return Err(DeployError::validation(
                    location,
                    ValidationError::NoAliasWithImportedCerts {
                        workload: workload.to_string(),
                        environment: environment.name.clone(),
                    },
                ));
            }
            (true, true) => {}
            (false, true) => {
                return Err(DeployError::validation(
                    location,
                    ValidationError::AliasWithoutImportedCerts {
                        environment: environment.name.clone(),
                    },
                ));
            }
            (false, false) => {
                match certificates.validate_aliases(&aliases, imported_certs).await {
                    Ok(()) => {}
                    Err(CertValidationError::AliasNotCovered { alias }) => {
                        return Err(DeployError::validation(
                            location,
                            ValidationError::AliasNotCovered {
                                environment: environment.name.clone(),
                                alias,
                            },
                        ));
                    }
                    Err(e) => {
                        return Err(DeployError::collaborator(
                            Operation::ValidateCertificates,
                            environment.name.clone(),
                            e,
                        ));
                    }
                }
            }
        }
    }

    tracing::debug!(%workload, imported_alb = imported_alb.is_some(), "networking validated");
    Ok(ValidatedNetworking { imported_alb })
}

/// Scheme, then listener shape.
///
/// One listener of any protocol passes. Any other count needs exactly one
/// HTTP and exactly one HTTPS listener.
pub fn check_imported_alb(
    alb: &ImportedLoadBalancer,
    workload: &WorkloadName,
    expected: LoadBalancerScheme,
) -> Result<(), ValidationError> {
    if alb.scheme != expected {
        return Err(ValidationError::ImportedAlbScheme {
            arn: alb.arn.clone(),
            workload: workload.to_string(),
            expected,
            actual: alb.scheme,
        });
    }
    match alb.listeners.len() {
        0 => Err(ValidationError::ImportedAlbNoListeners {
            arn: alb.arn.clone(),
        }),
        1 => Ok(()),
        _ => match alb.protocol_tally() {
            (1, 1) => Ok(()),
            (http, https) => Err(ValidationError::ImportedAlbListenerProtocols {
                arn: alb.arn.clone(),
                http,
                https,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{Listener, ListenerProtocol};
    use crate::types::{ListenerArn, LoadBalancerArn};

    fn alb(scheme: LoadBalancerScheme, protocols: &[ListenerProtocol]) -> ImportedLoadBalancer {
        ImportedLoadBalancer {
            arn: LoadBalancerArn::new("arn:aws:elasticloadbalancing:us-west-2:1:loadbalancer/app/demo/1"),
            name: "demo".to_string(),
            dns_name: "demo.elb.amazonaws.com".to_string(),
            scheme,
            listeners: protocols
                .iter()
                .enumerate()
                .map(|(i, protocol)| Listener {
                    arn: ListenerArn::new(format!("listener/{}", i)),
                    protocol: *protocol,
                    port: 80 + i as u16,
                })
                .collect(),
        }
    }

    fn api() -> WorkloadName {
        WorkloadName::new("api").unwrap()
    }

    #[test]
    fn scheme_is_checked_before_listeners() {
        let err = check_imported_alb(
            &alb(LoadBalancerScheme::InternetFacing, &[]),
            &api(),
            LoadBalancerScheme::Internal,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::ImportedAlbScheme { .. }));
    }

    #[test]
    fn single_listener_of_any_protocol_passes() {
        for protocol in [
            ListenerProtocol::Http,
            ListenerProtocol::Https,
            ListenerProtocol::Other,
        ] {
            assert!(
                check_imported_alb(
                    &alb(LoadBalancerScheme::Internal, &[protocol]),
                    &api(),
                    LoadBalancerScheme::Internal
                )
                .is_ok()
            );
        }
    }

    #[test]
    fn http_https_pair_passes_in_either_order() {
        use ListenerProtocol::*;
        for listeners in [[Http, Https], [Https, Http]] {
            assert!(
                check_imported_alb(
                    &alb(LoadBalancerScheme::Internal, &listeners),
                    &api(),
                    LoadBalancerScheme::Internal
                )
                .is_ok()
            );
        }
    }

    #[test]
    fn duplicate_protocols_fail_with_tally() {
        use ListenerProtocol::*;
        let err = check_imported_alb(
            &alb(LoadBalancerScheme::Internal, &[Https, Https]),
            &api(),
            LoadBalancerScheme::Internal,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ImportedAlbListenerProtocols { http: 0, https: 2, .. }
        ));
    }

    #[test]
    fn three_listeners_follow_the_tally_rule() {
        use ListenerProtocol::*;
        assert!(
            check_imported_alb(
                &alb(LoadBalancerScheme::Internal, &[Http, Https, Other]),
                &api(),
                LoadBalancerScheme::Internal
            )
            .is_ok()
        );
        assert!(
            check_imported_alb(
                &alb(LoadBalancerScheme::Internal, &[Http, Https, Https]),
                &api(),
                LoadBalancerScheme::Internal
            )
            .is_err()
        );
    }
}
