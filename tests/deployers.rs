// ABOUTME: Integration tests for the variant deployers against recording fakes.
// ABOUTME: Covers dispatch, validation ordering, upload, execution and recommendations.

mod support;

use launchpad::clients::{ListenerProtocol, LoadBalancerScheme};
use launchpad::deploy::{
    BackendServiceDeployer, DeployErrorKind, DeployOptions, DeployWorkloadInput,
    GenerateTemplateInput, StackRuntimeConfiguration, UploadPhase, ValidationError,
    WorkloadDeployer, new_workload_deployer,
};
use launchpad::manifest::{RuleLocation, WorkloadKind};
use support::{ALB_ARN, FakeEngine, Fakes, PUSHED_DIGEST, alb, environment, init_tracing, input};

const BACKEND_PLAIN: &str = r#"
type: Backend Service
name: api
image:
  location: public.ecr.aws/nginx/nginx:1.25
  port: 8080
"#;

const BACKEND_IMPORTED_ALB: &str = r#"
type: Backend Service
name: api
image:
  location: public.ecr.aws/nginx/nginx:1.25
  port: 8080
http:
  path: /api
  alb: shared
"#;

const WEB_WITH_ALIAS: &str = r#"
type: Load Balanced Web Service
name: frontend
image:
  location: public.ecr.aws/nginx/nginx:1.25
  port: 80
http:
  path: /
  alias: api.example.com
"#;

const JOB: &str = r#"
type: Scheduled Job
name: report
image:
  location: public.ecr.aws/docker/library/busybox:latest
on:
  schedule: "@daily"
"#;

fn options(force: bool) -> DeployOptions {
    DeployOptions {
        force_new_update: force,
        ..DeployOptions::default()
    }
}

async fn deploy(
    deployer: &dyn WorkloadDeployer,
    force: bool,
) -> Result<Vec<String>, launchpad::deploy::DeployError> {
    let uploads = deployer.upload_artifacts().await?;
    let recommender = deployer
        .deploy_workload(DeployWorkloadInput {
            runtime: StackRuntimeConfiguration::from(uploads),
            options: options(force),
        })
        .await?;
    Ok(recommender.recommended_actions())
}

#[test]
fn dispatches_on_manifest_kind() {
    let fakes = Fakes::default();
    for (yaml, kind) in [
        (BACKEND_PLAIN, WorkloadKind::BackendService),
        (WEB_WITH_ALIAS, WorkloadKind::LoadBalancedWebService),
        (JOB, WorkloadKind::ScheduledJob),
    ] {
        let deployer = new_workload_deployer(input(yaml, environment(true)), fakes.clients()).unwrap();
        assert_eq!(deployer.kind(), kind);
    }
}

#[test]
fn variant_rejects_other_kinds() {
    let fakes = Fakes::default();
    let err = BackendServiceDeployer::new(input(WEB_WITH_ALIAS, environment(true)), fakes.clients())
        .err()
        .unwrap();
    assert_eq!(err.kind(), DeployErrorKind::Fatal);
    assert!(!err.kind().is_retryable());
}

#[test]
fn building_without_repository_is_fatal() {
    let fakes = Fakes::default();
    let yaml = "type: Worker Service\nname: queue\nimage:\n  build: Dockerfile\n";
    let mut input = input(yaml, environment(false));
    input.resources.repository = None;
    let err = new_workload_deployer(input, fakes.clients()).err().unwrap();
    assert_eq!(err.kind(), DeployErrorKind::Fatal);
}

#[test]
fn region_availability_comes_from_the_catalog() {
    let fakes = Fakes::default();
    let deployer = new_workload_deployer(input(JOB, environment(false)), fakes.clients()).unwrap();
    assert!(deployer.is_service_available_in_region("us-west-2").unwrap());
    let err = deployer
        .is_service_available_in_region("mars-north-1")
        .unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::Collaborator);
}

#[tokio::test]
async fn empty_networking_skips_lookup_and_deploys() {
    init_tracing();
    let fakes = Fakes::default();
    let deployer =
        new_workload_deployer(input(BACKEND_PLAIN, environment(false)), fakes.clients()).unwrap();

    deployer.validate().await.unwrap();
    let actions = deploy(deployer.as_ref(), false).await.unwrap();

    assert!(actions.is_empty());
    assert!(fakes.load_balancers.calls().is_empty());
    assert!(fakes.certificates.calls().is_empty());
    let deployed = fakes.stacks.deployed();
    assert_eq!(deployed.len(), 1);
    assert_eq!(deployed[0].0, "demo-test-api");
}

#[tokio::test]
async fn generate_template_never_uploads_or_executes() {
    let fakes = Fakes::default().with_albs(vec![alb(
        LoadBalancerScheme::Internal,
        &[ListenerProtocol::Http],
    )]);
    let deployer =
        new_workload_deployer(input(BACKEND_IMPORTED_ALB, environment(false)), fakes.clients())
            .unwrap();

    let output = deployer
        .generate_template(GenerateTemplateInput {
            runtime: StackRuntimeConfiguration::default(),
        })
        .await
        .unwrap();

    assert_eq!(output.stack_name, "demo-test-api");
    assert!(output.template.contains("TaskDefinition"));
    assert!(output.parameters.contains("ContainerImage"));
    assert!(fakes.artifacts.keys().is_empty());
    assert!(fakes.images.requests().is_empty());
    assert!(fakes.stacks.deployed().is_empty());
    assert_eq!(fakes.load_balancers.calls(), vec!["shared".to_string()]);
}

#[tokio::test]
async fn deploy_workload_validates_exactly_once() {
    let fakes = Fakes::default().with_albs(vec![alb(
        LoadBalancerScheme::Internal,
        &[ListenerProtocol::Http, ListenerProtocol::Https],
    )]);
    let deployer =
        new_workload_deployer(input(BACKEND_IMPORTED_ALB, environment(false)), fakes.clients())
            .unwrap();

    let uploads = deployer.upload_artifacts().await.unwrap();
    deployer
        .deploy_workload(DeployWorkloadInput {
            runtime: uploads.into(),
            options: options(false),
        })
        .await
        .unwrap();

    assert_eq!(fakes.load_balancers.calls().len(), 1);
    assert_eq!(fakes.stacks.deployed().len(), 1);
}

#[tokio::test]
async fn internet_facing_alb_fails_backend_before_execution() {
    let fakes = Fakes::default().with_albs(vec![alb(
        LoadBalancerScheme::InternetFacing,
        &[ListenerProtocol::Http],
    )]);
    let deployer =
        new_workload_deployer(input(BACKEND_IMPORTED_ALB, environment(false)), fakes.clients())
            .unwrap();

    let err = deployer
        .deploy_workload(DeployWorkloadInput {
            runtime: StackRuntimeConfiguration::default(),
            options: options(false),
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::Validation);
    let message = err.to_string();
    assert!(message.contains(ALB_ARN));
    assert!(message.contains("internal"));
    assert!(fakes.stacks.deployed().is_empty());
}

#[tokio::test]
async fn each_attempt_looks_up_the_imported_alb_again() {
    let fakes = Fakes::default().with_albs(vec![alb(
        LoadBalancerScheme::InternetFacing,
        &[ListenerProtocol::Https],
    )]);
    let deployer =
        new_workload_deployer(input(BACKEND_IMPORTED_ALB, environment(false)), fakes.clients())
            .unwrap();
    let attempt = || {
        deployer.deploy_workload(DeployWorkloadInput {
            runtime: StackRuntimeConfiguration::default(),
            options: options(false),
        })
    };

    let err = attempt().await.unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::Validation);

    fakes.load_balancers.replace(vec![alb(
        LoadBalancerScheme::Internal,
        &[ListenerProtocol::Https],
    )]);
    attempt().await.unwrap();

    assert_eq!(fakes.load_balancers.calls().len(), 2);
    assert_eq!(fakes.stacks.deployed().len(), 1);
}

#[tokio::test]
async fn unknown_imported_alb_is_a_collaborator_error() {
    let fakes = Fakes::default();
    let deployer =
        new_workload_deployer(input(BACKEND_IMPORTED_ALB, environment(false)), fakes.clients())
            .unwrap();
    let err = deployer.validate().await.unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::Collaborator);
    assert!(err.kind().is_retryable());
}

#[tokio::test]
async fn covered_alias_passes_and_recommends_dns_update() {
    init_tracing();
    let fakes = Fakes::default();
    let deployer =
        new_workload_deployer(input(WEB_WITH_ALIAS, environment(true)), fakes.clients()).unwrap();

    let actions = deploy(deployer.as_ref(), false).await.unwrap();

    assert_eq!(
        fakes.certificates.calls(),
        vec![vec!["api.example.com".to_string()]]
    );
    assert_eq!(actions.len(), 1);
    assert!(actions[0].contains("api.example.com"));
    assert!(actions[0].contains("the public load balancer of environment test"));
}

#[tokio::test]
async fn recommendation_targets_imported_alb() {
    let yaml = format!("{}  alb: shared\n", WEB_WITH_ALIAS);
    let fakes = Fakes::default().with_albs(vec![alb(
        LoadBalancerScheme::InternetFacing,
        &[ListenerProtocol::Https],
    )]);
    let deployer = new_workload_deployer(input(&yaml, environment(true)), fakes.clients()).unwrap();

    let actions = deploy(deployer.as_ref(), false).await.unwrap();

    assert!(actions[0].contains("shared-1234567890.us-west-2.elb.amazonaws.com"));
}

#[tokio::test]
async fn uncovered_alias_is_named() {
    let yaml = WEB_WITH_ALIAS.replace("api.example.com", "[api.example.com, shop.example.org]");
    let fakes = Fakes::default();
    let deployer = new_workload_deployer(input(&yaml, environment(true)), fakes.clients()).unwrap();

    let err = deployer.validate().await.unwrap_err();

    match err.as_validation() {
        Some((RuleLocation::Main, ValidationError::AliasNotCovered { alias, environment })) => {
            assert_eq!(alias, "shop.example.org");
            assert_eq!(environment, "test");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn wildcard_covers_a_single_label_only() {
    let yaml = WEB_WITH_ALIAS.replace("api.example.com", "v1.api.example.com");
    let fakes = Fakes::default();
    let deployer = new_workload_deployer(input(&yaml, environment(true)), fakes.clients()).unwrap();

    let err = deployer.validate().await.unwrap_err();

    assert!(matches!(
        err.as_validation(),
        Some((_, ValidationError::AliasNotCovered { .. }))
    ));
}

#[tokio::test]
async fn alias_without_imported_certs_fails() {
    let fakes = Fakes::default();
    let deployer =
        new_workload_deployer(input(WEB_WITH_ALIAS, environment(false)), fakes.clients()).unwrap();

    let err = deployer.validate().await.unwrap_err();

    assert!(matches!(
        err.as_validation(),
        Some((RuleLocation::Main, ValidationError::AliasWithoutImportedCerts { .. }))
    ));
    assert!(fakes.certificates.calls().is_empty());
}

#[tokio::test]
async fn additional_rule_failures_name_their_index() {
    let yaml = format!(
        "{}  additional_rules:\n    - path: /admin\n      alias: admin.example.com\n    - path: /legacy\n",
        WEB_WITH_ALIAS
    );
    let fakes = Fakes::default();
    let deployer = new_workload_deployer(input(&yaml, environment(true)), fakes.clients()).unwrap();

    let err = deployer.validate().await.unwrap_err();

    assert!(matches!(
        err.as_validation(),
        Some((
            RuleLocation::Additional(1),
            ValidationError::NoAliasWithImportedCerts { .. }
        ))
    ));
    assert!(err.to_string().starts_with("http.additional_rules[1]"));
}

#[tokio::test]
async fn no_changes_without_force_does_not_roll_tasks() {
    let fakes = Fakes::default().with_engine(FakeEngine::unchanged());
    let deployer =
        new_workload_deployer(input(BACKEND_PLAIN, environment(false)), fakes.clients()).unwrap();

    deploy(deployer.as_ref(), false).await.unwrap();

    assert!(fakes.services.calls().is_empty());
}

#[tokio::test]
async fn no_changes_with_force_rolls_the_service() {
    let fakes = Fakes::default().with_engine(FakeEngine::unchanged());
    let deployer =
        new_workload_deployer(input(BACKEND_PLAIN, environment(false)), fakes.clients()).unwrap();

    deploy(deployer.as_ref(), true).await.unwrap();

    assert_eq!(
        fakes.services.calls(),
        vec![("demo-test".to_string(), "demo-test-api".to_string())]
    );
}

#[tokio::test]
async fn forced_job_has_no_service_to_roll() {
    let fakes = Fakes::default().with_engine(FakeEngine::unchanged());
    let deployer = new_workload_deployer(input(JOB, environment(false)), fakes.clients()).unwrap();

    deploy(deployer.as_ref(), true).await.unwrap();

    assert!(fakes.services.calls().is_empty());
    assert_eq!(fakes.stacks.deployed().len(), 1);
}

#[tokio::test]
async fn job_template_schedules_a_state_machine() {
    let fakes = Fakes::default();
    let deployer = new_workload_deployer(input(JOB, environment(false)), fakes.clients()).unwrap();

    deploy(deployer.as_ref(), false).await.unwrap();

    let (_, template) = &fakes.stacks.deployed()[0];
    assert!(template.contains("StateMachine"));
    assert!(template.contains("cron(0 0 * * ? *)"));
}

#[tokio::test]
async fn built_images_are_pushed_by_digest() {
    let yaml = "type: Worker Service\nname: api\nimage:\n  build: Dockerfile\n";
    let fakes = Fakes::default();
    let deployer = new_workload_deployer(input(yaml, environment(false)), fakes.clients()).unwrap();

    let uploads = deployer.upload_artifacts().await.unwrap();

    let requests = fakes.images.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].tags, vec!["v1".to_string()]);
    assert_eq!(uploads.image_digest.unwrap().as_str(), PUSHED_DIGEST);
    assert_eq!(uploads.image.unwrap().digest(), Some(PUSHED_DIGEST));
    assert!(uploads.custom_resources.contains_key("EnvControllerFunction"));
    assert!(
        fakes.artifacts.keys()[0].starts_with("manual/scripts/custom-resources/envcontrollerfunction/")
    );
}

#[tokio::test]
async fn failed_upload_reports_phase_and_partial_output() {
    let mut fakes = Fakes::default();
    fakes.artifacts = std::sync::Arc::new(support::RecordingStore::failing());
    let deployer =
        new_workload_deployer(input(BACKEND_PLAIN, environment(false)), fakes.clients()).unwrap();

    let err = deployer.upload_artifacts().await.unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::Upload);
    match err {
        launchpad::deploy::DeployError::Upload(upload) => {
            assert_eq!(upload.phase(), UploadPhase::CustomResources);
            assert!(upload.partial().image.is_some());
            assert!(upload.partial().custom_resources.is_empty());
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn missing_custom_resources_are_fatal() {
    let mut fakes = Fakes::default();
    fakes.resources = std::sync::Arc::new(support::FakeResources { missing: true });
    let deployer =
        new_workload_deployer(input(BACKEND_PLAIN, environment(false)), fakes.clients()).unwrap();

    let err = deployer.upload_artifacts().await.unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::Fatal);
}
