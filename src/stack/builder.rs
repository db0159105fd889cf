// ABOUTME: Default stack builder rendering a workload's template document.
// ABOUTME: Emits task, service, routing, queue, schedule and add-on resources per workload kind.

use super::{
    APP_TAG, ENV_TAG, Parameter, StackBuilder, StackConfiguration, StackInput, TemplateError,
    WORKLOAD_TAG,
};
use crate::clients::{ImportedLoadBalancer, ListenerProtocol};
use crate::config::{Ingress, Placement};
use crate::deploy::{AppContext, RuntimeConfig};
use crate::manifest::{
    HttpConfig, RoutingRule, ScheduledJobManifest, SubscribeConfig, WorkerServiceManifest,
    WorkloadManifest,
};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

const DEFAULT_PORT: u16 = 80;
const LOG_RETENTION_DAYS: &str = "30";
const RULE_PRIORITY_FUNCTION: &str = "RulePriorityFunction";

/// Production builder: renders a [`WorkloadStack`] for any workload kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateStackBuilder;

impl StackBuilder for TemplateStackBuilder {
    fn build(&self, input: StackInput<'_>) -> Result<Box<dyn StackConfiguration>, TemplateError> {
        Ok(Box::new(WorkloadStack::new(input)))
    }
}

/// The generated stack for one workload in one environment.
#[derive(Debug, Clone)]
pub struct WorkloadStack {
    stack_name: String,
    app: AppContext,
    env_name: String,
    env_version: String,
    placement: Placement,
    public_https: bool,
    private_https: bool,
    manifest: WorkloadManifest,
    raw_manifest: String,
    runtime: RuntimeConfig,
    addon_outputs: Vec<String>,
    imported_alb: Option<ImportedLoadBalancer>,
}

impl WorkloadStack {
    pub fn new(input: StackInput<'_>) -> Self {
        let env = input.environment;
        Self {
            stack_name: format!("{}-{}-{}", input.app.name, env.name, input.manifest.name()),
            app: input.app.clone(),
            env_name: env.name.clone(),
            env_version: env.version.clone(),
            placement: env.network.placement,
            public_https: env.has_imported_certificates(Ingress::Public),
            private_https: env.has_imported_certificates(Ingress::Private),
            manifest: input.manifest.clone(),
            raw_manifest: input.raw_manifest.to_string(),
            runtime: input.runtime,
            addon_outputs: input
                .addons
                .map(|addons| addons.outputs().to_vec())
                .unwrap_or_default(),
            imported_alb: input.imported_alb,
        }
    }

    pub fn imported_alb(&self) -> Option<&ImportedLoadBalancer> {
        self.imported_alb.as_ref()
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    fn workload_name(&self) -> &str {
        self.manifest.name().as_str()
    }

    fn import(&self, export: &str) -> Value {
        json!({ "Fn::ImportValue": format!("{}-{}-{}", self.app.name, self.env_name, export) })
    }

    fn container_port(&self) -> Option<u16> {
        self.manifest.task().image.port
    }

    fn render(&self) -> Value {
        let mut resources = Map::new();
        resources.insert("LogGroup".to_string(), self.log_group());
        resources.insert("TaskDefinition".to_string(), self.task_definition());
        self.custom_resource_functions(&mut resources);

        match &self.manifest {
            WorkloadManifest::BackendService(m) => {
                let balancers = self.http_resources(&mut resources, &m.http, Ingress::Private);
                resources.insert("Service".to_string(), self.service(balancers));
            }
            WorkloadManifest::LoadBalancedWebService(m) => {
                let balancers = self.http_resources(&mut resources, &m.http, Ingress::Public);
                resources.insert("Service".to_string(), self.service(balancers));
            }
            WorkloadManifest::WorkerService(m) => {
                self.queue_resources(&mut resources, m);
                resources.insert("Service".to_string(), self.service(Vec::new()));
            }
            WorkloadManifest::ScheduledJob(m) => {
                self.schedule_resources(&mut resources, m);
            }
        }

        if self.runtime.addons_template.is_some() {
            resources.insert(
                "AddonsStack".to_string(),
                json!({
                    "Type": "AWS::CloudFormation::Stack",
                    "Properties": {
                        "TemplateURL": { "Ref": "AddonsTemplateURL" },
                        "Parameters": {
                            "App": { "Ref": "AppName" },
                            "Env": { "Ref": "EnvName" },
                            "Name": { "Ref": "WorkloadName" },
                        },
                    },
                }),
            );
        }

        json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Description": format!(
                "{} {} for application {}, environment {}",
                self.manifest.kind(),
                self.workload_name(),
                self.app.name,
                self.env_name
            ),
            "Metadata": {
                "Manifest": self.raw_manifest,
                "EnvironmentVersion": self.env_version,
            },
            "Parameters": self.parameter_declarations(),
            "Resources": Value::Object(resources),
            "Outputs": self.outputs(),
        })
    }

    fn parameter_declarations(&self) -> Value {
        let mut params = Map::new();
        for p in self.parameter_list() {
            let ty = match p.parameter_key.as_str() {
                "TaskCPU" | "TaskMemory" | "TaskCount" | "ContainerPort" | "LogRetention" => {
                    "Number"
                }
                _ => "String",
            };
            params.insert(p.parameter_key, json!({ "Type": ty }));
        }
        Value::Object(params)
    }

    fn parameter_list(&self) -> Vec<Parameter> {
        let task = self.manifest.task();
        let mut params = vec![
            Parameter::new("AppName", self.app.name.clone()),
            Parameter::new("EnvName", self.env_name.clone()),
            Parameter::new("WorkloadName", self.workload_name()),
            Parameter::new("ContainerImage", self.runtime.image.to_string()),
            Parameter::new("TaskCPU", task.cpu.to_string()),
            Parameter::new("TaskMemory", task.memory.to_string()),
            Parameter::new("LogRetention", LOG_RETENTION_DAYS),
        ];
        if self.manifest.kind().is_service() {
            params.push(Parameter::new("TaskCount", task.count.to_string()));
        }
        if let Some(port) = self.container_port() {
            params.push(Parameter::new("ContainerPort", port.to_string()));
        }
        if let Some(addons) = &self.runtime.addons_template {
            params.push(Parameter::new("AddonsTemplateURL", addons.url.clone()));
        }
        if let Some(env_file) = &self.runtime.env_file {
            params.push(Parameter::new("EnvFileARN", env_file.s3_arn()));
        }
        params
    }

    fn log_group(&self) -> Value {
        json!({
            "Type": "AWS::Logs::LogGroup",
            "Properties": {
                "LogGroupName": {
                    "Fn::Join": ["", ["/launchpad/", { "Ref": "AppName" }, "-", { "Ref": "EnvName" }, "-", { "Ref": "WorkloadName" }]]
                },
                "RetentionInDays": { "Ref": "LogRetention" },
            },
        })
    }

    fn container_environment(&self) -> Vec<Value> {
        let mut env: BTreeMap<String, Value> = BTreeMap::new();
        env.insert("LAUNCHPAD_APPLICATION_NAME".into(), json!(self.app.name));
        env.insert("LAUNCHPAD_ENVIRONMENT_NAME".into(), json!(self.env_name));
        env.insert("LAUNCHPAD_SERVICE_NAME".into(), json!(self.workload_name()));
        env.insert(
            "LAUNCHPAD_SERVICE_DISCOVERY_ENDPOINT".into(),
            json!(self.runtime.service_discovery_endpoint),
        );
        if matches!(self.manifest, WorkloadManifest::WorkerService(_)) {
            env.insert("LAUNCHPAD_QUEUE_URI".into(), json!({ "Ref": "EventsQueue" }));
        }
        for output in &self.addon_outputs {
            env.insert(
                screaming_snake(output),
                json!({ "Fn::GetAtt": ["AddonsStack", format!("Outputs.{}", output)] }),
            );
        }
        for (key, value) in &self.manifest.task().variables {
            env.insert(key.clone(), json!(value));
        }
        env.into_iter()
            .map(|(name, value)| json!({ "Name": name, "Value": value }))
            .collect()
    }

    fn task_definition(&self) -> Value {
        let mut container = json!({
            "Name": self.workload_name(),
            "Image": { "Ref": "ContainerImage" },
            "Essential": true,
            "Environment": self.container_environment(),
            "LogConfiguration": {
                "LogDriver": "awslogs",
                "Options": {
                    "awslogs-region": self.runtime.region,
                    "awslogs-group": { "Ref": "LogGroup" },
                    "awslogs-stream-prefix": "launchpad",
                },
            },
        });
        if self.container_port().is_some() {
            container["PortMappings"] = json!([{ "ContainerPort": { "Ref": "ContainerPort" } }]);
        }
        if self.runtime.env_file.is_some() {
            container["EnvironmentFiles"] = json!([{ "Type": "s3", "Value": { "Ref": "EnvFileARN" } }]);
        }
        json!({
            "Type": "AWS::ECS::TaskDefinition",
            "Properties": {
                "Family": { "Fn::Join": ["-", [{ "Ref": "AppName" }, { "Ref": "EnvName" }, { "Ref": "WorkloadName" }]] },
                "RequiresCompatibilities": ["FARGATE"],
                "NetworkMode": "awsvpc",
                "Cpu": { "Ref": "TaskCPU" },
                "Memory": { "Ref": "TaskMemory" },
                "ContainerDefinitions": [container],
            },
        })
    }

    fn custom_resource_functions(&self, resources: &mut Map<String, Value>) {
        if self.runtime.custom_resources.is_empty() {
            return;
        }
        resources.insert(
            "CustomResourceRole".to_string(),
            json!({
                "Type": "AWS::IAM::Role",
                "Properties": {
                    "AssumeRolePolicyDocument": {
                        "Version": "2012-10-17",
                        "Statement": [{
                            "Effect": "Allow",
                            "Principal": { "Service": ["lambda.amazonaws.com"] },
                            "Action": ["sts:AssumeRole"],
                        }],
                    },
                    "ManagedPolicyArns": [
                        { "Fn::Sub": "arn:${AWS::Partition}:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole" }
                    ],
                },
            }),
        );
        for (name, artifact) in &self.runtime.custom_resources {
            resources.insert(
                name.clone(),
                json!({
                    "Type": "AWS::Lambda::Function",
                    "Properties": {
                        "Code": { "S3Bucket": artifact.bucket, "S3Key": artifact.key },
                        "Handler": "index.handler",
                        "Runtime": "nodejs20.x",
                        "Timeout": 600,
                        "Role": { "Fn::GetAtt": ["CustomResourceRole", "Arn"] },
                    },
                }),
            );
        }
    }

    /// Adds target groups and listener rules; returns the service's load balancer mappings.
    fn http_resources(
        &self,
        resources: &mut Map<String, Value>,
        http: &HttpConfig,
        ingress: Ingress,
    ) -> Vec<Value> {
        let mut balancers = Vec::new();
        for (idx, (_, rule)) in http.active_rules().enumerate() {
            let suffix = if idx == 0 { String::new() } else { idx.to_string() };
            let target_group = format!("TargetGroup{}", suffix);
            let port = rule
                .target_port
                .or(self.container_port())
                .unwrap_or(DEFAULT_PORT);

            resources.insert(
                target_group.clone(),
                json!({
                    "Type": "AWS::ElasticLoadBalancingV2::TargetGroup",
                    "Properties": {
                        "Port": port,
                        "Protocol": "HTTP",
                        "TargetType": "ip",
                        "VpcId": self.import("VpcId"),
                        "HealthCheckPath": rule.healthcheck.clone().unwrap_or_else(|| "/".to_string()),
                    },
                }),
            );

            let listener = self.listener_arn(ingress);
            let priority = if self.runtime.custom_resources.contains_key(RULE_PRIORITY_FUNCTION) {
                let action = format!("RulePriorityAction{}", suffix);
                resources.insert(
                    action.clone(),
                    json!({
                        "Type": "Custom::RulePriority",
                        "Properties": {
                            "ServiceToken": { "Fn::GetAtt": [RULE_PRIORITY_FUNCTION, "Arn"] },
                            "ListenerArn": listener,
                            "RulePath": rule.path.clone().unwrap_or_else(|| "/".to_string()),
                        },
                    }),
                );
                json!({ "Fn::GetAtt": [action, "Priority"] })
            } else {
                json!(50000 - idx as u64)
            };

            resources.insert(
                format!("ListenerRule{}", suffix),
                json!({
                    "Type": "AWS::ElasticLoadBalancingV2::ListenerRule",
                    "Properties": {
                        "ListenerArn": listener,
                        "Priority": priority,
                        "Conditions": rule_conditions(rule),
                        "Actions": [{ "Type": "forward", "TargetGroupArn": { "Ref": target_group } }],
                    },
                }),
            );

            balancers.push(json!({
                "ContainerName": self.workload_name(),
                "ContainerPort": port,
                "TargetGroupArn": { "Ref": target_group },
            }));
        }
        balancers
    }

    /// Listener that routing rules attach to: the imported ALB's when present,
    /// otherwise the environment's shared load balancer.
    fn listener_arn(&self, ingress: Ingress) -> Value {
        if let Some(alb) = &self.imported_alb {
            let listener = alb
                .listeners
                .iter()
                .find(|l| l.protocol == ListenerProtocol::Https)
                .or_else(|| alb.listeners.first());
            if let Some(listener) = listener {
                return json!(listener.arn.as_str());
            }
        }
        let (prefix, https) = match ingress {
            Ingress::Public => ("Public", self.public_https),
            Ingress::Private => ("Internal", self.private_https),
        };
        let protocol = if https { "HTTPS" } else { "HTTP" };
        self.import(&format!("{}{}ListenerArn", prefix, protocol))
    }

    fn network_configuration(&self) -> Value {
        let (subnets, public_ip) = match self.placement {
            Placement::Public => ("PublicSubnets", "ENABLED"),
            Placement::Private => ("PrivateSubnets", "DISABLED"),
        };
        json!({
            "AwsvpcConfiguration": {
                "AssignPublicIp": public_ip,
                "Subnets": { "Fn::Split": [",", self.import(subnets)] },
                "SecurityGroups": [self.import("EnvironmentSecurityGroup")],
            },
        })
    }

    fn service(&self, load_balancers: Vec<Value>) -> Value {
        let mut properties = json!({
            "Cluster": self.import("ClusterId"),
            "TaskDefinition": { "Ref": "TaskDefinition" },
            "DesiredCount": { "Ref": "TaskCount" },
            "LaunchType": "FARGATE",
            "DeploymentConfiguration": {
                "MinimumHealthyPercent": 100,
                "MaximumPercent": 200,
                "DeploymentCircuitBreaker": { "Enable": true, "Rollback": true },
            },
            "NetworkConfiguration": self.network_configuration(),
        });
        let depends_on: Vec<String> = (0..load_balancers.len())
            .map(|idx| {
                if idx == 0 {
                    "ListenerRule".to_string()
                } else {
                    format!("ListenerRule{}", idx)
                }
            })
            .collect();
        if !load_balancers.is_empty() {
            properties["LoadBalancers"] = Value::Array(load_balancers);
        }
        let mut service = json!({
            "Type": "AWS::ECS::Service",
            "Properties": properties,
        });
        if !depends_on.is_empty() {
            service["DependsOn"] = json!(depends_on);
        }
        service
    }

    fn queue_resources(&self, resources: &mut Map<String, Value>, worker: &WorkerServiceManifest) {
        let subscribe = worker.subscribe.clone().unwrap_or_else(|| SubscribeConfig {
            topics: Vec::new(),
            queue: Default::default(),
        });
        resources.insert(
            "EventsQueue".to_string(),
            json!({
                "Type": "AWS::SQS::Queue",
                "Properties": {
                    "MessageRetentionPeriod": subscribe.queue.retention.as_secs(),
                    "VisibilityTimeout": subscribe.queue.timeout.as_secs(),
                    "KmsMasterKeyId": "alias/aws/sqs",
                },
            }),
        );
        for topic in &subscribe.topics {
            let logical = format!("{}{}Subscription", pascal(&topic.service), pascal(&topic.name));
            resources.insert(
                logical,
                json!({
                    "Type": "AWS::SNS::Subscription",
                    "Properties": {
                        "TopicArn": self.import(&format!("{}-{}TopicArn", topic.service, topic.name)),
                        "Protocol": "sqs",
                        "Endpoint": { "Fn::GetAtt": ["EventsQueue", "Arn"] },
                        "RawMessageDelivery": true,
                    },
                }),
            );
        }
    }

    fn schedule_resources(&self, resources: &mut Map<String, Value>, job: &ScheduledJobManifest) {
        let mut task = json!({
            "Type": "Task",
            "Resource": "arn:aws:states:::ecs:runTask.sync",
            "Parameters": {
                "LaunchType": "FARGATE",
                "Cluster": format!("{}-{}-ClusterId", self.app.name, self.env_name),
                "TaskDefinition": "${TaskDefinition}",
            },
            "End": true,
        });
        if job.retries > 0 {
            task["Retry"] = json!([{
                "ErrorEquals": ["States.ALL"],
                "IntervalSeconds": 10,
                "MaxAttempts": job.retries,
                "BackoffRate": 1.5,
            }]);
        }
        let mut definition = json!({
            "Comment": format!("Run {} on a schedule", self.workload_name()),
            "StartAt": "Run",
            "States": { "Run": task },
        });
        if let Some(timeout) = job.timeout {
            definition["TimeoutSeconds"] = json!(timeout.as_secs());
        }

        resources.insert(
            "StateMachine".to_string(),
            json!({
                "Type": "AWS::StepFunctions::StateMachine",
                "Properties": {
                    "DefinitionString": {
                        "Fn::Sub": [definition.to_string(), { "TaskDefinition": { "Ref": "TaskDefinition" } }]
                    },
                    "RoleArn": self.import("StateMachineRoleArn"),
                },
            }),
        );
        resources.insert(
            "Rule".to_string(),
            json!({
                "Type": "AWS::Events::Rule",
                "Properties": {
                    "ScheduleExpression": job.on.schedule_expression(),
                    "State": "ENABLED",
                    "Targets": [{
                        "Arn": { "Ref": "StateMachine" },
                        "Id": "StateMachine",
                        "RoleArn": self.import("EventsRoleArn"),
                    }],
                },
            }),
        );
    }

    fn outputs(&self) -> Value {
        let mut outputs = json!({
            "TaskDefinitionArn": { "Value": { "Ref": "TaskDefinition" } },
        });
        if self.manifest.kind().is_service() {
            let export = format!(
                "{}-{}-{}ServiceName",
                self.app.name,
                self.env_name,
                self.manifest.name().logical_id()
            );
            outputs["ServiceName"] = json!({
                "Value": { "Fn::GetAtt": ["Service", "Name"] },
                "Export": { "Name": export },
            });
        }
        if let Some(alb) = &self.imported_alb {
            outputs["LoadBalancerDNSName"] = json!({ "Value": alb.dns_name });
        }
        outputs
    }
}

impl StackConfiguration for WorkloadStack {
    fn stack_name(&self) -> &str {
        &self.stack_name
    }

    fn document(&self) -> Result<Value, TemplateError> {
        Ok(self.render())
    }

    fn parameters(&self) -> Result<Vec<Parameter>, TemplateError> {
        Ok(self.parameter_list())
    }

    fn tags(&self) -> BTreeMap<String, String> {
        let mut tags = self.runtime.additional_tags.clone();
        tags.insert(APP_TAG.to_string(), self.app.name.clone());
        tags.insert(ENV_TAG.to_string(), self.env_name.clone());
        tags.insert(WORKLOAD_TAG.to_string(), self.workload_name().to_string());
        tags
    }
}

fn rule_conditions(rule: &RoutingRule) -> Vec<Value> {
    let path = rule.path.as_deref().unwrap_or("/").trim_end_matches('/');
    let patterns = if path.is_empty() {
        vec!["/*".to_string()]
    } else {
        vec![path.to_string(), format!("{}/*", path)]
    };
    let mut conditions = vec![json!({
        "Field": "path-pattern",
        "PathPatternConfig": { "Values": patterns },
    })];
    let hosts = rule.hostnames();
    if !hosts.is_empty() {
        conditions.push(json!({
            "Field": "host-header",
            "HostHeaderConfig": { "Values": hosts },
        }));
    }
    if !rule.allowed_source_ips.is_empty() {
        conditions.push(json!({
            "Field": "source-ip",
            "SourceIpConfig": { "Values": rule.allowed_source_ips },
        }));
    }
    conditions
}

fn pascal(s: &str) -> String {
    s.split(|c: char| c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// `TableName` -> `TABLE_NAME`.
fn screaming_snake(s: &str) -> String {
    let mut out = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(c.to_ascii_uppercase());
    }
    out
}
