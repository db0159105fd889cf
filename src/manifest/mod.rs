// ABOUTME: Typed workload manifests, one variant per workload kind.
// ABOUTME: Deserialized from YAML with the `type` field selecting the variant.

mod http;
mod image;

pub use http::{Alias, HttpConfig, RoutingRule, RuleLocation};
pub use image::{BuildConfig, ImageConfig, ImageSource};

use crate::types::WorkloadName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// The kinds of workload the orchestrator knows how to deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkloadKind {
    #[serde(rename = "Backend Service")]
    BackendService,
    #[serde(rename = "Load Balanced Web Service")]
    LoadBalancedWebService,
    #[serde(rename = "Worker Service")]
    WorkerService,
    #[serde(rename = "Scheduled Job")]
    ScheduledJob,
}

/// Service family whose regional availability gates a workload kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceFamily {
    /// Container orchestration (services).
    Ecs,
    /// State machines driving scheduled jobs.
    StepFunctions,
}

impl ServiceFamily {
    /// Endpoint identifier used by partition metadata.
    pub fn endpoints_id(&self) -> &'static str {
        match self {
            ServiceFamily::Ecs => "ecs",
            ServiceFamily::StepFunctions => "states",
        }
    }
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 4] = [
        WorkloadKind::BackendService,
        WorkloadKind::LoadBalancedWebService,
        WorkloadKind::WorkerService,
        WorkloadKind::ScheduledJob,
    ];

    /// Value of the manifest `type` field.
    pub fn manifest_type(&self) -> &'static str {
        match self {
            WorkloadKind::BackendService => "Backend Service",
            WorkloadKind::LoadBalancedWebService => "Load Balanced Web Service",
            WorkloadKind::WorkerService => "Worker Service",
            WorkloadKind::ScheduledJob => "Scheduled Job",
        }
    }

    /// Kebab-case form used in file names and storage keys.
    pub fn slug(&self) -> &'static str {
        match self {
            WorkloadKind::BackendService => "backend-service",
            WorkloadKind::LoadBalancedWebService => "lb-web-service",
            WorkloadKind::WorkerService => "worker-service",
            WorkloadKind::ScheduledJob => "scheduled-job",
        }
    }

    pub fn service_family(&self) -> ServiceFamily {
        match self {
            WorkloadKind::ScheduledJob => ServiceFamily::StepFunctions,
            _ => ServiceFamily::Ecs,
        }
    }

    /// Whether the workload runs as a long-lived ECS service.
    pub fn is_service(&self) -> bool {
        !matches!(self, WorkloadKind::ScheduledJob)
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.manifest_type())
    }
}

/// Settings shared by every workload kind.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub image: ImageConfig,

    #[serde(default = "default_cpu")]
    pub cpu: u32,

    #[serde(default = "default_memory")]
    pub memory: u32,

    #[serde(default = "default_count")]
    pub count: u32,

    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Path to a `.env` file, relative to the workspace root.
    #[serde(default)]
    pub env_file: Option<PathBuf>,
}

fn default_cpu() -> u32 {
    256
}

fn default_memory() -> u32 {
    512
}

fn default_count() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendServiceManifest {
    pub name: WorkloadName,

    #[serde(flatten)]
    pub task: TaskConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadBalancedWebServiceManifest {
    pub name: WorkloadName,

    #[serde(flatten)]
    pub task: TaskConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerServiceManifest {
    pub name: WorkloadName,

    #[serde(flatten)]
    pub task: TaskConfig,

    #[serde(default)]
    pub subscribe: Option<SubscribeConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeConfig {
    #[serde(default)]
    pub topics: Vec<TopicSubscription>,

    #[serde(default)]
    pub queue: QueueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicSubscription {
    pub name: String,
    pub service: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_retention", with = "humantime_serde")]
    pub retention: Duration,

    #[serde(default = "default_visibility_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
            timeout: default_visibility_timeout(),
        }
    }
}

fn default_retention() -> Duration {
    Duration::from_secs(4 * 24 * 60 * 60)
}

fn default_visibility_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledJobManifest {
    pub name: WorkloadName,

    #[serde(flatten)]
    pub task: TaskConfig,

    pub on: JobTrigger,

    #[serde(default)]
    pub retries: u32,

    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobTrigger {
    pub schedule: String,
}

impl JobTrigger {
    /// Convert the manifest schedule to an EventBridge schedule expression.
    pub fn schedule_expression(&self) -> String {
        let schedule = self.schedule.trim();
        match schedule {
            "@hourly" => "rate(1 hour)".to_string(),
            "@daily" | "@midnight" => "cron(0 0 * * ? *)".to_string(),
            "@weekly" => "cron(0 0 ? * 1 *)".to_string(),
            "@monthly" => "cron(0 0 1 * ? *)".to_string(),
            "@yearly" | "@annually" => "cron(0 0 1 1 ? *)".to_string(),
            s if s.starts_with("@every ") => {
                let every = s.trim_start_matches("@every ").trim();
                match humantime_serde::re::humantime::parse_duration(every) {
                    Ok(d) if d.as_secs() >= 60 && d.as_secs() % 60 == 0 => {
                        let minutes = d.as_secs() / 60;
                        if minutes == 1 {
                            "rate(1 minute)".to_string()
                        } else {
                            format!("rate({} minutes)", minutes)
                        }
                    }
                    _ => format!("rate({})", every),
                }
            }
            s if s.starts_with("rate(") || s.starts_with("cron(") => s.to_string(),
            s => {
                let mut fields: Vec<&str> = s.split_whitespace().collect();
                if fields.len() == 5 {
                    // EventBridge needs "?" in exactly one of day-of-month / day-of-week.
                    if fields[4] == "*" {
                        fields[4] = "?";
                    } else {
                        fields[2] = "?";
                    }
                    fields.push("*");
                }
                format!("cron({})", fields.join(" "))
            }
        }
    }
}

/// A workload manifest, tagged by kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum WorkloadManifest {
    #[serde(rename = "Backend Service")]
    BackendService(BackendServiceManifest),

    #[serde(rename = "Load Balanced Web Service")]
    LoadBalancedWebService(LoadBalancedWebServiceManifest),

    #[serde(rename = "Worker Service")]
    WorkerService(WorkerServiceManifest),

    #[serde(rename = "Scheduled Job")]
    ScheduledJob(ScheduledJobManifest),
}

impl WorkloadManifest {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn kind(&self) -> WorkloadKind {
        match self {
            WorkloadManifest::BackendService(_) => WorkloadKind::BackendService,
            WorkloadManifest::LoadBalancedWebService(_) => WorkloadKind::LoadBalancedWebService,
            WorkloadManifest::WorkerService(_) => WorkloadKind::WorkerService,
            WorkloadManifest::ScheduledJob(_) => WorkloadKind::ScheduledJob,
        }
    }

    pub fn name(&self) -> &WorkloadName {
        match self {
            WorkloadManifest::BackendService(m) => &m.name,
            WorkloadManifest::LoadBalancedWebService(m) => &m.name,
            WorkloadManifest::WorkerService(m) => &m.name,
            WorkloadManifest::ScheduledJob(m) => &m.name,
        }
    }

    pub fn task(&self) -> &TaskConfig {
        match self {
            WorkloadManifest::BackendService(m) => &m.task,
            WorkloadManifest::LoadBalancedWebService(m) => &m.task,
            WorkloadManifest::WorkerService(m) => &m.task,
            WorkloadManifest::ScheduledJob(m) => &m.task,
        }
    }

    /// The HTTP block, for kinds that can be fronted by a load balancer.
    pub fn http(&self) -> Option<&HttpConfig> {
        match self {
            WorkloadManifest::BackendService(m) => Some(&m.http),
            WorkloadManifest::LoadBalancedWebService(m) => Some(&m.http),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_service() {
        let yaml = r#"
type: Backend Service
name: api
image:
  location: nginx:1.25
  port: 8080
http:
  path: /api
  alias: api.example.com
"#;
        let manifest = WorkloadManifest::from_yaml(yaml).unwrap();
        assert_eq!(manifest.kind(), WorkloadKind::BackendService);
        assert_eq!(manifest.name().as_str(), "api");
        assert_eq!(manifest.task().cpu, 256);
        let http = manifest.http().unwrap();
        assert_eq!(http.main.path.as_deref(), Some("/api"));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let yaml = r#"
type: Static Site
name: site
image:
  location: nginx
"#;
        assert!(WorkloadManifest::from_yaml(yaml).is_err());
    }

    #[test]
    fn schedule_shortcuts() {
        let trigger = |s: &str| JobTrigger {
            schedule: s.to_string(),
        };
        assert_eq!(trigger("@hourly").schedule_expression(), "rate(1 hour)");
        assert_eq!(trigger("@every 5m").schedule_expression(), "rate(5 minutes)");
        assert_eq!(
            trigger("rate(2 hours)").schedule_expression(),
            "rate(2 hours)"
        );
        assert_eq!(
            trigger("0 9 * * MON-FRI").schedule_expression(),
            "cron(0 9 ? * MON-FRI *)"
        );
    }

    #[test]
    fn jobs_are_not_services() {
        assert!(!WorkloadKind::ScheduledJob.is_service());
        assert_eq!(
            WorkloadKind::ScheduledJob.service_family().endpoints_id(),
            "states"
        );
    }
}
