// ABOUTME: One deployer per workload kind, each composing the shared WorkloadBase.
// ABOUTME: Variants differ in networking policy, force-update target and recommender.

mod backend;
mod job;
mod web;
mod worker;

pub use backend::BackendServiceDeployer;
pub use job::ScheduledJobDeployer;
pub use web::LoadBalancedWebServiceDeployer;
pub use worker::WorkerServiceDeployer;
