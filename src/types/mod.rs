// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Phantom-typed ARNs keep load balancer, listener and certificate IDs apart.

mod id;
mod image_ref;
mod workload_name;

pub use id::{Arn, CertificateArn, ListenerArn, LoadBalancerArn, StackId};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use workload_name::{WorkloadName, WorkloadNameError};
