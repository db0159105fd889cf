// ABOUTME: Sealed trait pattern for the variant deployer trait.
// ABOUTME: Only the deployers in this crate can implement WorkloadDeployer.

/// Sealed trait to prevent external implementations.
pub trait Sealed {}
