// ABOUTME: Command module aggregator for the launchpad CLI.
// ABOUTME: Re-exports deploy, package and validate command handlers.

mod deploy;
mod package;
mod session;
mod validate;

pub use deploy::{DeployArgs, deploy};
pub use package::package;
pub use validate::validate;
