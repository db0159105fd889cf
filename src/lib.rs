// ABOUTME: Library root for launchpad - exposes the deployer, collaborators and config.
// ABOUTME: The main binary is in main.rs.

pub mod clients;
pub mod config;
pub mod deploy;
pub mod error;
pub mod manifest;
pub mod output;
pub mod stack;
pub mod types;
