// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines the deploy, package and validate subcommands and global output flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "launchpad")]
#[command(about = "Deploy services and jobs from workload manifests")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate, upload artifacts and deploy a workload to an environment
    Deploy {
        /// Workload name
        #[arg(short, long)]
        name: String,

        /// Target environment
        #[arg(short, long)]
        env: String,

        /// Roll new tasks even when the stack has no changes
        #[arg(long)]
        force: bool,

        /// Keep partially created resources when the deploy fails
        #[arg(long)]
        disable_rollback: bool,

        /// Image tag for built images
        #[arg(long)]
        tag: Option<String>,

        /// Extra resource tags as key=value
        #[arg(long = "resource-tag", value_parser = parse_key_val)]
        resource_tags: Vec<(String, String)>,
    },

    /// Render the stack template and parameters without deploying
    Package {
        /// Workload name
        #[arg(short, long)]
        name: String,

        /// Target environment
        #[arg(short, long)]
        env: String,

        /// Image tag for built images
        #[arg(long)]
        tag: Option<String>,

        /// Write files here instead of printing the template
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Check networking constraints for one or every workload
    Validate {
        /// Workload name; all workloads when omitted
        #[arg(short, long)]
        name: Option<String>,

        /// Target environment
        #[arg(short, long)]
        env: String,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {s}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {s}"));
    }
    Ok((key.to_string(), value.to_string()))
}
