// ABOUTME: Entry point for the launchpad CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use launchpad::config::WorkspaceConfig;
use launchpad::error::Result;
use launchpad::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    let result = run(cli.command, mode).await;

    if let Err(e) = result {
        Output::new(mode).error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}

async fn run(command: Commands, mode: OutputMode) -> Result<()> {
    let cwd = env::current_dir()?;
    let config = WorkspaceConfig::discover(&cwd)?;
    let output = Output::new(mode);

    match command {
        Commands::Deploy {
            name,
            env,
            force,
            disable_rollback,
            tag,
            resource_tags,
        } => {
            let args = commands::DeployArgs {
                name,
                env,
                force,
                disable_rollback,
                tag,
                resource_tags,
            };
            commands::deploy(config, args, output).await
        }
        Commands::Package {
            name,
            env,
            tag,
            output_dir,
        } => commands::package(config, name, env, tag, output_dir, output).await,
        Commands::Validate { name, env } => commands::validate(config, name, env, output).await,
    }
}
