//! Command-line client for schema migrations and project updates.
//!
//! `migrate` compares the deployed database schema with the local DSL and
//! writes a SQL migration script. `update` pushes the local DSL to the remote
//! project after an interactive diff and regenerates source files.
mod auth;
mod backend;
mod baseline;
mod cli;
mod config;
mod error;
mod migration;
mod paths;
mod prompt;
mod run_context;
mod schema;
mod staging;
mod temp_path;
mod update;
mod workflow;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SCHEMACTL_LOG";

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let args = cli::RootArgs::parse();
    init_logging(args.global.verbose);
    match &args.command {
        cli::Command::Migrate(_) => workflow::run_migrate(&args),
        cli::Command::Update(_) => workflow::run_update(&args),
    }
}
