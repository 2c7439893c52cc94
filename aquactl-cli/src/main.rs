//! aquactl
//!
//! Command-line utilities for the Aqua Security platform.
//!
//! # Usage
//!
//! ```bash
//! # Create a credential profile interactively
//! aquactl setup
//!
//! # Preview a cleanup of stale, idle images
//! aquactl images cleanup --days 120
//!
//! # Actually delete them
//! aquactl images cleanup --days 120 --apply
//! ```

mod cli;
mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // -d surfaces the transport request/response lines; -v keeps human
    // progress on stderr without drowning it in wire traces.
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Setup => commands::setup::run(&cli).await,
        Commands::Profile { command } => commands::profile::run(&cli, command),
        Commands::Images { command } => commands::images::run(&cli, command).await,
        Commands::Repos { command } => commands::repos::run(&cli, command).await,
        Commands::Licenses { command } => commands::licenses::run(&cli, command).await,
        Commands::Enforcers { command } => commands::enforcers::run(&cli, command).await,
        Commands::Vms { command } => commands::vms::run(&cli, command).await,
    }
}
