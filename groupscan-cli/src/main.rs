//! groupscan -- aggregate CI vulnerability reports across a GitLab group.

mod cli;
mod commands;
mod error;
mod output;

use anyhow::Context;
use clap::Parser;

use groupscan_core::config::{GeneralConfig, GroupScanConfig};
use groupscan_core::logging::init_tracing;
use groupscan_core::metrics::describe_metrics;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(2);
    }
    describe_metrics();

    tracing::debug!(config = %cli.config.display(), "groupscan starting");

    let writer = OutputWriter::new(cli.output);
    let result = match cli.command {
        Commands::Scan(args) => commands::scan::execute(args, &cli.config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

/// Logging comes from `[general]`; a broken config file still gets default
/// logging so the command itself can report the problem.
async fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let mut general = GroupScanConfig::load_or_default(&cli.config)
        .await
        .map(|config| config.general)
        .unwrap_or_else(|_| GeneralConfig::default());
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    init_tracing(&general).context("failed to initialize logging")
}
