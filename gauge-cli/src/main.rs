use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gauge_core::EngineConfig;

mod commands;
mod input;

#[derive(Parser)]
#[command(name = "gauge", about = "Competency assessment engine tooling")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a question set from a blueprint
    Assemble(commands::assemble::AssembleArgs),
    /// Compute item statistics from recorded responses
    ItemStats(commands::item_stats::ItemStatsArgs),
    /// Run Mantel-Haenszel DIF analysis
    Dif(commands::dif::DifArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = EngineConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Assemble(args) => commands::assemble::run(args, &config).await,
        Commands::ItemStats(args) => commands::item_stats::run(args, &config),
        Commands::Dif(args) => commands::dif::run(args, &config),
        Commands::Config(args) => commands::config::run(args, &config, cli.config.as_deref()),
    }
}
