use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use gauge_core::EngineConfig;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration (file values over defaults)
    Show,
    /// Show the configuration file path
    Path,
}

pub fn run(args: ConfigArgs, config: &EngineConfig, explicit: Option<&Path>) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(config),
        ConfigCommands::Path => show_path(explicit),
    }
}

fn show_config(config: &EngineConfig) -> Result<()> {
    println!("{}", config.to_toml_string()?);
    Ok(())
}

fn show_path(explicit: Option<&Path>) -> Result<()> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(EngineConfig::default_path);
    match path {
        Some(path) => {
            let marker = if path.exists() { "" } else { " (not found, defaults in use)" };
            println!("Config: {}{}", path.display(), marker);
        }
        None => println!("Config: no platform config directory, defaults in use"),
    }
    Ok(())
}
