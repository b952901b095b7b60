mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::Command;
use crate::config::FitlogConfig;

#[derive(Parser)]
#[command(name = "fitlog")]
#[command(author, version, about = "Workout, meal and progress journal with photo attachments")]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (default: config/fitlog, or $FITLOG_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = FitlogConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    commands::run(cli.command, config).await
}
