//! backuper - incremental one-way folder backup
//!
//! Main binary entry point for the command-line interface.

use anyhow::{Context, Result};
use backuper::cli::{Cli, Commands};
use backuper::config::ConfigStore;
use backuper::logging;
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Watch(args) => args.log_file.clone(),
        _ => None,
    };
    match log_file {
        Some(path) => logging::init_file_logging(&path, cli.verbose)?,
        None => logging::init_logging(cli.verbose)?,
    }

    let store = Arc::new(
        ConfigStore::locate(cli.config.as_deref()).context("Failed to locate config file")?,
    );

    match cli.command {
        Commands::Pairs(args) => backuper::cli::pairs::run(args, store).await,
        Commands::Run(args) => backuper::cli::run::run(args, store).await,
        Commands::Status(args) => backuper::cli::status::run(args, store).await,
        Commands::Watch(args) => backuper::cli::watch::run(args, store).await,
    }
}
