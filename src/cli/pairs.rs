//! Pairs command: add, remove and list folder pairs.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::app::App;
use crate::config::ConfigStore;
use crate::presence::Presence;

/// Arguments for the pairs command
#[derive(Args)]
pub struct PairsArgs {
    #[command(subcommand)]
    pub command: PairsCommand,
}

#[derive(Subcommand)]
pub enum PairsCommand {
    /// Append a source -> destination pair
    Add {
        /// Folder to back up
        source: PathBuf,
        /// Folder receiving the copies
        destination: PathBuf,
    },
    /// Remove pairs by their position in `pairs list`
    Remove {
        #[arg(required = true)]
        indices: Vec<usize>,
    },
    /// Show the configured pairs in sync order
    List,
}

/// Run the pairs command
pub async fn run(args: PairsArgs, store: Arc<ConfigStore>) -> Result<()> {
    let (app, warning) = App::load(store, Presence::default());
    if let Some(warning) = warning {
        eprintln!("Warning: {}", warning);
    }

    match args.command {
        PairsCommand::Add {
            source,
            destination,
        } => {
            let pair = app.add_pair(source, destination)?;
            app.save().context("Failed to save folder pairs")?;
            println!(
                "Added: {} -> {}",
                pair.source.display(),
                pair.destination.display()
            );
        }
        PairsCommand::Remove { indices } => {
            let removed = app.remove_pairs(&indices);
            if removed.is_empty() {
                println!("No item selected to remove.");
                return Ok(());
            }
            app.save().context("Failed to save folder pairs")?;
            for pair in removed {
                println!(
                    "Removed: {} -> {}",
                    pair.source.display(),
                    pair.destination.display()
                );
            }
        }
        PairsCommand::List => {
            let pairs = app.state().pairs();
            if pairs.is_empty() {
                println!("No folder pairs configured.");
            }
            for (index, pair) in pairs.iter().enumerate() {
                println!(
                    "{:>3}  {} -> {}",
                    index,
                    pair.source.display(),
                    pair.destination.display()
                );
            }
        }
    }

    Ok(())
}
