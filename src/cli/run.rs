//! Run command: back up every configured pair now.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::sync::Arc;

use crate::app::App;
use crate::config::ConfigStore;
use crate::engine::{event_channel, CopyFailurePolicy, SyncEngine};
use crate::presence::Presence;
use crate::scanner::Scanner;

/// Arguments for the run command
#[derive(Args)]
pub struct RunArgs {
    /// Keep going when a file cannot be copied instead of aborting
    #[arg(long)]
    pub skip_failed: bool,

    /// Follow symbolic links inside source folders
    #[arg(long)]
    pub follow_symlinks: bool,
}

/// Run the backup command
pub async fn run(args: RunArgs, store: Arc<ConfigStore>) -> Result<()> {
    let presence = Presence::default();
    let (app, warning) = App::load(Arc::clone(&store), presence.clone());
    if let Some(warning) = warning {
        eprintln!("Warning: {}", warning);
    }

    if app.state().pairs().is_empty() {
        println!("No folder pairs configured. Add one with `backuper pairs add <SOURCE> <DESTINATION>`.");
        return Ok(());
    }

    let policy = if args.skip_failed {
        CopyFailurePolicy::SkipAndContinue
    } else {
        CopyFailurePolicy::Abort
    };
    let engine = SyncEngine::new(store)
        .with_scanner(Scanner::new().with_follow_symlinks(args.follow_symlinks))
        .with_copy_failure_policy(policy);
    let app = app.with_engine(engine);

    let (tx, rx) = event_channel();
    let handle = app.start_backup(tx)?;
    let report = super::render_events(&app, &presence, rx).await;

    handle.await.context("Backup worker stopped unexpectedly")??;

    match report {
        Some(report) => {
            println!("{}", report.summary());
            for failed in &report.failed_files {
                eprintln!("  not copied: {} ({})", failed.path.display(), failed.error);
            }
            if report.persist_error.is_some() {
                bail!("Backup finished but the configuration could not be saved");
            }
            Ok(())
        }
        None => bail!("Backup ended without a report"),
    }
}
