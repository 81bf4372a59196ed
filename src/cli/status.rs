//! Status command implementation.

use anyhow::Result;
use clap::Args;
use std::sync::Arc;

use crate::app::App;
use crate::config::ConfigStore;
use crate::presence::Presence;
use crate::schedule::{ScheduleTracker, DEFAULT_DUE_AFTER_DAYS};

/// Arguments for the status command
#[derive(Args)]
pub struct StatusArgs {
    /// Whole days after which a backup counts as due
    #[arg(long, default_value_t = DEFAULT_DUE_AFTER_DAYS, value_name = "DAYS")]
    pub due_after_days: i64,
}

/// Run the status command
pub async fn run(args: StatusArgs, store: Arc<ConfigStore>) -> Result<()> {
    let (app, warning) = App::load(store, Presence::default());
    let app = app.with_tracker(ScheduleTracker::new().with_due_after_days(args.due_after_days));
    if let Some(warning) = warning {
        eprintln!("Warning: {}", warning);
    }

    let config = app.state().snapshot();
    println!("Config file:  {}", app.store().path().display());
    println!("Folder pairs: {}", config.pairs.len());
    println!("Last backup:  {}", config.schedule.describe());
    println!("Backup is {}", app.due_state());

    Ok(())
}
