//! Command-line front end.
//!
//! Stands in for the desktop window: it edits the pair list, starts runs,
//! renders progress and answers the periodic reminder from the terminal.

use clap::{ArgAction, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::app::App;
use crate::engine::{EventReceiver, RunReport, SyncEvent};
use crate::presence::Presence;

pub mod pairs;
pub mod run;
pub mod status;
pub mod watch;

/// backuper - incremental one-way folder backup
#[derive(Parser)]
#[command(name = "backuper")]
#[command(about = "Incremental one-way folder backup with due-date reminders")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Edit the list of folder pairs
    Pairs(pairs::PairsArgs),
    /// Back up every pair now
    Run(run::RunArgs),
    /// Show the last backup date and whether a backup is due
    Status(status::StatusArgs),
    /// Stay running and ask for a backup whenever one is due
    Watch(watch::WatchArgs),
}

/// Minimum time between two redraws of the progress line
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Print run events until the channel closes.
///
/// Progress lines are coalesced; the last one is always drawn. Nothing is
/// printed while the window is hidden. Returns the report of a finished run.
pub async fn render_events(
    app: &App,
    presence: &Presence,
    mut events: EventReceiver,
) -> Option<RunReport> {
    let mut report = None;
    let mut last_draw: Option<Instant> = None;
    let mut progress_open = false;

    while let Some(event) = events.recv().await {
        app.apply_event(&event);
        let visible = presence.is_visible();

        match event {
            SyncEvent::Started { total_files, .. } => {
                if visible {
                    println!("Found {} file(s) to check", total_files);
                }
            }
            SyncEvent::Message(message) => {
                if visible {
                    if progress_open {
                        println!();
                        progress_open = false;
                    }
                    println!("{}", message);
                }
            }
            SyncEvent::Progress(progress) => {
                let is_last = progress.processed_files >= progress.total_files;
                let due = last_draw.map_or(true, |t| t.elapsed() >= REDRAW_INTERVAL);
                if visible && (is_last || due) {
                    print!("\r{}", progress.status_line());
                    let _ = std::io::stdout().flush();
                    progress_open = true;
                    last_draw = Some(Instant::now());
                }
            }
            SyncEvent::Finished(finished) => {
                report = Some(finished);
            }
            SyncEvent::Failed { .. } => {}
        }
    }

    if progress_open {
        println!();
    }
    report
}
