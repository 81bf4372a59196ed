//! Watch command: stay resident and ask for a backup whenever one is due.

use anyhow::Result;
use clap::Args;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::app::App;
use crate::config::ConfigStore;
use crate::engine::event_channel;
use crate::presence::{Presence, TrayCommand, WindowState};
use crate::reminder::{Decision, Prompter, Reminder};
use crate::schedule::{ScheduleState, ScheduleTracker, DEFAULT_DUE_AFTER_DAYS};

/// Arguments for the watch command
#[derive(Args)]
pub struct WatchArgs {
    /// Seconds between two due checks
    #[arg(long, default_value_t = 3600, value_name = "SECS")]
    pub interval_secs: u64,

    /// Whole days after which a backup counts as due
    #[arg(long, default_value_t = DEFAULT_DUE_AFTER_DAYS, value_name = "DAYS")]
    pub due_after_days: i64,

    /// Start with progress output shown instead of hidden until a backup starts
    #[arg(long)]
    pub show: bool,

    /// Write logs to this file instead of the terminal
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Yes/no/cancel prompt on the terminal
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm_backup(&self, schedule: &ScheduleState, due_after_days: i64) -> Decision {
        let mut stdout = io::stdout();
        let _ = write!(
            stdout,
            "It's been more than {} days since your last backup ({}). Would you like to perform a backup now? [y/n/c] ",
            due_after_days,
            schedule.describe()
        );
        let _ = stdout.flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => Decision::Cancel,
            Ok(_) => parse_answer(&answer),
        }
    }
}

fn parse_answer(answer: &str) -> Decision {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Decision::Yes,
        "n" | "no" => Decision::No,
        _ => Decision::Cancel,
    }
}

/// Run the watch command
pub async fn run(args: WatchArgs, store: Arc<ConfigStore>) -> Result<()> {
    let initial = if args.show {
        WindowState::Visible
    } else {
        WindowState::Hidden
    };
    let presence = Presence::new(initial);
    let tracker = ScheduleTracker::new().with_due_after_days(args.due_after_days);

    let (app, warning) = App::load(Arc::clone(&store), presence.clone());
    let app = Arc::new(app.with_tracker(tracker));
    if let Some(warning) = warning {
        eprintln!("Warning: {}", warning);
    }

    let reminder = Arc::new(
        Reminder::new(
            store,
            app.engine().clone(),
            app.state().clone(),
            presence.clone(),
            TerminalPrompter,
        )
        .with_tracker(tracker)
        .with_interval(Duration::from_secs(args.interval_secs.max(1))),
    );

    let (tx, rx) = event_channel();
    let renderer = {
        let app = Arc::clone(&app);
        let presence = presence.clone();
        tokio::spawn(async move { super::render_events(&app, &presence, rx).await })
    };

    let ctrl_c = {
        let presence = presence.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, shutting down");
                presence.handle(TrayCommand::Quit);
            }
        })
    };

    reminder.run(tx, presence.subscribe_quit()).await;
    ctrl_c.abort();

    // Running backups hold their own sender; wait for them to finish
    let _ = renderer.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("y\n"), Decision::Yes);
        assert_eq!(parse_answer(" YES "), Decision::Yes);
        assert_eq!(parse_answer("n"), Decision::No);
        assert_eq!(parse_answer("No\r\n"), Decision::No);
        assert_eq!(parse_answer("c"), Decision::Cancel);
        assert_eq!(parse_answer(""), Decision::Cancel);
    }
}
