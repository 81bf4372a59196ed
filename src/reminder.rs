//! Periodic "backup is due" reminder.
//!
//! On every tick the persisted backup date is checked. When a backup is due
//! the user is asked; "yes" starts a run right away, "no" re-saves the
//! current pairs with the date unchanged so the question comes back on the
//! next tick, "cancel" does nothing.

use crate::app::AppState;
use crate::config::{Config, ConfigStore};
use crate::engine::{EventSender, RunReport, SyncEngine};
use crate::presence::Presence;
use crate::schedule::{ScheduleState, ScheduleTracker, DEFAULT_CHECK_INTERVAL};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Answer to the reminder prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Yes,
    No,
    Cancel,
}

/// Asks the user whether to back up now. Called from a blocking worker, so
/// implementations may block while waiting for an answer.
pub trait Prompter: Send + Sync {
    fn confirm_backup(&self, schedule: &ScheduleState, due_after_days: i64) -> Decision;
}

/// What a single check did
#[derive(Debug)]
pub enum CheckOutcome {
    NotDue,
    /// Due, but a run is already active
    Busy,
    /// User declined; pairs re-saved with the old date
    Deferred,
    Dismissed,
    Started(JoinHandle<Result<RunReport>>),
}

pub struct Reminder<P> {
    tracker: ScheduleTracker,
    store: Arc<ConfigStore>,
    engine: SyncEngine,
    state: AppState,
    presence: Presence,
    prompter: P,
    interval: Duration,
}

impl<P: Prompter + 'static> Reminder<P> {
    pub fn new(
        store: Arc<ConfigStore>,
        engine: SyncEngine,
        state: AppState,
        presence: Presence,
        prompter: P,
    ) -> Self {
        Self {
            tracker: ScheduleTracker::new(),
            store,
            engine,
            state,
            presence,
            prompter,
            interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    pub fn with_tracker(mut self, tracker: ScheduleTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Evaluate the schedule once and act on the user's answer.
    ///
    /// Must be called from within a tokio runtime when the answer may be
    /// "yes", since the run is spawned on a blocking worker.
    pub fn check_once(&self, events: &EventSender) -> Result<CheckOutcome> {
        let loaded = self.store.load();
        if let Some(warning) = &loaded.warning {
            warn!("{}", warning);
        }
        let persisted = loaded.config.schedule;

        if !self.tracker.is_due(persisted.last_backup) {
            debug!("Backup not due (last: {})", persisted.describe());
            return Ok(CheckOutcome::NotDue);
        }

        if self.engine.is_running() {
            debug!("Backup due but a run is already active");
            return Ok(CheckOutcome::Busy);
        }

        match self
            .prompter
            .confirm_backup(&persisted, self.tracker.due_after_days())
        {
            Decision::Yes => {
                let handle = match self.engine.spawn(self.state.pairs(), persisted, events.clone()) {
                    Ok(handle) => handle,
                    Err(Error::RunInProgress) => return Ok(CheckOutcome::Busy),
                    Err(e) => return Err(e),
                };
                if self.presence.show() {
                    info!("Showing window for reminder-triggered backup");
                }
                Ok(CheckOutcome::Started(handle))
            }
            Decision::No => {
                let config = Config::new(self.state.pairs(), persisted);
                self.store.save(&config)?;
                info!("Backup deferred, will ask again on the next check");
                Ok(CheckOutcome::Deferred)
            }
            Decision::Cancel => Ok(CheckOutcome::Dismissed),
        }
    }

    /// Check on every tick until `quit` flips to true or its sender is gone.
    /// The first check happens immediately.
    pub async fn run(self: Arc<Self>, events: EventSender, mut quit: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Checking for due backups every {:?}", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let reminder = Arc::clone(&self);
                    let events = events.clone();
                    match tokio::task::spawn_blocking(move || reminder.check_once(&events)).await {
                        Ok(Ok(outcome)) => debug!("Reminder check: {:?}", outcome),
                        Ok(Err(e)) => warn!("Reminder check failed: {}", e),
                        Err(e) => warn!("Reminder task failed: {}", e),
                    }
                }
                changed = quit.changed() => {
                    let stop = changed.is_err() || *quit.borrow();
                    if stop {
                        break;
                    }
                }
            }
        }

        debug!("Reminder loop stopped");
    }
}
