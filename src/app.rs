//! Application root: owns the in-memory config and wires the engine, the
//! store and the window presence together.

use crate::config::{Config, ConfigStore};
use crate::engine::{EventSender, RunReport, SyncEngine, SyncEvent};
use crate::pairs::{FolderPair, PairSet};
use crate::presence::Presence;
use crate::schedule::{DueState, ScheduleState, ScheduleTracker};
use crate::Result;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// In-memory config shared between the front end and background tasks
#[derive(Debug, Clone, Default)]
pub struct AppState {
    config: Arc<Mutex<Config>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Config> {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the whole config
    pub fn snapshot(&self) -> Config {
        self.lock().clone()
    }

    pub fn pairs(&self) -> PairSet {
        self.lock().pairs.clone()
    }

    pub fn schedule(&self) -> ScheduleState {
        self.lock().schedule
    }

    pub fn set_schedule(&self, schedule: ScheduleState) {
        self.lock().schedule = schedule;
    }

    pub fn update_pairs<F, T>(&self, update: F) -> T
    where
        F: FnOnce(&mut PairSet) -> T,
    {
        update(&mut self.lock().pairs)
    }
}

pub struct App {
    state: AppState,
    store: Arc<ConfigStore>,
    engine: SyncEngine,
    presence: Presence,
    tracker: ScheduleTracker,
}

impl App {
    /// Load the config from `store`. Returns the app and, when the stored
    /// file was unusable, a warning to show the user.
    pub fn load(store: Arc<ConfigStore>, presence: Presence) -> (Self, Option<String>) {
        let outcome = store.load();
        let app = Self {
            state: AppState::new(outcome.config),
            engine: SyncEngine::new(Arc::clone(&store)),
            store,
            presence,
            tracker: ScheduleTracker::new(),
        };
        (app, outcome.warning)
    }

    pub fn with_engine(mut self, engine: SyncEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_tracker(mut self, tracker: ScheduleTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    pub fn tracker(&self) -> ScheduleTracker {
        self.tracker
    }

    /// Validate, resolve and append a pair
    pub fn add_pair<S: Into<PathBuf>, D: Into<PathBuf>>(
        &self,
        source: S,
        destination: D,
    ) -> Result<FolderPair> {
        let pair = FolderPair::new(source, destination)?.resolved()?;
        self.state.update_pairs(|pairs| pairs.push(pair.clone()));
        info!(
            "Added pair {} -> {}",
            pair.source.display(),
            pair.destination.display()
        );
        Ok(pair)
    }

    /// Remove the selected pairs; nothing matching is only a warning
    pub fn remove_pairs(&self, indices: &[usize]) -> Vec<FolderPair> {
        let removed = self.state.update_pairs(|pairs| pairs.remove_indices(indices));
        if removed.is_empty() {
            warn!("No item selected to remove.");
        }
        removed
    }

    /// Persist the in-memory config as is
    pub fn save(&self) -> Result<()> {
        self.store.save(&self.state.snapshot())
    }

    pub fn due_state(&self) -> DueState {
        self.tracker.state(self.state.schedule().last_backup)
    }

    /// Start a run over the current pairs on a worker thread
    pub fn start_backup(&self, events: EventSender) -> Result<JoinHandle<Result<RunReport>>> {
        self.engine
            .spawn(self.state.pairs(), self.state.schedule(), events)
    }

    /// Fold a run event into the in-memory state
    pub fn apply_event(&self, event: &SyncEvent) {
        if let SyncEvent::Finished(report) = event {
            self.state.set_schedule(report.schedule);
        }
    }
}
