//! Sync engine: runs an incremental one-way copy over every folder pair.
//!
//! A run counts every file up front, then walks the pairs in order, copying
//! what the [`Scanner`] marks as stale and publishing a [`SyncEvent`] after
//! each file. Successful runs persist the pairs together with the new backup
//! date; failed runs leave the stored date untouched.

use crate::config::{Config, ConfigStore};
use crate::pairs::PairSet;
use crate::scanner::{FileEntry, Scanner};
use crate::schedule::{format_timestamp, now_timestamp, ScheduleState};
use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, FileTimes};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, span, warn, Level};
use uuid::Uuid;

/// Message shown when a run starts
pub const STARTING_MESSAGE: &str = "Starting backup...";

/// Message shown when a run finishes cleanly
pub const SUCCESS_MESSAGE: &str = "Backup completed successfully!";

/// Live counters for a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub processed_files: u64,
    pub total_files: u64,
    pub elapsed_seconds: f64,
    pub estimated_remaining_seconds: f64,
    pub last_message: String,
}

impl SyncProgress {
    /// Completed share in percent, 0 when nothing is known yet
    pub fn percent(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            self.processed_files as f64 / self.total_files as f64 * 100.0
        }
    }

    /// One-line status as shown under the progress bar
    pub fn status_line(&self) -> String {
        format!(
            "Progress: {}/{} files | Estimated time left: {:.1}s",
            self.processed_files, self.total_files, self.estimated_remaining_seconds
        )
    }
}

/// Events published by a run, in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncEvent {
    /// The pre-pass finished and copying is about to start
    Started { run_id: Uuid, total_files: u64 },
    /// Human-readable status line
    Message(String),
    /// Sent after every processed file
    Progress(SyncProgress),
    /// Every pair was processed
    Finished(RunReport),
    /// The run was aborted
    Failed { run_id: Uuid, error: String },
}

/// Channel the engine publishes on. Unbounded so the worker never waits on
/// a slow consumer.
pub type EventSender = mpsc::UnboundedSender<SyncEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SyncEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// What to do when a single file cannot be copied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyFailurePolicy {
    /// Abort the run and keep the previous backup date
    #[default]
    Abort,
    /// Record the failure, count the file as processed and carry on
    SkipAndContinue,
}

/// A file that could not be copied under [`CopyFailurePolicy::SkipAndContinue`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub finished_at: NaiveDateTime,
    pub total_files: u64,
    pub processed_files: u64,
    pub copied_files: u64,
    pub failed_files: Vec<FailedFile>,
    pub elapsed: Duration,
    /// Schedule state after the run, as written to the store
    pub schedule: ScheduleState,
    /// Set when the run succeeded but the config could not be saved
    pub persist_error: Option<String>,
}

impl RunReport {
    pub fn summary(&self) -> String {
        format!(
            "{} of {} files processed, {} copied, {} failed in {:.1}s",
            self.processed_files,
            self.total_files,
            self.copied_files,
            self.failed_files.len(),
            self.elapsed.as_secs_f64()
        )
    }
}

/// Releases the single-run slot when dropped
#[derive(Debug)]
pub struct RunGuard {
    active: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Backup engine. Cheap to clone; clones share the single-run slot.
///
/// Only one run may be active at a time: starting another while one is in
/// flight fails with [`Error::RunInProgress`] instead of queueing.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    scanner: Scanner,
    policy: CopyFailurePolicy,
    store: Arc<ConfigStore>,
    active: Arc<AtomicBool>,
}

impl SyncEngine {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self {
            scanner: Scanner::new(),
            policy: CopyFailurePolicy::default(),
            store,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_scanner(mut self, scanner: Scanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_copy_failure_policy(mut self, policy: CopyFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Claim the single-run slot
    pub fn try_begin(&self) -> Result<RunGuard> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::RunInProgress)?;

        Ok(RunGuard {
            active: Arc::clone(&self.active),
        })
    }

    /// Run a backup on the current thread, blocking until it ends.
    ///
    /// `schedule` is the state before the run; on success it is advanced and
    /// saved together with `pairs`.
    pub fn run(
        &self,
        pairs: &PairSet,
        schedule: ScheduleState,
        events: &EventSender,
    ) -> Result<RunReport> {
        let guard = self.try_begin()?;
        self.execute(pairs, schedule, events, guard)
    }

    /// Start a backup on a blocking worker thread.
    ///
    /// The single-run slot is claimed before spawning, so a rejected start is
    /// reported synchronously.
    pub fn spawn(
        &self,
        pairs: PairSet,
        schedule: ScheduleState,
        events: EventSender,
    ) -> Result<JoinHandle<Result<RunReport>>> {
        let guard = self.try_begin()?;
        let engine = self.clone();

        Ok(tokio::task::spawn_blocking(move || {
            engine.execute(&pairs, schedule, &events, guard)
        }))
    }

    fn execute(
        &self,
        pairs: &PairSet,
        schedule: ScheduleState,
        events: &EventSender,
        _guard: RunGuard,
    ) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = span!(Level::INFO, "backup_run", run_id = %run_id);
        let _enter = span.enter();

        info!("Starting backup of {} folder pair(s)", pairs.len());
        let _ = events.send(SyncEvent::Message(STARTING_MESSAGE.to_string()));

        let mut report = match self.sync_pairs(run_id, pairs, events) {
            Ok(report) => report,
            Err(e) => {
                warn!("Backup aborted: {}", e);
                let _ = events.send(SyncEvent::Message(format!("Error: {}", e)));
                let _ = events.send(SyncEvent::Failed {
                    run_id,
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        let mut schedule = schedule;
        schedule.record_success(report.finished_at);
        report.schedule = schedule;

        let config = Config::new(pairs.clone(), schedule);
        if let Err(e) = self.store.save(&config) {
            warn!("Backup finished but config was not saved: {}", e);
            report.persist_error = Some(e.to_string());
        }

        info!(
            "Backup completed at {}: {}",
            format_timestamp(&report.finished_at),
            report.summary()
        );

        let final_message = if report.failed_files.is_empty() {
            SUCCESS_MESSAGE.to_string()
        } else {
            format!(
                "Backup completed with {} file(s) not copied.",
                report.failed_files.len()
            )
        };
        let _ = events.send(SyncEvent::Message(final_message));
        if let Some(error) = &report.persist_error {
            let _ = events.send(SyncEvent::Message(format!("Error: {}", error)));
        }
        let _ = events.send(SyncEvent::Finished(report.clone()));

        Ok(report)
    }

    fn sync_pairs(&self, run_id: Uuid, pairs: &PairSet, events: &EventSender) -> Result<RunReport> {
        let resolved = pairs.resolved()?;

        let total_files: u64 = resolved
            .iter()
            .map(|pair| self.scanner.count_files(pair))
            .sum();
        debug!("Pre-pass found {} file(s)", total_files);
        let _ = events.send(SyncEvent::Started {
            run_id,
            total_files,
        });

        let started = Instant::now();
        let mut progress = SyncProgress {
            total_files,
            ..SyncProgress::default()
        };
        let mut copied_files = 0u64;
        let mut failed_files = Vec::new();

        for pair in &resolved {
            debug!(
                "Syncing {} -> {}",
                pair.source.display(),
                pair.destination.display()
            );

            for entry in self.scanner.plan(pair) {
                match transfer(&entry) {
                    Ok(true) => {
                        copied_files += 1;
                        let message = format!(
                            "Copied: {} -> {}",
                            entry.source_path.display(),
                            entry.destination_path.display()
                        );
                        debug!("{}", message);
                        let _ = events.send(SyncEvent::Message(message.clone()));
                        progress.last_message = message;
                    }
                    Ok(false) => {}
                    Err(e) => match self.policy {
                        CopyFailurePolicy::Abort => return Err(e),
                        CopyFailurePolicy::SkipAndContinue => {
                            warn!("Skipping file: {}", e);
                            let message = format!("Skipped: {}", e);
                            let _ = events.send(SyncEvent::Message(message.clone()));
                            progress.last_message = message;
                            failed_files.push(FailedFile {
                                path: entry.source_path.clone(),
                                error: e.to_string(),
                            });
                        }
                    },
                }

                progress.processed_files += 1;
                progress.elapsed_seconds = started.elapsed().as_secs_f64();
                progress.estimated_remaining_seconds = estimate_remaining(
                    progress.processed_files,
                    progress.total_files,
                    progress.elapsed_seconds,
                );
                let _ = events.send(SyncEvent::Progress(progress.clone()));
            }
        }

        Ok(RunReport {
            run_id,
            finished_at: now_timestamp(),
            total_files,
            processed_files: progress.processed_files,
            copied_files,
            failed_files,
            elapsed: started.elapsed(),
            schedule: ScheduleState::default(),
            persist_error: None,
        })
    }
}

/// Linear extrapolation from the mean time per file so far
pub fn estimate_remaining(processed: u64, total: u64, elapsed_seconds: f64) -> f64 {
    if processed == 0 {
        return 0.0;
    }
    total.saturating_sub(processed) as f64 * (elapsed_seconds / processed as f64)
}

/// Create the destination's parent directories and copy when needed.
/// Returns whether a copy happened.
fn transfer(entry: &FileEntry) -> Result<bool> {
    if let Some(parent) = entry.destination_path.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    if !entry.copy_needed {
        return Ok(false);
    }

    copy_with_times(&entry.source_path, &entry.destination_path).map_err(|source| Error::Copy {
        from: entry.source_path.clone(),
        to: entry.destination_path.clone(),
        source,
    })?;

    Ok(true)
}

/// Copy content and permissions, then carry over access and modification
/// times so the next run sees equal timestamps.
fn copy_with_times(from: &Path, to: &Path) -> std::io::Result<()> {
    let metadata = fs::metadata(from)?;
    fs::copy(from, to)?;

    let modified = metadata.modified()?;
    let accessed = metadata.accessed().unwrap_or(modified);
    let times = FileTimes::new().set_accessed(accessed).set_modified(modified);

    // Read-only copies cannot be opened for writing; owners may still set times
    let dest = match File::options().write(true).open(to) {
        Ok(file) => file,
        Err(_) => File::open(to)?,
    };
    dest.set_times(times)
}
