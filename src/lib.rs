//! # backuper
//!
//! Incremental one-way folder backup with live progress and due-date
//! reminders.
//!
//! ## Features
//!
//! - **Incremental copy**: only files that are missing at the destination or
//!   have a newer modification time are copied
//! - **Multi-pair runs**: any number of source -> destination pairs, synced in
//!   order with a single progress count and ETA
//! - **Reminders**: a periodic check prompts for a new backup once more than
//!   three whole days have passed since the last one
//! - **Plain JSON config**: pairs and the last backup date in one file
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use backuper::config::ConfigStore;
//! use backuper::engine::{event_channel, SyncEngine};
//! use backuper::pairs::{FolderPair, PairSet};
//! use backuper::schedule::ScheduleState;
//! use std::sync::Arc;
//!
//! # fn main() -> backuper::Result<()> {
//! let store = Arc::new(ConfigStore::new("./config.json"));
//! let engine = SyncEngine::new(store);
//!
//! let mut pairs = PairSet::new();
//! pairs.push(FolderPair::new("./my-data", "./backup")?);
//!
//! let (events, _receiver) = event_channel();
//! let report = engine.run(&pairs, ScheduleState::default(), &events)?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod pairs;
pub mod presence;
pub mod reminder;
pub mod scanner;
pub mod schedule;

// Re-export commonly used types
pub use app::{App, AppState};
pub use config::{Config, ConfigStore};
pub use engine::{CopyFailurePolicy, RunReport, SyncEngine, SyncEvent, SyncProgress};
pub use error::{Error, Result};
pub use pairs::{FolderPair, PairSet};
pub use scanner::Scanner;
pub use schedule::{ScheduleState, ScheduleTracker};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
