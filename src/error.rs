//! Error types for backuper

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for backuper operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid folder pair: {reason}")]
    InvalidPair { reason: String },

    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {} -> {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("Could not save configuration to {}: {source}", path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A backup is already running")]
    RunInProgress,

    #[error("Scheduling error: {reason}")]
    Scheduling { reason: String },
}

/// Result type alias for backuper operations
pub type Result<T> = std::result::Result<T, Error>;
