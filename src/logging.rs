//! Tracing subscriber setup for the binary

use crate::Result;
use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber. `RUST_LOG` wins over `verbose` when set.
pub fn init_logging(verbose: u8) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "backuper=warn",
            1 => "backuper=info",
            _ => "backuper=debug",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(verbose > 1)
        .with_line_number(verbose > 1)
        .try_init()
        .map_err(|e| crate::Error::Configuration {
            reason: format!("Failed to initialise logging: {}", e),
        })
}

/// Append logs to `log_file` instead of the terminal, for long-running
/// `watch` sessions.
pub fn init_file_logging(log_file: &std::path::Path, verbose: u8) -> Result<()> {
    use std::fs::OpenOptions;

    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    let filter = if verbose > 0 {
        EnvFilter::new("backuper=debug")
    } else {
        EnvFilter::new("backuper=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| crate::Error::Configuration {
            reason: format!("Failed to initialise logging: {}", e),
        })
}
