//! Persisted application state and the store that reads and writes it.

use crate::pairs::PairSet;
use crate::schedule::ScheduleState;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "BACKUPER_CONFIG";

const CONFIG_DIR_NAME: &str = "backuper";
const CONFIG_FILE_NAME: &str = "config.json";

/// Full persisted snapshot: folder pairs plus the last backup date.
///
/// ```json
/// {
///     "pairs": [["/home/me/docs", "/mnt/usb/docs"]],
///     "last_backup_date": "2024-05-01 12:00:00"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pairs: PairSet,
    #[serde(flatten)]
    pub schedule: ScheduleState,
}

impl Config {
    pub fn new(pairs: PairSet, schedule: ScheduleState) -> Self {
        Self { pairs, schedule }
    }
}

/// Result of loading the config file
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub config: Config,
    /// Set when the file existed but could not be used
    pub warning: Option<String>,
}

/// Reads and writes the config file.
///
/// Saves are serialized through an internal lock so concurrent writers
/// (a finishing run and a deferred reminder) never interleave.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    save_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            save_lock: Mutex::new(()),
        }
    }

    /// Store at the explicit path, else `$BACKUPER_CONFIG`, else the platform
    /// config directory.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }

        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
            return Ok(Self::new(PathBuf::from(path)));
        }

        let config_dir = dirs::config_dir().ok_or_else(|| Error::Configuration {
            reason: "Could not determine config directory".to_string(),
        })?;

        Ok(Self::new(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config.
    ///
    /// A missing file is an empty state. A file that cannot be read or parsed
    /// is also treated as empty, with a warning for the user.
    pub fn load(&self) -> LoadOutcome {
        if !self.path.exists() {
            debug!("Config file {} not found, starting empty", self.path.display());
            return LoadOutcome::default();
        }

        let parsed = fs::read_to_string(&self.path)
            .map_err(Error::from)
            .and_then(|content| serde_json::from_str::<Config>(&content).map_err(Error::from));

        match parsed {
            Ok(config) => {
                info!(
                    "Loaded {} folder pair(s) from {}, last backup: {}",
                    config.pairs.len(),
                    self.path.display(),
                    config.schedule.describe()
                );
                LoadOutcome {
                    config,
                    warning: None,
                }
            }
            Err(e) => {
                warn!("Ignoring unreadable config {}: {}", self.path.display(), e);
                LoadOutcome {
                    config: Config::default(),
                    warning: Some(format!(
                        "Could not load configuration file {}. The format may be incorrect. ({})",
                        self.path.display(),
                        e
                    )),
                }
            }
        }
    }

    /// Overwrite the config file with `config`.
    ///
    /// Written to a sibling temp file first and renamed over the target.
    pub fn save(&self, config: &Config) -> Result<()> {
        let _guard = self
            .save_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let content = serde_json::to_string_pretty(config)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.write_error(source))?;
        }

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, content).map_err(|source| self.write_error(source))?;
        if let Err(source) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.write_error(source));
        }

        debug!("Config saved to {}", self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| CONFIG_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_error(&self, source: std::io::Error) -> Error {
        Error::ConfigWrite {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairs::FolderPair;
    use crate::schedule::parse_timestamp;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_config() -> Config {
        let pairs: PairSet = vec![
            FolderPair::new("/home/me/docs", "/mnt/usb/docs").unwrap(),
            FolderPair::new("/home/me/photos", "/mnt/usb/photos").unwrap(),
        ]
        .into_iter()
        .collect();
        let schedule = ScheduleState::new(Some(parse_timestamp("2024-05-01 12:00:00").unwrap()));
        Config::new(pairs, schedule)
    }

    #[test]
    fn test_missing_file_is_empty_state() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::new(temp_dir.path().join("config.json"));

        let outcome = store.load();
        assert!(outcome.warning.is_none());
        assert_eq!(outcome.config, Config::default());
    }

    #[test]
    fn test_round_trip() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = ConfigStore::new(temp_dir.path().join("nested").join("config.json"));
        let config = sample_config();

        store.save(&config)?;
        let content = fs::read_to_string(store.path())?;
        assert!(content.contains(r#""last_backup_date": "2024-05-01 12:00:00""#));

        let outcome = store.load();
        assert!(outcome.warning.is_none());
        assert_eq!(outcome.config, config);
        assert!(!store.tmp_path().exists());
        Ok(())
    }

    #[test]
    fn test_never_backed_up_written_as_null() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = ConfigStore::new(temp_dir.path().join("config.json"));
        let config = Config::new(sample_config().pairs, ScheduleState::default());

        store.save(&config)?;
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(store.path())?)?;
        assert!(value["last_backup_date"].is_null());
        assert_eq!(value["pairs"][1][0], "/home/me/photos");
        Ok(())
    }

    #[test]
    fn test_reads_file_without_optional_fields() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"pairs": [["C:/data", "D:/backup"]]}"#)?;

        let outcome = ConfigStore::new(&path).load();
        assert!(outcome.warning.is_none());
        assert_eq!(outcome.config.pairs.len(), 1);
        assert_eq!(outcome.config.schedule.last_backup, None);
        Ok(())
    }

    #[test]
    fn test_malformed_file_warns() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ not json")?;

        let outcome = ConfigStore::new(&path).load();
        assert_eq!(outcome.config, Config::default());
        assert!(outcome
            .warning
            .unwrap()
            .contains("Could not load configuration file"));

        fs::write(&path, r#"{"pairs": [], "last_backup_date": "yesterday"}"#)?;
        assert!(ConfigStore::new(&path).load().warning.is_some());
        Ok(())
    }

    #[test]
    fn test_save_failure_is_reported() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory")?;

        let store = ConfigStore::new(blocker.join("config.json"));
        assert!(matches!(
            store.save(&sample_config()),
            Err(Error::ConfigWrite { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_locate_prefers_explicit_path() -> Result<()> {
        let store = ConfigStore::locate(Some(Path::new("/tmp/custom.json")))?;
        assert_eq!(store.path(), Path::new("/tmp/custom.json"));
        Ok(())
    }
}
