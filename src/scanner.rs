//! Scanner deciding, per file, whether a folder pair needs a copy.

use crate::pairs::FolderPair;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A file found under a pair's source, with the copy decision for it.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Path relative to the pair's source root
    pub relative_path: PathBuf,
    /// Absolute source file path
    pub source_path: PathBuf,
    /// Absolute destination file path
    pub destination_path: PathBuf,
    pub source_modified: Option<SystemTime>,
    pub destination_exists: bool,
    pub destination_modified: Option<SystemTime>,
    pub copy_needed: bool,
}

/// Decide whether `source` has to be copied over `destination`.
///
/// True when the destination is missing, or when the source is strictly
/// newer. Equal modification times count as already synced.
pub fn should_copy(source_modified: Option<SystemTime>, destination_modified: Option<SystemTime>) -> bool {
    match (source_modified, destination_modified) {
        (_, None) => true,
        (Some(src), Some(dst)) => src > dst,
        (None, Some(_)) => false,
    }
}

/// Stateless scanner. Plans are built fresh for every run.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    follow_symlinks: bool,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow symbolic links while walking sources
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Count files reachable under the pair's source, using the same walk
    /// rules as [`Scanner::plan`].
    pub fn count_files(&self, pair: &FolderPair) -> u64 {
        self.walk(&pair.source)
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Not counting entry: {}", e);
                    None
                }
            })
            .filter(is_file_entry)
            // Same readability check the plan applies, so totals line up
            .filter(|entry| fs::metadata(entry.path()).is_ok())
            .count() as u64
    }

    /// Lazily plan the pair: every file under `source` with its copy decision.
    ///
    /// The returned iterator walks the tree as it is consumed and can only be
    /// consumed once.
    pub fn plan<'a>(&self, pair: &'a FolderPair) -> Plan<'a> {
        Plan {
            pair,
            walker: self.walk(&pair.source),
        }
    }

    fn walk(&self, root: &Path) -> walkdir::IntoIter {
        WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
    }
}

/// Directories are not entries, and neither are symlinks resolving to one
/// when links are not followed.
fn is_file_entry(entry: &walkdir::DirEntry) -> bool {
    if entry.file_type().is_dir() {
        return false;
    }
    if entry.path_is_symlink() && entry.path().is_dir() {
        debug!("Skipping symlinked directory {}", entry.path().display());
        return false;
    }
    true
}

/// Single-pass plan over one folder pair.
pub struct Plan<'a> {
    pair: &'a FolderPair,
    walker: walkdir::IntoIter,
}

impl Plan<'_> {
    fn entry_for(&self, source_path: PathBuf) -> Option<FileEntry> {
        let relative_path = match source_path.strip_prefix(&self.pair.source) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => {
                warn!(
                    "Skipping {}: not under source root {}",
                    source_path.display(),
                    self.pair.source.display()
                );
                return None;
            }
        };

        let source_modified = match fs::metadata(&source_path).and_then(|m| m.modified()) {
            Ok(modified) => Some(modified),
            Err(e) => {
                warn!("Skipping {}: cannot read metadata: {}", source_path.display(), e);
                return None;
            }
        };

        let destination_path = self.pair.destination.join(&relative_path);
        let destination_meta = fs::metadata(&destination_path).ok();
        let destination_exists = destination_meta.is_some();
        let destination_modified = destination_meta.and_then(|m| m.modified().ok());

        let copy_needed = if destination_exists {
            should_copy(source_modified, destination_modified)
        } else {
            true
        };

        Some(FileEntry {
            relative_path,
            source_path,
            destination_path,
            source_modified,
            destination_exists,
            destination_modified,
            copy_needed,
        })
    }
}

impl Iterator for Plan<'_> {
    type Item = FileEntry;

    fn next(&mut self) -> Option<FileEntry> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping entry due to error: {}", e);
                    continue;
                }
            };

            if !is_file_entry(&entry) {
                continue;
            }

            if let Some(file) = self.entry_for(entry.into_path()) {
                return Some(file);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(path: &Path, contents: &str, modified: SystemTime) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
    }

    fn pair(temp_dir: &TempDir) -> FolderPair {
        FolderPair::new(temp_dir.path().join("src"), temp_dir.path().join("dst")).unwrap()
    }

    #[test]
    fn test_should_copy_rules() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        let later = t + Duration::from_secs(1);

        assert!(should_copy(Some(t), None));
        assert!(should_copy(None, None));
        assert!(should_copy(Some(later), Some(t)));
        assert!(!should_copy(Some(t), Some(t)));
        assert!(!should_copy(Some(t), Some(later)));
    }

    #[test]
    fn test_plan_decisions() {
        let temp_dir = TempDir::new().unwrap();
        let pair = pair(&temp_dir);
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        touch(&pair.source.join("a.txt"), "new", t);
        touch(&pair.source.join("b.txt"), "same", t);
        touch(&pair.destination.join("b.txt"), "same", t);
        touch(&pair.source.join("nested/c.txt"), "newer", t + Duration::from_secs(10));
        touch(&pair.destination.join("nested/c.txt"), "older", t);

        let plan: Vec<FileEntry> = Scanner::new().plan(&pair).collect();
        let decisions: Vec<(String, bool)> = plan
            .iter()
            .map(|f| (f.relative_path.display().to_string(), f.copy_needed))
            .collect();

        assert_eq!(
            decisions,
            vec![
                ("a.txt".to_string(), true),
                ("b.txt".to_string(), false),
                (Path::new("nested").join("c.txt").display().to_string(), true),
            ]
        );
        assert!(!plan[0].destination_exists);
        assert_eq!(plan[1].destination_path, pair.destination.join("b.txt"));
    }

    #[test]
    fn test_count_matches_plan() {
        let temp_dir = TempDir::new().unwrap();
        let pair = pair(&temp_dir);
        let t = SystemTime::now();

        for name in ["one", "two", "deep/three", "deep/er/four"] {
            touch(&pair.source.join(name), name, t);
        }
        fs::create_dir_all(pair.source.join("empty")).unwrap();

        let scanner = Scanner::new();
        assert_eq!(scanner.count_files(&pair), 4);
        assert_eq!(scanner.plan(&pair).count(), 4);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_to_directories_and_dangling_links_are_skipped() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        let pair = pair(&temp_dir);
        let t = SystemTime::now();

        touch(&pair.source.join("real/a.txt"), "a", t);
        touch(&pair.source.join("z.txt"), "z", t);
        symlink(pair.source.join("real"), pair.source.join("link")).unwrap();
        symlink(pair.source.join("gone.txt"), pair.source.join("dangling")).unwrap();

        let scanner = Scanner::new();
        let planned: Vec<PathBuf> = scanner
            .plan(&pair)
            .map(|entry| entry.relative_path)
            .collect();

        assert_eq!(
            planned,
            vec![Path::new("real").join("a.txt"), PathBuf::from("z.txt")]
        );
        assert_eq!(scanner.count_files(&pair), planned.len() as u64);
    }

    #[test]
    fn test_missing_source_yields_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let pair = pair(&temp_dir);

        let scanner = Scanner::new();
        assert_eq!(scanner.count_files(&pair), 0);
        assert_eq!(scanner.plan(&pair).count(), 0);
    }
}
