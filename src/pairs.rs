//! Folder pairs: the ordered source -> destination mappings a run walks.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A single source -> destination mapping.
///
/// Serialized as a two-element array `[source, destination]` to keep the
/// config file compact and order-preserving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(PathBuf, PathBuf)", into = "(PathBuf, PathBuf)")]
pub struct FolderPair {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl FolderPair {
    /// Build a pair, rejecting empty fields.
    pub fn new<S: Into<PathBuf>, D: Into<PathBuf>>(source: S, destination: D) -> Result<Self> {
        let source = source.into();
        let destination = destination.into();

        if source.as_os_str().is_empty() || destination.as_os_str().is_empty() {
            return Err(Error::InvalidPair {
                reason: "Both input and backup folders must be specified.".to_string(),
            });
        }

        Ok(Self {
            source,
            destination,
        })
    }

    /// Resolve both sides to absolute paths.
    ///
    /// Existing paths are canonicalized; a destination that does not exist
    /// yet is anchored at the current directory instead.
    pub fn resolved(&self) -> Result<Self> {
        if self.source.as_os_str().is_empty() || self.destination.as_os_str().is_empty() {
            return Err(Error::InvalidPair {
                reason: "Both input and backup folders must be specified.".to_string(),
            });
        }

        Ok(Self {
            source: absolutize(&self.source)?,
            destination: absolutize(&self.destination)?,
        })
    }
}

impl From<(PathBuf, PathBuf)> for FolderPair {
    fn from((source, destination): (PathBuf, PathBuf)) -> Self {
        Self {
            source,
            destination,
        }
    }
}

impl From<FolderPair> for (PathBuf, PathBuf) {
    fn from(pair: FolderPair) -> Self {
        (pair.source, pair.destination)
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Ordered collection of folder pairs. Order is the order pairs are synced in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairSet {
    pairs: Vec<FolderPair>,
}

impl PairSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair at the end of the list.
    pub fn push(&mut self, pair: FolderPair) {
        self.pairs.push(pair);
    }

    /// Remove the pairs at the given positions.
    ///
    /// Out-of-range indices are ignored. Returns the removed pairs in their
    /// original order.
    pub fn remove_indices(&mut self, indices: &[usize]) -> Vec<FolderPair> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.pairs.len());

        for (index, pair) in self.pairs.drain(..).enumerate() {
            if indices.contains(&index) {
                removed.push(pair);
            } else {
                kept.push(pair);
            }
        }

        self.pairs = kept;
        removed
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FolderPair> {
        self.pairs.iter()
    }

    /// Resolve every pair to absolute form, in order.
    pub fn resolved(&self) -> Result<Vec<FolderPair>> {
        self.pairs.iter().map(FolderPair::resolved).collect()
    }
}

impl FromIterator<FolderPair> for PairSet {
    fn from_iter<I: IntoIterator<Item = FolderPair>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PairSet {
    type Item = &'a FolderPair;
    type IntoIter = std::slice::Iter<'a, FolderPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}
