use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A point-in-time view of some per-file property.
///
/// Two snapshots are equal when they hold the same set of paths with the
/// same value for every path. The backing map is ordered, so the order in
/// which entries were observed never matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<V> {
    entries: BTreeMap<PathBuf, V>,
}

/// Path → byte size.
pub type SizeSnapshot = Snapshot<u64>;

/// Path → content checksum.
pub type ChecksumSnapshot = Snapshot<String>;

impl<V> Default for Snapshot<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> Snapshot<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold another per-path map into this one; later values win.
    pub fn merge(&mut self, other: impl IntoIterator<Item = (PathBuf, V)>) {
        self.entries.extend(other);
    }

    pub fn insert(&mut self, path: PathBuf, value: V) {
        self.entries.insert(path, value);
    }

    pub fn get(&self, path: &Path) -> Option<&V> {
        self.entries.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> FromIterator<(PathBuf, V)> for Snapshot<V> {
    fn from_iter<I: IntoIterator<Item = (PathBuf, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
