//! The in-memory file index.
//!
//! An [`Index`] maps absolute file paths to [`IndexEntry`] values. It is a
//! plain owned value: the indexer wraps it in a mutex while workers mutate it,
//! and the query layer reads it without any locking once it is loaded.

pub mod entry;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub use entry::{IndexEntry, Timestamp};

/// Mapping from absolute path to the indexed file data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    entries: HashMap<PathBuf, IndexEntry>,
}

impl Index {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Number of indexed files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the entry for a path.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    /// Whether the path is indexed.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Insert or replace the entry for a path, returning the previous one.
    pub fn insert(&mut self, path: PathBuf, entry: IndexEntry) -> Option<IndexEntry> {
        self.entries.insert(path, entry)
    }

    /// Remove the entry for a path.
    pub fn remove(&mut self, path: &Path) -> Option<IndexEntry> {
        self.entries.remove(path)
    }

    /// Iterate over all `(path, entry)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &IndexEntry)> {
        self.entries.iter()
    }

    /// Iterate over all indexed paths.
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.keys()
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Path, &IndexEntry) -> bool,
    {
        self.entries.retain(|path, entry| keep(path, entry));
    }

    /// Drop every entry below `root` whose path is not in `seen`.
    ///
    /// Used after a completed run to forget files that were deleted since the
    /// previous run. Entries outside `root` are kept, as are entries below any
    /// directory in `unlisted` (a directory the run could not read).
    /// Returns the number of removed entries.
    pub fn prune_under(
        &mut self,
        root: &Path,
        seen: &HashSet<PathBuf>,
        unlisted: &[PathBuf],
    ) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, _| {
            !path.starts_with(root)
                || seen.contains(path)
                || unlisted.iter().any(|dir| path.starts_with(dir))
        });
        before - self.entries.len()
    }

    /// Total size in bytes of all indexed files.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(|e| e.size).sum()
    }
}

impl FromIterator<(PathBuf, IndexEntry)> for Index {
    fn from_iter<I: IntoIterator<Item = (PathBuf, IndexEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Index {
    type Item = (PathBuf, IndexEntry);
    type IntoIter = std::collections::hash_map::IntoIter<PathBuf, IndexEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
