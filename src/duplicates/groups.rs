//! Grouping of index entries by content hash.
//!
//! # Overview
//!
//! Two entries are duplicates when their content hashes are equal; sizes and
//! names play no part. Grouping is a single pass over the index that moves
//! every path into a bucket keyed by hash, after which buckets with a single
//! path are discarded.
//!
//! # Example
//!
//! ```
//! use fsindex::duplicates::{find_duplicates, DuplicateSummary};
//! use fsindex::index::{Index, IndexEntry};
//! use std::path::PathBuf;
//!
//! let mut index = Index::new();
//! index.insert(PathBuf::from("/a/one.txt"), IndexEntry::new(1024, [7u8; 32], None));
//! index.insert(PathBuf::from("/b/two.txt"), IndexEntry::new(1024, [7u8; 32], None));
//! index.insert(PathBuf::from("/c/other.txt"), IndexEntry::new(10, [8u8; 32], None));
//!
//! let groups = find_duplicates(index);
//! assert_eq!(groups.len(), 1);
//!
//! let summary = DuplicateSummary::from_groups(&groups);
//! assert_eq!(summary.reclaimable_space, 1024);
//! ```

use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::index::Index;
use crate::scanner::{hash_to_hex, Hash};

/// Files sharing one content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// BLAKE3 hash of the content shared by every file in the group
    pub hash: Hash,
    /// File size in bytes
    pub size: u64,
    /// Paths of all copies, sorted
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Total size of all copies.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.size * self.paths.len() as u64
    }

    /// Space taken by all copies but one.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Number of redundant copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }

    /// Hash as uppercase hexadecimal string.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hash_to_hex(&self.hash)
    }
}

/// Totals over a set of duplicate groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateSummary {
    /// Number of groups
    pub duplicate_groups: usize,
    /// Number of redundant copies across all groups
    pub duplicate_files: usize,
    /// Bytes freed by keeping one copy per group
    pub reclaimable_space: u64,
}

impl DuplicateSummary {
    /// Summarize `groups`.
    #[must_use]
    pub fn from_groups(groups: &[DuplicateGroup]) -> Self {
        Self {
            duplicate_groups: groups.len(),
            duplicate_files: groups.iter().map(DuplicateGroup::duplicate_count).sum(),
            reclaimable_space: groups.iter().map(DuplicateGroup::wasted_space).sum(),
        }
    }
}

/// Group the entries of `index` by content hash.
///
/// The index is consumed so that its paths can be moved into the groups
/// without copying. Hashes seen only once are omitted. Groups are ordered by
/// wasted space (largest first), then by hash; paths within a group are sorted.
#[must_use]
pub fn find_duplicates(index: Index) -> Vec<DuplicateGroup> {
    let total = index.len();
    let mut by_hash: HashMap<Hash, (u64, Vec<PathBuf>)> = HashMap::new();

    for (path, entry) in index {
        by_hash
            .entry(entry.hash)
            .or_insert_with(|| (entry.size, Vec::new()))
            .1
            .push(path);
    }

    let mut groups: Vec<DuplicateGroup> = by_hash
        .into_iter()
        .filter(|(_, (_, paths))| paths.len() > 1)
        .map(|(hash, (size, mut paths))| {
            paths.sort();
            DuplicateGroup { hash, size, paths }
        })
        .collect();

    groups.sort_by(|a, b| {
        b.wasted_space()
            .cmp(&a.wasted_space())
            .then_with(|| a.hash.cmp(&b.hash))
    });

    log::debug!(
        "Found {} duplicate groups among {} entries",
        groups.len(),
        total
    );

    groups
}
