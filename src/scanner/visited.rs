//! Directory cycle protection for symlink-following traversal.
//!
//! # Overview
//!
//! When symbolic links are followed, a link pointing at one of its own
//! ancestors makes the tree infinite. [`VisitedDirs`] remembers each expanded
//! directory by its `(device, inode)` pair so a directory reached a second
//! time, through any path, is not expanded again.
//!
//! # Platform Support
//!
//! - **Unix**: Uses (device_id, inode) pairs from directory metadata
//! - **Other**: Tracking disabled (every directory is treated as new)

use std::collections::HashSet;
use std::fs::Metadata;
use std::sync::Mutex;

/// Thread-safe set of directories already expanded.
#[derive(Debug, Default)]
pub struct VisitedDirs {
    seen: Mutex<HashSet<InodeKey>>,
}

impl VisitedDirs {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a directory, returning `true` on its first visit.
    ///
    /// Always `true` on platforms without inode information.
    pub fn first_visit(&self, metadata: &Metadata) -> bool {
        match InodeKey::from_metadata(metadata) {
            Some(key) => self
                .seen
                .lock()
                .map(|mut seen| seen.insert(key))
                .unwrap_or(true),
            None => true,
        }
    }

    /// Number of distinct directories recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether no directory has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether cycle detection works on this platform.
    #[must_use]
    pub const fn is_supported() -> bool {
        cfg!(unix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct InodeKey {
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
    #[cfg(not(unix))]
    _phantom: (),
}

impl InodeKey {
    #[cfg(unix)]
    fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }
}
