//! Lazy directory traversal.
//!
//! # Overview
//!
//! The [`Walker`] never walks a whole tree on its own. It classifies single
//! entries and expands one directory at a time into [`WorkItem`]s; the
//! indexer's workers call [`Walker::expand`] only when they dequeue a
//! directory, so the pending-work collection holds at most the unexpanded
//! frontier of the tree.
//!
//! # Example
//!
//! ```no_run
//! use fsindex::scanner::{Walker, WalkerConfig, WorkItem};
//! use std::path::Path;
//!
//! let walker = Walker::new(WalkerConfig::default());
//! let mut stack = vec![WorkItem::Directory(Path::new(".").to_path_buf())];
//! while let Some(item) = stack.pop() {
//!     match item {
//!         WorkItem::File(path) => println!("{}", path.display()),
//!         WorkItem::Directory(dir) => match walker.expand(&dir) {
//!             Ok(children) => stack.extend(children),
//!             Err(e) => eprintln!("Skipping: {}", e),
//!         },
//!     }
//! }
//! ```

use std::fs;
use std::path::Path;

use super::visited::VisitedDirs;
use super::{ScanError, WalkerConfig, WorkItem};

/// Classifies filesystem entries and expands directories.
#[derive(Debug, Default)]
pub struct Walker {
    config: WalkerConfig,
    visited: VisitedDirs,
}

impl Walker {
    /// Create a new walker.
    #[must_use]
    pub fn new(config: WalkerConfig) -> Self {
        Self {
            config,
            visited: VisitedDirs::new(),
        }
    }

    /// Walker configuration.
    #[must_use]
    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    /// Classify a single path with one metadata lookup.
    ///
    /// Returns `None` for entries that are neither regular files nor
    /// directories (sockets, FIFOs, devices), for symlinks when links are not
    /// followed, for dangling links, and for entries whose metadata cannot be
    /// read.
    #[must_use]
    pub fn classify(&self, path: &Path) -> Option<WorkItem> {
        let metadata = if self.config.follow_symlinks {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        };

        let metadata = match metadata {
            Ok(m) => m,
            Err(e) => {
                log::debug!("Cannot stat {}: {}", path.display(), e);
                return None;
            }
        };

        let file_type = metadata.file_type();
        if file_type.is_file() {
            Some(WorkItem::File(path.to_path_buf()))
        } else if file_type.is_dir() {
            Some(WorkItem::Directory(path.to_path_buf()))
        } else {
            log::trace!("Skipping special entry: {}", path.display());
            None
        }
    }

    /// List the immediate children of `dir` as work items.
    ///
    /// Children that vanish or cannot be stat'ed while listing are skipped.
    /// When following symlinks, a directory already expanded through another
    /// path yields no children.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the directory itself cannot be listed.
    pub fn expand(&self, dir: &Path) -> Result<Vec<WorkItem>, ScanError> {
        if self.config.follow_symlinks {
            let metadata = fs::metadata(dir).map_err(|e| ScanError::from_io(dir, e))?;
            if !metadata.is_dir() {
                return Err(ScanError::NotADirectory(dir.to_path_buf()));
            }
            if !self.visited.first_visit(&metadata) {
                log::debug!("Directory already visited (symlink cycle?): {}", dir.display());
                return Ok(Vec::new());
            }
        }

        let entries = fs::read_dir(dir).map_err(|e| ScanError::from_io(dir, e))?;

        let mut children = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            if let Some(item) = self.classify(&entry.path()) {
                children.push(item);
            }
        }

        Ok(children)
    }
}
