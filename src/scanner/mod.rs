//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Lazy directory expansion into work items
//! - Content hashing with BLAKE3 (streaming, bounded chunks)
//! - The incremental fingerprint policy that skips unchanged files
//! - Symlink cycle protection when following links
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Classification of filesystem entries and directory expansion
//! - [`hasher`]: BLAKE3 file hashing and hex encoding
//! - [`fingerprint`]: Decides whether a file needs to be re-hashed
//! - [`visited`]: `(device, inode)` tracking for followed directories
//!
//! # Example
//!
//! ```no_run
//! use fsindex::scanner::{Walker, WalkerConfig, WorkItem};
//! use std::path::Path;
//!
//! let walker = Walker::new(WalkerConfig::default());
//! match walker.expand(Path::new(".")) {
//!     Ok(children) => {
//!         for child in children {
//!             if let WorkItem::File(path) = child {
//!                 println!("{}", path.display());
//!             }
//!         }
//!     }
//!     Err(e) => eprintln!("Warning: {}", e),
//! }
//! ```

pub mod fingerprint;
pub mod hasher;
pub mod visited;
pub mod walker;

use std::path::{Path, PathBuf};

// Re-export main types
pub use fingerprint::{fingerprint, Fingerprint};
pub use hasher::{hash_to_hex, hex_to_hash, Hash, Hasher, DEFAULT_CHUNK_SIZE, HASH_HEX_LEN};
pub use walker::Walker;

/// A discovered filesystem entry awaiting processing.
///
/// Files are hashed; directories are expanded into more work items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// A regular file to fingerprint.
    File(PathBuf),
    /// A directory to list.
    Directory(PathBuf),
}

impl WorkItem {
    /// Path of the entry.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::File(path) | Self::Directory(path) => path,
        }
    }

    /// Whether this item is a directory.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    ///
    /// Directories reached through links are tracked by inode so a cycle is
    /// only expanded once.
    pub follow_symlinks: bool,
}

impl WalkerConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(follow_symlinks: bool) -> Self {
        Self { follow_symlinks }
    }
}

/// A directory could not be listed.
///
/// The indexer logs these and skips the subtree.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while listing a directory.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Whether the directory is known to be gone, as opposed to unreadable.
    #[must_use]
    pub fn is_vanished(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NotADirectory(_))
    }

    pub(crate) fn from_io(path: &Path, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// A file could not be read or hashed.
///
/// The file is omitted from the index for the current run.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path no longer refers to a regular file.
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    pub(crate) fn from_io(path: &Path, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Whether the file vanished or stopped being a regular file between
    /// discovery and hashing.
    #[must_use]
    pub fn is_vanished(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NotAFile(_))
    }
}
