//! Checkpoint module for persisting the index across runs.
//!
//! # Features
//!
//! * **Atomicity**: Saves go to a temporary file that is flushed, synced and
//!   renamed over the authoritative checkpoint.
//! * **Integrity**: Each checkpoint carries a SHA256 checksum of its entries.
//! * **Versioning**: The file format is versioned; unknown versions are rejected.
//! * **Backups**: Optionally keeps the newest N previous checkpoints.
//!
//! # Architecture
//!
//! * [`data`]: Serializable checkpoint schema.
//! * [`io`]: Saving, loading and verifying checkpoint files.
//! * [`writer`]: Keeps at most one save in flight during an indexing run.

pub mod data;
pub mod io;
pub mod writer;

use std::path::{Path, PathBuf};

pub use data::{CheckpointFile, CheckpointRecord, CHECKPOINT_VERSION};
pub use io::{CheckpointStore, PendingCheckpoint, DEFAULT_CHECKPOINT_NAME};
pub use writer::CheckpointWriter;

/// Errors that can occur while saving or loading a checkpoint.
#[derive(thiserror::Error, Debug)]
pub enum CheckpointError {
    /// Reading or writing a file failed.
    #[error("Checkpoint I/O error for {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The index could not be serialized.
    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The checkpoint is not valid JSON for the expected schema.
    #[error("Failed to parse checkpoint {path}: {source}")]
    Parse {
        /// Checkpoint file
        path: PathBuf,
        /// The underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// The stored checksum does not match the entries.
    #[error("Checkpoint integrity check failed for {0}: checksum mismatch")]
    ChecksumMismatch(PathBuf),

    /// An entry carries a hash that cannot be decoded.
    #[error("Corrupt entry {entry} in checkpoint {checkpoint}")]
    CorruptEntry {
        /// Checkpoint file
        checkpoint: PathBuf,
        /// Path of the offending entry
        entry: PathBuf,
    },

    /// The checkpoint was written by an incompatible version.
    #[error("Unsupported checkpoint version: {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
        /// Version this build understands
        expected: u32,
    },

    /// The new checkpoint could not replace the old one.
    #[error("Failed to replace checkpoint {path}: {source}")]
    Replace {
        /// Authoritative checkpoint path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl CheckpointError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
