//! Saving and loading checkpoint files.
//!
//! A save never touches the authoritative file until the new content is
//! complete: the index is written to a temporary file in the same directory,
//! flushed to disk, and then renamed over the old checkpoint. An interrupted
//! save leaves at most a stray temporary behind; the authoritative file is
//! always either the previous or the new complete checkpoint.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use directories::ProjectDirs;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::data::{records_from_index, CheckpointFile, CheckpointRecord, CHECKPOINT_VERSION};
use super::CheckpointError;
use crate::index::Index;

/// File name of the authoritative checkpoint inside the data directory.
pub const DEFAULT_CHECKPOINT_NAME: &str = "index.json";

/// Location and retention policy of the authoritative checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
    backups: usize,
}

impl CheckpointStore {
    /// Create a store for the checkpoint at `path`, keeping no backups.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backups: 0,
        }
    }

    /// Keep up to `count` timestamped copies of previous checkpoints.
    #[must_use]
    pub fn with_backups(mut self, count: usize) -> Self {
        self.backups = count;
        self
    }

    /// Default platform-specific checkpoint path.
    ///
    /// # Errors
    ///
    /// Fails if the platform data directory cannot be determined.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "fsindex", "fsindex")
            .context("Failed to determine project directories")?;
        Ok(project_dirs.data_dir().join(DEFAULT_CHECKPOINT_NAME))
    }

    /// Path of the authoritative checkpoint.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of backups kept.
    #[must_use]
    pub fn backups(&self) -> usize {
        self.backups
    }

    fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Write `index` to a new checkpoint and make it authoritative.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if writing the temporary file or replacing
    /// the checkpoint fails. The previous checkpoint is left intact.
    pub fn save(&self, index: &Index) -> Result<(), CheckpointError> {
        self.prepare(index)?.commit()
    }

    /// Write `index` to a temporary file next to the checkpoint.
    ///
    /// Nothing becomes authoritative until [`PendingCheckpoint::commit`];
    /// dropping the pending checkpoint deletes the temporary.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if the temporary cannot be created or written.
    pub fn prepare(&self, index: &Index) -> Result<PendingCheckpoint<'_>, CheckpointError> {
        let dir = self.dir();
        fs::create_dir_all(&dir).map_err(|e| CheckpointError::io(&dir, e))?;

        let entries = records_from_index(index);
        let envelope = CheckpointFile {
            version: CHECKPOINT_VERSION,
            created_at: Utc::now(),
            checksum: checksum(&entries)?,
            entries,
        };

        let temp = tempfile::Builder::new()
            .prefix(".fsindex-")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(|e| CheckpointError::io(&dir, e))?;

        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, &envelope).map_err(CheckpointError::Serialize)?;
            writer
                .flush()
                .map_err(|e| CheckpointError::io(temp.path(), e))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| CheckpointError::io(temp.path(), e))?;

        log::debug!(
            "Wrote {} entries to temporary checkpoint {}",
            envelope.entries.len(),
            temp.path().display()
        );

        Ok(PendingCheckpoint {
            store: self,
            temp,
            entries: envelope.entries.len(),
        })
    }

    /// Load the authoritative checkpoint.
    ///
    /// Returns `Ok(None)` if no checkpoint exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if the file cannot be read, does not parse,
    /// fails its integrity check, or has an unsupported version.
    pub fn load(&self) -> Result<Option<Index>, CheckpointError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CheckpointError::io(&self.path, e)),
        };

        let envelope: CheckpointFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| CheckpointError::Parse {
                path: self.path.clone(),
                source,
            })?;

        if envelope.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: envelope.version,
                expected: CHECKPOINT_VERSION,
            });
        }

        if checksum(&envelope.entries)? != envelope.checksum {
            return Err(CheckpointError::ChecksumMismatch(self.path.clone()));
        }

        let mut index = Index::with_capacity(envelope.entries.len());
        for record in envelope.entries {
            let entry = record
                .to_entry()
                .ok_or_else(|| CheckpointError::CorruptEntry {
                    checkpoint: self.path.clone(),
                    entry: record.path.clone(),
                })?;
            index.insert(record.path, entry);
        }

        Ok(Some(index))
    }

    /// Load the checkpoint, falling back to an empty index.
    ///
    /// A missing or unreadable checkpoint is not an error here: indexing
    /// simply starts from scratch. The reason is logged.
    #[must_use]
    pub fn load_or_empty(&self) -> Index {
        match self.load() {
            Ok(Some(index)) => {
                log::info!(
                    "{} entries loaded from {}",
                    index.len(),
                    self.path.display()
                );
                index
            }
            Ok(None) => {
                log::info!(
                    "No checkpoint at {}, starting with an empty index",
                    self.path.display()
                );
                Index::new()
            }
            Err(e) => {
                log::warn!("Ignoring unreadable checkpoint: {}", e);
                Index::new()
            }
        }
    }

    /// Paths of existing backups, newest first.
    #[must_use]
    pub fn list_backups(&self) -> Vec<PathBuf> {
        let (Some(stem), Some(ext)) = (
            self.path.file_stem().and_then(|s| s.to_str()),
            self.path.extension().and_then(|s| s.to_str()),
        ) else {
            return Vec::new();
        };

        let Ok(read_dir) = fs::read_dir(self.dir()) else {
            return Vec::new();
        };

        let prefix = format!("{stem}.");
        let suffix = format!(".{ext}");
        let mut backups: Vec<(u64, PathBuf)> = read_dir
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                let stamp = name.strip_prefix(&prefix)?.strip_suffix(&suffix)?;
                let stamp: u64 = stamp.parse().ok()?;
                Some((stamp, entry.path()))
            })
            .collect();

        backups.sort_by(|a, b| b.0.cmp(&a.0));
        backups.into_iter().map(|(_, path)| path).collect()
    }

    /// Copy the current checkpoint to a timestamped backup and prune old ones.
    fn rotate_backups(&self) {
        if self.backups == 0 || !self.path.exists() {
            return;
        }

        let (Some(stem), Some(ext)) = (
            self.path.file_stem().and_then(|s| s.to_str()),
            self.path.extension().and_then(|s| s.to_str()),
        ) else {
            log::warn!(
                "Checkpoint name {} cannot carry backups",
                self.path.display()
            );
            return;
        };

        let mut stamp = Utc::now().timestamp_millis().max(0) as u64;
        let mut backup = self.dir().join(format!("{stem}.{stamp}.{ext}"));
        while backup.exists() {
            stamp += 1;
            backup = self.dir().join(format!("{stem}.{stamp}.{ext}"));
        }

        if let Err(e) = fs::copy(&self.path, &backup) {
            log::warn!("Failed to back up checkpoint to {}: {}", backup.display(), e);
            return;
        }
        log::debug!("Backed up checkpoint to {}", backup.display());

        for old in self.list_backups().into_iter().skip(self.backups) {
            if let Err(e) = fs::remove_file(&old) {
                log::warn!("Failed to remove old backup {}: {}", old.display(), e);
            }
        }
    }
}

/// A fully written checkpoint that is not yet authoritative.
pub struct PendingCheckpoint<'a> {
    store: &'a CheckpointStore,
    temp: NamedTempFile,
    entries: usize,
}

impl PendingCheckpoint<'_> {
    /// Location of the temporary file.
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Number of entries written.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Atomically replace the authoritative checkpoint with this one.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Replace`] if the rename fails; the previous
    /// checkpoint is untouched and the temporary is removed.
    pub fn commit(self) -> Result<(), CheckpointError> {
        self.store.rotate_backups();

        let path = self.store.path.clone();
        self.temp
            .persist(&path)
            .map_err(|e| CheckpointError::Replace {
                path: path.clone(),
                source: e.error,
            })?;

        log::debug!("Checkpoint saved: {} entries to {}", self.entries, path.display());
        Ok(())
    }
}

/// SHA-256 over the compact JSON of the records.
fn checksum(entries: &[CheckpointRecord]) -> Result<String, CheckpointError> {
    let mut hasher = Sha256::new();
    serde_json::to_writer(&mut hasher, entries).map_err(CheckpointError::Serialize)?;
    Ok(format!("{:x}", hasher.finalize()))
}
