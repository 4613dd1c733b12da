//! On-disk checkpoint schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::index::{Index, IndexEntry, Timestamp};
use crate::scanner::{hash_to_hex, hex_to_hash};

/// Current version of the checkpoint file format.
pub const CHECKPOINT_VERSION: u32 = 1;

/// A saved index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointFile {
    /// Format version.
    pub version: u32,
    /// When the checkpoint was written.
    pub created_at: DateTime<Utc>,
    /// SHA-256 of the compact JSON serialization of `entries`.
    pub checksum: String,
    /// One record per indexed file.
    pub entries: Vec<CheckpointRecord>,
}

/// One indexed file as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Absolute path of the file.
    #[serde(with = "raw_path")]
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// BLAKE3 content hash (hex).
    pub hash: String,
    /// Modification time; absent in older checkpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<Timestamp>,
}

impl CheckpointRecord {
    /// Build a record from an index entry.
    #[must_use]
    pub fn from_entry(path: &std::path::Path, entry: &IndexEntry) -> Self {
        Self {
            path: path.to_path_buf(),
            size: entry.size,
            hash: hash_to_hex(&entry.hash),
            modified: entry.modified,
        }
    }

    /// Convert back into an index entry, or `None` if the hash is malformed.
    #[must_use]
    pub fn to_entry(&self) -> Option<IndexEntry> {
        let hash = hex_to_hash(&self.hash)?;
        Some(IndexEntry::new(self.size, hash, self.modified))
    }
}

/// Flatten an index into records, sorted by path so that identical indexes
/// produce identical files.
#[must_use]
pub fn records_from_index(index: &Index) -> Vec<CheckpointRecord> {
    let mut records: Vec<CheckpointRecord> = index
        .iter()
        .map(|(path, entry)| CheckpointRecord::from_entry(path, entry))
        .collect();
    records.sort_by(|a, b| a.path.cmp(&b.path));
    records
}

/// Paths that are valid UTF-8 are stored as plain strings. Anything else is
/// stored as `{"raw": "<hex bytes>"}` so it survives a save and load intact.
mod raw_path {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
    use std::path::{Path, PathBuf};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Raw { raw: String },
    }

    pub fn serialize<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
        match path.to_str() {
            Some(text) => serializer.serialize_str(text),
            None => Repr::Raw {
                raw: encode(path),
            }
            .serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PathBuf, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => Ok(PathBuf::from(text)),
            Repr::Raw { raw } => {
                decode(&raw).ok_or_else(|| de::Error::custom(format!("invalid raw path '{raw}'")))
            }
        }
    }

    #[cfg(unix)]
    fn encode(path: &Path) -> String {
        use std::fmt::Write;
        use std::os::unix::ffi::OsStrExt;

        let bytes = path.as_os_str().as_bytes();
        let mut out = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            let _ = write!(out, "{byte:02X}");
        }
        out
    }

    #[cfg(unix)]
    fn decode(hex: &str) -> Option<PathBuf> {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        if hex.len() % 2 != 0 {
            return None;
        }
        let bytes = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
            .collect::<Option<Vec<u8>>>()?;
        Some(PathBuf::from(OsStr::from_bytes(&bytes)))
    }

    // Non-Unix paths that are not UTF-8 are rare; store them lossily.
    #[cfg(not(unix))]
    fn encode(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    #[cfg(not(unix))]
    fn decode(text: &str) -> Option<PathBuf> {
        Some(PathBuf::from(text))
    }
}
