//! Index entry definitions.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::scanner::Hash;

/// A modification time with nanosecond precision, relative to the Unix epoch.
///
/// Stored as signed seconds plus a non-negative nanosecond part so that
/// pre-epoch timestamps survive a checkpoint round-trip unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Whole seconds since the epoch (negative before 1970).
    pub secs: i64,
    /// Sub-second part, always in `0..1_000_000_000`.
    pub nanos: u32,
}

impl Timestamp {
    /// Create a timestamp from raw parts.
    #[must_use]
    pub fn new(secs: i64, nanos: u32) -> Self {
        Self { secs, nanos }
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self {
                secs: d.as_secs() as i64,
                nanos: d.subsec_nanos(),
            },
            Err(e) => {
                let d = e.duration();
                let mut secs = -(d.as_secs() as i64);
                let mut nanos = d.subsec_nanos();
                if nanos > 0 {
                    secs -= 1;
                    nanos = 1_000_000_000 - nanos;
                }
                Self { secs, nanos }
            }
        }
    }
}

impl Timestamp {
    /// Convert back to a [`SystemTime`].
    ///
    /// Returns `None` when the value is outside what the platform clock can
    /// represent or `nanos` is out of range.
    #[must_use]
    pub fn to_system_time(self) -> Option<SystemTime> {
        if self.nanos >= 1_000_000_000 {
            return None;
        }
        let nanos = Duration::from_nanos(u64::from(self.nanos));
        if self.secs >= 0 {
            UNIX_EPOCH
                .checked_add(Duration::from_secs(self.secs.unsigned_abs()))?
                .checked_add(nanos)
        } else {
            UNIX_EPOCH
                .checked_sub(Duration::from_secs(self.secs.unsigned_abs()))?
                .checked_add(nanos)
        }
    }
}

/// Represents a single indexed file.
///
/// The path is the key of the [`Index`](super::Index) map and is not repeated
/// here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// File size in bytes at the time the hash was computed.
    pub size: u64,
    /// BLAKE3 digest of the full file content.
    pub hash: Hash,
    /// Modification time at the time the hash was computed.
    ///
    /// `None` for entries loaded from checkpoints that did not record it;
    /// such entries are always re-hashed.
    pub modified: Option<Timestamp>,
}

impl IndexEntry {
    /// Create a new entry.
    #[must_use]
    pub fn new(size: u64, hash: Hash, modified: Option<Timestamp>) -> Self {
        Self {
            size,
            hash,
            modified,
        }
    }

    /// Whether a file with the given size and mtime can reuse this entry's hash.
    ///
    /// An entry without a recorded mtime never matches.
    #[must_use]
    pub fn matches_fingerprint(&self, size: u64, modified: Timestamp) -> bool {
        self.size == size && self.modified == Some(modified)
    }
}
