//! Incremental fingerprint policy.
//!
//! A file's fingerprint is its `(size, modified)` pair. When both match the
//! previously indexed entry the stored hash is trusted and the file content is
//! not read again. This is a deliberate trade-off: a file rewritten without a
//! change in size or mtime (within the filesystem's timestamp resolution)
//! keeps a stale hash.

use std::path::Path;

use super::{HashError, Hasher};
use crate::index::{IndexEntry, Timestamp};

/// Outcome of fingerprinting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    /// Size and mtime match the previous entry; its hash is kept as-is.
    Unchanged,
    /// The file was (re-)hashed; this entry fully replaces any previous one.
    Hashed(IndexEntry),
}

/// Fingerprint a file against its previous index entry.
///
/// # Errors
///
/// Returns [`HashError`] if the file's metadata cannot be read, it is no
/// longer a regular file, or its content cannot be read.
pub fn fingerprint(
    hasher: &Hasher,
    path: &Path,
    previous: Option<&IndexEntry>,
) -> Result<Fingerprint, HashError> {
    fingerprint_with_progress(hasher, path, previous, |_, _| {})
}

/// Like [`fingerprint`], forwarding per-chunk progress while hashing.
///
/// # Errors
///
/// See [`fingerprint`].
pub fn fingerprint_with_progress<F>(
    hasher: &Hasher,
    path: &Path,
    previous: Option<&IndexEntry>,
    on_chunk: F,
) -> Result<Fingerprint, HashError>
where
    F: FnMut(u64, u64),
{
    let metadata = std::fs::metadata(path).map_err(|e| HashError::from_io(path, e))?;
    if !metadata.is_file() {
        return Err(HashError::NotAFile(path.to_path_buf()));
    }

    let size = metadata.len();
    let modified = metadata.modified().ok().map(Timestamp::from);

    if let (Some(prev), Some(mtime)) = (previous, modified) {
        if prev.matches_fingerprint(size, mtime) {
            log::trace!("Fingerprint unchanged: {}", path.display());
            return Ok(Fingerprint::Unchanged);
        }
    }

    let hash = hasher.hash_file_with_progress(path, on_chunk)?;
    log::trace!("Hashed: {}", path.display());

    Ok(Fingerprint::Hashed(IndexEntry::new(size, hash, modified)))
}
