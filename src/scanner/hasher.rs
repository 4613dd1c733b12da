//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//! This module provides the [`Hasher`] struct for computing BLAKE3 hashes
//! of file contents. Files are read in bounded chunks so memory use does not
//! depend on file size.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::HashError;

/// A BLAKE3 content digest.
pub type Hash = [u8; 32];

/// Number of hex characters in an encoded [`Hash`].
pub const HASH_HEX_LEN: usize = 64;

/// Default read chunk size (64 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Streaming file hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    chunk_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default chunk size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Create a hasher that reads at most `chunk_size` bytes at a time.
    #[must_use]
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Configured chunk size in bytes.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Hash the full content of a file.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn hash_file(&self, path: &Path) -> Result<Hash, HashError> {
        self.hash_file_with_progress(path, |_, _| {})
    }

    /// Hash the full content of a file, reporting `(bytes_read, total)` after
    /// each chunk.
    ///
    /// `total` is the length reported by the open file handle; a file that
    /// grows while being read is still hashed to its end.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn hash_file_with_progress<F>(&self, path: &Path, mut on_chunk: F) -> Result<Hash, HashError>
    where
        F: FnMut(u64, u64),
    {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let total = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();

        let buf_len = usize::try_from(total)
            .unwrap_or(usize::MAX)
            .clamp(1, self.chunk_size);
        let mut buffer = vec![0u8; buf_len];
        let mut hasher = blake3::Hasher::new();
        let mut read_total = 0u64;

        loop {
            let n = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            hasher.update(&buffer[..n]);
            read_total += n as u64;
            on_chunk(read_total, total);
        }

        Ok(*hasher.finalize().as_bytes())
    }
}

/// Encode a hash as uppercase hex.
///
/// # Example
///
/// ```
/// use fsindex::scanner::hash_to_hex;
///
/// let hex = hash_to_hex(&[0xAB; 32]);
/// assert_eq!(hex.len(), 64);
/// assert!(hex.starts_with("ABAB"));
/// ```
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(HASH_HEX_LEN);
    for byte in hash {
        let _ = write!(out, "{byte:02X}");
    }
    out
}

/// Decode a hex string (either case) into a hash.
///
/// Returns `None` unless the input is exactly [`HASH_HEX_LEN`] hex digits.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Hash> {
    let bytes = hex.as_bytes();
    if bytes.len() != HASH_HEX_LEN {
        return None;
    }

    let mut hash = [0u8; 32];
    for (i, pair) in bytes.chunks_exact(2).enumerate() {
        let hi = hex_digit(pair[0])?;
        let lo = hex_digit(pair[1])?;
        hash[i] = (hi << 4) | lo;
    }
    Some(hash)
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
