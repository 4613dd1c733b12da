//! CSV export of the whole index.
//!
//! One row per indexed file, for spreadsheets and other tools.
//!
//! # Columns
//!
//! - `path`: Absolute path to the file
//! - `size`: File size in bytes
//! - `hash`: BLAKE3 content hash (uppercase hexadecimal)
//! - `modified`: Last modified time (RFC 3339), or `-1` when unknown
//!
//! # Example
//!
//! ```no_run
//! use fsindex::checkpoint::CheckpointStore;
//! use fsindex::output::csv::CsvExport;
//!
//! let store = CheckpointStore::new("index.json");
//! let index = store.load_or_empty();
//! CsvExport::new(&index).write_to(std::io::stdout()).unwrap();
//! ```

use std::io;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::index::{Index, Timestamp};
use crate::scanner::hash_to_hex;

/// Value of the `modified` column when the time is unknown.
pub const UNKNOWN_MODIFIED: &str = "-1";

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A single row in the CSV output.
#[derive(Debug, Serialize)]
struct CsvRow {
    path: String,
    size: u64,
    hash: String,
    modified: String,
}

/// CSV exporter for an index.
pub struct CsvExport<'a> {
    index: &'a Index,
}

impl<'a> CsvExport<'a> {
    /// Create a new exporter.
    #[must_use]
    pub fn new(index: &'a Index) -> Self {
        Self { index }
    }

    /// Write the header and one row per entry, in index iteration order.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<usize, CsvOutputError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        // Written explicitly so an empty index still gets a header.
        csv_writer.write_record(["path", "size", "hash", "modified"])?;

        let mut rows = 0;
        for (path, entry) in self.index.iter() {
            csv_writer.serialize(CsvRow {
                path: path.to_string_lossy().to_string(),
                size: entry.size,
                hash: hash_to_hex(&entry.hash),
                modified: entry
                    .modified
                    .and_then(format_modified)
                    .unwrap_or_else(|| UNKNOWN_MODIFIED.to_string()),
            })?;
            rows += 1;
        }

        csv_writer.flush()?;
        log::debug!("Exported {} rows", rows);
        Ok(rows)
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

/// RFC 3339 form of `timestamp`, or `None` if it cannot be represented.
fn format_modified(timestamp: Timestamp) -> Option<String> {
    let datetime: DateTime<Utc> = DateTime::from_timestamp(timestamp.secs, timestamp.nanos)?;
    Some(datetime.to_rfc3339())
}
