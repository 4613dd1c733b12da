//! JSON output for search results and duplicate groups.
//!
//! Provides machine-readable output for scripting and automation.
//!
//! # Output Schemas
//!
//! Search:
//!
//! ```json
//! {
//!   "query": "report",
//!   "mode": "substring",
//!   "hits": [
//!     { "path": "/docs/report.txt", "hash": "AB12...", "size": 1024 }
//!   ],
//!   "scanned": 5000,
//!   "elapsed_ms": 3
//! }
//! ```
//!
//! Duplicates:
//!
//! ```json
//! {
//!   "duplicates": [
//!     { "hash": "AB12...", "size": 1024, "files": ["/a.txt", "/b.txt"] }
//!   ],
//!   "summary": {
//!     "duplicate_groups": 1,
//!     "duplicate_files": 1,
//!     "reclaimable_space": 1024,
//!     "exit_code": 0,
//!     "exit_code_name": "FX000"
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{DuplicateGroup, DuplicateSummary};
use crate::error::ExitCode;
use crate::search::{SearchHit, SearchMode, SearchReport};

/// Search results in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSearchOutput<'a> {
    /// The query as typed
    pub query: &'a str,
    /// How the query was matched
    pub mode: SearchMode,
    /// Matching entries
    pub hits: &'a [SearchHit],
    /// Number of entries examined
    pub scanned: usize,
    /// Scan time in milliseconds
    pub elapsed_ms: u64,
}

impl<'a> JsonSearchOutput<'a> {
    /// Create the JSON view of a search report.
    #[must_use]
    pub fn new(query: &'a str, report: &'a SearchReport) -> Self {
        Self {
            query,
            mode: report.mode,
            hits: &report.hits,
            scanned: report.scanned,
            elapsed_ms: report.elapsed.as_millis() as u64,
        }
    }
}

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// BLAKE3 hash as hexadecimal string (64 characters)
    pub hash: String,
    /// File size in bytes
    pub size: u64,
    /// Paths to all copies
    pub files: Vec<String>,
}

impl JsonDuplicateGroup {
    /// Create a JSON duplicate group from a DuplicateGroup.
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup) -> Self {
        Self {
            hash: group.hash_hex(),
            size: group.size,
            files: group
                .paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Total number of redundant copies
    pub duplicate_files: usize,
    /// Bytes freed by keeping one copy per group
    pub reclaimable_space: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "FX000")
    pub exit_code_name: String,
}

/// Duplicate report in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicatesOutput {
    /// List of duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Summary statistics
    pub summary: JsonSummary,
}

impl JsonDuplicatesOutput {
    /// Create a new JSON output from duplicate groups and an exit code.
    #[must_use]
    pub fn new(groups: &[DuplicateGroup], exit_code: ExitCode) -> Self {
        let summary = DuplicateSummary::from_groups(groups);
        Self {
            duplicates: groups
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
            summary: JsonSummary {
                duplicate_groups: summary.duplicate_groups,
                duplicate_files: summary.duplicate_files,
                reclaimable_space: summary.reclaimable_space,
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}

/// Write `value` as JSON followed by a newline.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<T, W>(value: &T, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError>
where
    T: Serialize,
    W: Write,
{
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, value)?;
    } else {
        serde_json::to_writer(&mut *writer, value)?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}
