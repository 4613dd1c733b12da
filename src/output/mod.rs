//! Output formatters for query results.
//!
//! - CSV export of the whole index
//! - JSON for search hits and duplicate groups
//!
//! # Example
//!
//! ```no_run
//! use fsindex::checkpoint::CheckpointStore;
//! use fsindex::duplicates::find_duplicates;
//! use fsindex::error::ExitCode;
//! use fsindex::output::json::{write_json, JsonDuplicatesOutput};
//!
//! let index = CheckpointStore::new("index.json").load_or_empty();
//! let groups = find_duplicates(index);
//! let output = JsonDuplicatesOutput::new(&groups, ExitCode::Success);
//! write_json(&output, &mut std::io::stdout(), true).unwrap();
//! ```

pub mod csv;
pub mod json;

// Re-export main types
pub use csv::{CsvExport, CsvOutputError};
pub use json::{JsonDuplicatesOutput, JsonOutputError, JsonSearchOutput};
