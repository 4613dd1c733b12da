//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the fsindex binary.
///
/// - 0: Success (completed normally, results found)
/// - 1: General error (unexpected failure)
/// - 2: No results (search or duplicate query matched nothing)
/// - 3: Partial success (indexing skipped some files or a save failed)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: The command completed and produced results.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No results: The query completed but matched nothing.
    NoResults = 2,
    /// Partial success: Completed, but some items or saves failed.
    PartialSuccess = 3,
    /// Interrupted: Indexing was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "FX000",
            Self::GeneralError => "FX001",
            Self::NoResults => "FX002",
            Self::PartialSuccess => "FX003",
            Self::Interrupted => "FX130",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "FX001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}

/// Returned by the binary's command runner when indexing was interrupted.
///
/// The index has already been saved when this error is produced.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Indexing interrupted by user")]
pub struct Interrupted;
