//! Command-line interface definitions for fsindex.
//!
//! # Example
//!
//! ```bash
//! # Build or refresh the index of a directory
//! fsindex index ~/Documents
//!
//! # Find files by path substring, by /regex/ or by content hash
//! fsindex search report
//! fsindex search '/\/home\/.*\.pdf/'
//! fsindex -s 9F86D081884C7D659A2FEAA0C55AD015A3BF4F1B2B0B822CD15D6C15B0F00A08
//!
//! # List duplicate groups, or export everything as CSV
//! fsindex duplicates --output json
//! fsindex export index.csv
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Persistent content-addressable file index.
///
/// Indexes a directory tree by content hash, then answers path, regex and
/// hash queries, reports duplicates and exports CSV, all from the saved index.
#[derive(Debug, Parser)]
#[command(name = "fsindex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Checkpoint file to load and save the index
    #[arg(long, value_name = "FILE", global = true)]
    pub checkpoint: Option<PathBuf>,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Disable the progress spinner (progress is logged instead)
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Search the saved index (cannot be combined with a subcommand)
    #[arg(short, long, value_name = "QUERY")]
    pub search: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Index a directory tree, updating the saved index
    Index(IndexArgs),
    /// Search the saved index
    Search(SearchArgs),
    /// List groups of files with identical content
    Duplicates(DuplicatesArgs),
    /// Export the saved index as CSV
    Export(ExportArgs),
}

/// Arguments for the index subcommand.
#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Directory to index
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Number of worker threads (default: 16)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: Option<u64>,

    /// Seconds between periodic checkpoints (default: 600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Number of previous checkpoints to keep (default: 2)
    #[arg(long, value_name = "N")]
    pub backups: Option<usize>,

    /// Follow symbolic links (cycles are detected)
    #[arg(long)]
    pub follow_symlinks: bool,
}

/// Arguments for the search subcommand.
#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Path substring, /regex/ anchored at the path start, or a 64-char hash
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the duplicates subcommand.
#[derive(Debug, Args)]
pub struct DuplicatesArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the export subcommand.
#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Destination CSV file, or - for stdout
    #[arg(value_name = "FILE")]
    pub target: PathBuf,
}

impl ExportArgs {
    /// Whether the export goes to stdout.
    #[must_use]
    pub fn is_stdout(&self) -> bool {
        self.target.as_os_str() == "-"
    }
}

/// Output format for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// JSON for scripting
    Json,
}
