//! Query engine: path, regex and content-hash search over an index.
//!
//! # Query syntax
//!
//! A query is interpreted in this order:
//!
//! 1. Exactly [`HASH_HEX_LEN`] characters: a content-hash lookup. The text
//!    must decode as hex (either case); otherwise the query is rejected.
//! 2. Starts and ends with `/`: a regular expression matched against the
//!    start of each path (`/\/home\/.*\.rs/` finds Rust files under `/home`).
//! 3. Anything else: a case-insensitive substring of the path.
//!
//! # Example
//!
//! ```
//! use fsindex::index::{Index, IndexEntry};
//! use fsindex::search::{search, SearchMode, SearchQuery};
//! use std::path::PathBuf;
//!
//! let mut index = Index::new();
//! index.insert(PathBuf::from("/docs/Report.txt"), IndexEntry::new(10, [1u8; 32], None));
//!
//! let query = SearchQuery::parse("report").unwrap();
//! assert_eq!(query.mode(), SearchMode::Substring);
//!
//! let report = search(&index, &query);
//! assert_eq!(report.hits.len(), 1);
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use regex::Regex;
use serde::Serialize;

use crate::index::Index;
use crate::scanner::{hash_to_hex, hex_to_hash, Hash, HASH_HEX_LEN};

/// A query that could not be parsed.
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    /// A hash-length query that is not valid hex.
    #[error("Invalid hash '{0}': expected {len} hexadecimal characters", len = HASH_HEX_LEN)]
    InvalidHash(String),

    /// A `/pattern/` query with a malformed pattern.
    #[error("Invalid regular expression '{pattern}': {source}")]
    InvalidRegex {
        /// The pattern between the slashes
        pattern: String,
        /// The underlying regex error
        #[source]
        source: regex::Error,
    },
}

/// How a query is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Case-insensitive path substring.
    Substring,
    /// Regular expression anchored at the start of the path.
    Regex,
    /// Exact content hash.
    Hash,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Substring => write!(f, "substring"),
            Self::Regex => write!(f, "regex"),
            Self::Hash => write!(f, "hash"),
        }
    }
}

/// A parsed query.
#[derive(Debug, Clone)]
pub enum SearchQuery {
    /// Lowercased needle.
    Substring(String),
    /// Compiled pattern; only matches beginning at offset 0 count.
    Regex(Regex),
    /// Content hash to look for.
    Hash(Hash),
}

impl SearchQuery {
    /// Parse query text.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] for hash-length text that is not hex, or for a
    /// `/pattern/` whose pattern does not compile.
    pub fn parse(text: &str) -> Result<Self, QueryError> {
        if text.chars().count() == HASH_HEX_LEN {
            return hex_to_hash(text)
                .map(Self::Hash)
                .ok_or_else(|| QueryError::InvalidHash(text.to_string()));
        }

        if text.len() >= 2 && text.starts_with('/') && text.ends_with('/') {
            let pattern = &text[1..text.len() - 1];
            let regex = Regex::new(pattern).map_err(|source| QueryError::InvalidRegex {
                pattern: pattern.to_string(),
                source,
            })?;
            return Ok(Self::Regex(regex));
        }

        Ok(Self::Substring(text.to_lowercase()))
    }

    /// The matching mode of this query.
    #[must_use]
    pub fn mode(&self) -> SearchMode {
        match self {
            Self::Substring(_) => SearchMode::Substring,
            Self::Regex(_) => SearchMode::Regex,
            Self::Hash(_) => SearchMode::Hash,
        }
    }

    fn matches(&self, path: &str, hash: &Hash) -> bool {
        match self {
            Self::Substring(needle) => path.to_lowercase().contains(needle.as_str()),
            // Leftmost match: any match at the path start is found first.
            Self::Regex(regex) => regex.find(path).is_some_and(|m| m.start() == 0),
            Self::Hash(wanted) => wanted == hash,
        }
    }
}

/// One matching entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    /// Path of the file.
    #[serde(serialize_with = "serialize_lossy")]
    pub path: PathBuf,
    /// Content hash (uppercase hex).
    pub hash: String,
    /// File size in bytes.
    pub size: u64,
}

fn serialize_lossy<S: serde::Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

/// Result of a search.
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// How the query was matched.
    pub mode: SearchMode,
    /// Matching entries, sorted by path.
    pub hits: Vec<SearchHit>,
    /// Number of entries examined.
    pub scanned: usize,
    /// Time spent scanning.
    pub elapsed: Duration,
}

impl SearchReport {
    /// Whether nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Scan `index` for entries matching `query`.
#[must_use]
pub fn search(index: &Index, query: &SearchQuery) -> SearchReport {
    let started = Instant::now();

    let mut hits: Vec<SearchHit> = index
        .iter()
        .filter(|(path, entry)| query.matches(&path.to_string_lossy(), &entry.hash))
        .map(|(path, entry)| SearchHit {
            path: path.clone(),
            hash: hash_to_hex(&entry.hash),
            size: entry.size,
        })
        .collect();
    hits.sort_by(|a, b| a.path.cmp(&b.path));

    let report = SearchReport {
        mode: query.mode(),
        hits,
        scanned: index.len(),
        elapsed: started.elapsed(),
    };

    log::debug!(
        "{} search found {} of {} entries in {:.3?}",
        report.mode,
        report.hits.len(),
        report.scanned,
        report.elapsed
    );

    report
}
