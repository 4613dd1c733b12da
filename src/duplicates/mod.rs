//! Duplicate detection module.
//!
//! Duplicates are found purely from the index: entries with equal content
//! hashes form a group. No file is read.

pub mod groups;

pub use groups::{find_duplicates, DuplicateGroup, DuplicateSummary};
