//! Indexer module: concurrent traversal and hashing of a directory tree.
//!
//! # Architecture
//!
//! * [`queue`]: Blocking LIFO work queue with pause/quiesce support.
//! * [`scheduler`]: The worker pool, cancellation and checkpoint triggers.
//!
//! # Example
//!
//! ```no_run
//! use fsindex::index::Index;
//! use fsindex::indexer::{Indexer, IndexerConfig};
//! use std::path::Path;
//!
//! let indexer = Indexer::new(IndexerConfig::default().with_workers(4));
//! let outcome = indexer.run(Path::new("."), Index::new()).unwrap();
//! println!("{} files indexed", outcome.index.len());
//! ```

pub mod queue;
pub mod scheduler;

pub use queue::WorkQueue;
pub use scheduler::{
    IndexError, IndexOutcome, IndexSummary, Indexer, IndexerConfig, DEFAULT_CHECKPOINT_INTERVAL,
    DEFAULT_LARGE_FILE_THRESHOLD, DEFAULT_THROUGHPUT_WINDOW, DEFAULT_WORKERS,
};
