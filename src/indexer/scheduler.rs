//! Indexing run: bounded worker pool, cancellation and periodic checkpoints.
//!
//! # Overview
//!
//! [`Indexer::run`] seeds a [`WorkQueue`] with the root directory and starts
//! `workers` threads on a dedicated rayon pool. Each worker pops one item at a
//! time: files are fingerprinted and committed to the shared index, directories
//! are expanded and their children pushed back. The calling thread coordinates:
//! it watches the shutdown flag, publishes progress and takes checkpoints.
//!
//! # Checkpoints
//!
//! Every `checkpoint_interval` the coordinator pauses the queue, waits until no
//! worker holds an item, clones the index and resumes. The clone is written on
//! a background thread by the [`CheckpointWriter`]. A final save runs when the
//! run ends, whether it finished or was interrupted.
//!
//! # Cancellation
//!
//! When the shutdown flag is set the queue is closed. Workers finish the file
//! they are reading, but any result that completes after the interrupt is
//! discarded, so the saved index never contains work from after the signal.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::queue::WorkQueue;
use crate::checkpoint::CheckpointWriter;
use crate::index::Index;
use crate::progress::{ProgressSink, ProgressTracker};
use crate::scanner::fingerprint::fingerprint_with_progress;
use crate::scanner::{Fingerprint, Hasher, Walker, WalkerConfig, WorkItem, DEFAULT_CHUNK_SIZE};

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 16;

/// Default time between periodic checkpoints.
pub const DEFAULT_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(600);

/// Default number of completions per throughput sample.
pub const DEFAULT_THROUGHPUT_WINDOW: usize = 10;

/// Files at least this large report per-chunk hashing progress.
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 100_000_000;

const TICK: Duration = Duration::from_millis(100);

/// Configuration for an indexing run.
#[derive(Clone)]
pub struct IndexerConfig {
    /// Number of worker threads (at least 1).
    pub workers: usize,
    /// Time between periodic checkpoints.
    pub checkpoint_interval: Duration,
    /// Completions per throughput sample.
    pub throughput_window: usize,
    /// Size from which per-file progress is reported.
    pub large_file_threshold: u64,
    /// Read chunk size for hashing.
    pub chunk_size: usize,
    /// Traversal options.
    pub walker: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress sink.
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl std::fmt::Debug for IndexerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexerConfig")
            .field("workers", &self.workers)
            .field("checkpoint_interval", &self.checkpoint_interval)
            .field("throughput_window", &self.throughput_window)
            .field("large_file_threshold", &self.large_file_threshold)
            .field("chunk_size", &self.chunk_size)
            .field("walker", &self.walker)
            .field("shutdown_flag", &self.shutdown_flag)
            .field("progress", &self.progress.as_ref().map(|_| "<sink>"))
            .finish()
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            throughput_window: DEFAULT_THROUGHPUT_WINDOW,
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            walker: WalkerConfig::default(),
            shutdown_flag: None,
            progress: None,
        }
    }
}

impl IndexerConfig {
    /// Set the number of worker threads.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the periodic checkpoint interval.
    #[must_use]
    pub fn with_checkpoint_interval(mut self, interval: Duration) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Set the throughput sampling window.
    #[must_use]
    pub fn with_throughput_window(mut self, window: usize) -> Self {
        self.throughput_window = window.max(1);
        self
    }

    /// Set the per-file progress threshold.
    #[must_use]
    pub fn with_large_file_threshold(mut self, bytes: u64) -> Self {
        self.large_file_threshold = bytes;
        self
    }

    /// Set the hashing chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    /// Follow symbolic links.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.walker.follow_symlinks = follow;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress sink.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }
}

/// Errors that prevent an indexing run from starting.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// The root does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The root could not be inspected.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Statistics of one indexing run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSummary {
    /// Work items (files and directories) processed.
    pub scanned: usize,
    /// Files whose content was hashed.
    pub hashed: usize,
    /// Files skipped because their size and mtime were unchanged.
    pub unchanged: usize,
    /// Files that could not be read.
    pub failed_files: usize,
    /// Directories that could not be listed.
    pub failed_dirs: usize,
    /// Stale entries removed after a complete run.
    pub pruned: usize,
    /// Checkpoints written, including the final one.
    pub checkpoints_written: usize,
    /// Checkpoint saves that failed.
    pub checkpoints_failed: usize,
    /// Periodic triggers skipped because a save was still running.
    pub checkpoints_dropped: usize,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
    /// Whether the run was cancelled.
    pub interrupted: bool,
    /// Error of the final save, if it failed.
    pub final_save_error: Option<String>,
}

impl IndexSummary {
    /// Whether any file, directory or save failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed_files > 0
            || self.failed_dirs > 0
            || self.checkpoints_failed > 0
            || self.final_save_error.is_some()
    }
}

/// Result of an indexing run.
#[derive(Debug, Clone)]
pub struct IndexOutcome {
    /// The updated index.
    pub index: Index,
    /// Run statistics.
    pub summary: IndexSummary,
}

/// Runs indexing passes over a directory tree.
pub struct Indexer {
    config: IndexerConfig,
    writer: Option<Arc<CheckpointWriter>>,
}

impl Indexer {
    /// Create an indexer without checkpointing.
    #[must_use]
    pub fn new(config: IndexerConfig) -> Self {
        Self {
            config,
            writer: None,
        }
    }

    /// Save periodic and final checkpoints through `writer`.
    #[must_use]
    pub fn with_checkpoint_writer(mut self, writer: Arc<CheckpointWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Index everything under `root`, starting from `baseline`.
    ///
    /// Entries of `baseline` whose size and mtime still match are kept without
    /// re-hashing. After a complete run, entries under `root` that no longer
    /// exist are removed; entries outside `root` are never touched.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if the root is invalid or the worker pool cannot
    /// be built. Failures on individual files and directories are counted in
    /// the summary instead.
    pub fn run(&self, root: &Path, baseline: Index) -> Result<IndexOutcome, IndexError> {
        let root = validate_root(root)?;
        let started = Instant::now();
        let workers = self.config.workers.max(1);

        log::info!(
            "Indexing {} with {} workers ({} entries known)",
            root.display(),
            workers,
            baseline.len()
        );

        let saving = self
            .writer
            .as_ref()
            .map_or_else(|| Arc::new(AtomicBool::new(false)), |w| w.saving_flag());
        let (written_before, failed_before, dropped_before) = self
            .writer
            .as_ref()
            .map_or((0, 0, 0), |w| (w.written(), w.failed(), w.dropped()));

        let run = RunState::new(&self.config, baseline, saving);
        run.queue.push(WorkItem::Directory(root.clone()));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("fsindex-worker-{i}"))
            .build()
            .map_err(|e| IndexError::ThreadPool(e.to_string()))?;

        let interrupted = pool.in_place_scope(|scope| {
            let run = &run;
            for _ in 0..workers {
                scope.spawn(move |_| run.worker_loop());
            }
            self.coordinate(run)
        });

        let RunState {
            index,
            seen,
            unlisted,
            tracker,
            counters,
            progress,
            ..
        } = run;
        let mut index = index.into_inner().unwrap_or_else(PoisonError::into_inner);

        let pruned = if interrupted {
            log::info!("Indexing interrupted, saving progress");
            0
        } else {
            let seen = seen.into_inner().unwrap_or_else(PoisonError::into_inner);
            let unlisted = unlisted.into_inner().unwrap_or_else(PoisonError::into_inner);
            let pruned = index.prune_under(&root, &seen, &unlisted);
            if pruned > 0 {
                log::info!("Removed {} entries for files that no longer exist", pruned);
            }
            pruned
        };

        let final_save_error = self.writer.as_ref().and_then(|writer| {
            if let Some(sink) = &progress {
                sink.on_message("Saving index...");
            }
            writer.save_blocking(&index).err().map(|e| e.to_string())
        });

        let snapshot = tracker.snapshot();
        if let Some(sink) = &progress {
            sink.on_finish(&snapshot);
        }

        let (checkpoints_written, checkpoints_failed, checkpoints_dropped) = self
            .writer
            .as_ref()
            .map_or((0, 0, 0), |w| {
                (
                    w.written() - written_before,
                    w.failed() - failed_before,
                    w.dropped() - dropped_before,
                )
            });

        let summary = IndexSummary {
            scanned: snapshot.scanned,
            hashed: counters.hashed.load(Ordering::SeqCst),
            unchanged: counters.unchanged.load(Ordering::SeqCst),
            failed_files: counters.failed_files.load(Ordering::SeqCst),
            failed_dirs: counters.failed_dirs.load(Ordering::SeqCst),
            pruned,
            checkpoints_written,
            checkpoints_failed,
            checkpoints_dropped,
            elapsed: started.elapsed(),
            interrupted,
            final_save_error,
        };

        log::info!(
            "Indexed {} files ({} hashed, {} unchanged, {} failed) in {:.2?}",
            summary.hashed + summary.unchanged,
            summary.hashed,
            summary.unchanged,
            summary.failed_files,
            summary.elapsed
        );

        Ok(IndexOutcome { index, summary })
    }

    /// Coordination loop on the calling thread. Returns whether the run was
    /// interrupted.
    fn coordinate(&self, run: &RunState) -> bool {
        let mut last_checkpoint = Instant::now();

        loop {
            if run.is_cancelled() {
                run.queue.close();
                return true;
            }

            if run.queue.wait_drained(TICK) {
                run.queue.close();
                // Workers skip items once the flag is set, so a drained queue
                // alone does not mean the tree was fully seen.
                return run.is_cancelled();
            }

            run.publish_progress();

            if let Some(writer) = &self.writer {
                if last_checkpoint.elapsed() >= self.config.checkpoint_interval {
                    self.periodic_checkpoint(run, writer);
                    last_checkpoint = Instant::now();
                }
            }
        }
    }

    fn periodic_checkpoint(&self, run: &RunState, writer: &CheckpointWriter) {
        if writer.is_saving() {
            writer.record_dropped();
            return;
        }

        run.queue.pause();
        while !run.queue.wait_quiesced(TICK) {
            if run.is_cancelled() {
                run.queue.resume();
                return;
            }
            run.publish_progress();
        }

        let snapshot = run.lock_index().clone();
        run.queue.resume();

        log::debug!("Starting checkpoint of {} entries", snapshot.len());
        if writer.save_in_background(snapshot) {
            if let Some(sink) = &run.progress {
                sink.on_message("Checkpoint started");
            }
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hashed: AtomicUsize,
    unchanged: AtomicUsize,
    failed_files: AtomicUsize,
    failed_dirs: AtomicUsize,
}

/// State shared between the coordinator and the workers of one run.
struct RunState {
    queue: WorkQueue,
    index: Mutex<Index>,
    /// Files confirmed present (or unreadable) during this run.
    seen: Mutex<HashSet<PathBuf>>,
    /// Directories that exist but could not be listed.
    unlisted: Mutex<Vec<PathBuf>>,
    walker: Walker,
    hasher: Hasher,
    tracker: ProgressTracker,
    counters: Counters,
    shutdown: Option<Arc<AtomicBool>>,
    progress: Option<Arc<dyn ProgressSink>>,
    large_file_threshold: u64,
}

impl RunState {
    fn new(config: &IndexerConfig, baseline: Index, saving: Arc<AtomicBool>) -> Self {
        Self {
            queue: WorkQueue::new(),
            index: Mutex::new(baseline),
            seen: Mutex::new(HashSet::new()),
            unlisted: Mutex::new(Vec::new()),
            walker: Walker::new(config.walker.clone()),
            hasher: Hasher::with_chunk_size(config.chunk_size),
            tracker: ProgressTracker::new(config.throughput_window, saving),
            counters: Counters::default(),
            shutdown: config.shutdown_flag.clone(),
            progress: config.progress.clone(),
            large_file_threshold: config.large_file_threshold,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn lock_index(&self) -> MutexGuard<'_, Index> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_progress(&self) {
        self.tracker.set_pending(self.queue.len());
        if let Some(sink) = &self.progress {
            sink.on_snapshot(&self.tracker.snapshot());
        }
    }

    fn worker_loop(&self) {
        while let Some(item) = self.queue.pop() {
            if !self.is_cancelled() {
                match item {
                    WorkItem::File(path) => self.process_file(path),
                    WorkItem::Directory(dir) => self.process_directory(&dir),
                }
                self.tracker.record_item();
            }
            self.queue.complete();
        }
    }

    fn process_directory(&self, dir: &Path) {
        match self.walker.expand(dir) {
            Ok(children) => self.queue.extend(children),
            Err(e) => {
                self.counters.failed_dirs.fetch_add(1, Ordering::Relaxed);
                if e.is_vanished() {
                    log::debug!("Directory vanished before listing: {}", e);
                } else {
                    log::warn!("Skipping directory: {}", e);
                    self.unlisted
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(dir.to_path_buf());
                }
            }
        }
    }

    fn process_file(&self, path: PathBuf) {
        let previous = self.lock_index().get(&path).cloned();

        let threshold = self.large_file_threshold;
        let sink = self.progress.as_deref();
        let result = fingerprint_with_progress(&self.hasher, &path, previous.as_ref(), |read, total| {
            if total >= threshold {
                if let Some(sink) = sink {
                    sink.on_file_progress(&path, read, total);
                }
            }
        });

        match result {
            Ok(Fingerprint::Unchanged) => {
                if self.is_cancelled() {
                    return;
                }
                self.counters.unchanged.fetch_add(1, Ordering::Relaxed);
                self.mark_seen(path);
            }
            Ok(Fingerprint::Hashed(entry)) => {
                {
                    let mut index = self.lock_index();
                    if self.is_cancelled() {
                        log::debug!("Discarding hash finished after interrupt: {}", path.display());
                        return;
                    }
                    index.insert(path.clone(), entry);
                }
                self.counters.hashed.fetch_add(1, Ordering::Relaxed);
                self.tracker.record_hashed();
                self.mark_seen(path);
            }
            Err(e) => {
                self.counters.failed_files.fetch_add(1, Ordering::Relaxed);
                if e.is_vanished() {
                    log::debug!("File vanished before hashing: {}", e);
                } else {
                    // Still there: keep whatever the index already holds.
                    log::warn!("Skipping file: {}", e);
                    self.mark_seen(path);
                }
            }
        }
    }

    fn mark_seen(&self, path: PathBuf) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path);
    }
}

/// Check that `root` is an existing directory and canonicalize it.
fn validate_root(root: &Path) -> Result<PathBuf, IndexError> {
    let metadata = std::fs::metadata(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IndexError::PathNotFound(root.to_path_buf()),
        _ => IndexError::Io {
            path: root.to_path_buf(),
            source: e,
        },
    })?;

    if !metadata.is_dir() {
        return Err(IndexError::NotADirectory(root.to_path_buf()));
    }

    std::fs::canonicalize(root).map_err(|e| IndexError::Io {
        path: root.to_path_buf(),
        source: e,
    })
}
