//! Progress tracking and reporting.
//!
//! The indexer keeps its counters in a [`ProgressTracker`] (atomics only, so
//! workers never wait on a reader). Front ends either poll
//! [`ProgressTracker::snapshot`] or register a [`ProgressSink`], which the
//! indexer's coordination thread calls on every tick.
//!
//! Two sinks are provided:
//! - [`ConsoleProgress`]: an indicatif spinner for interactive terminals
//! - [`LogProgress`]: periodic log lines for non-interactive runs

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Point-in-time view of an indexing run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    /// Work items (files and directories) processed so far.
    pub scanned: usize,
    /// Work items waiting in the queue.
    pub pending: usize,
    /// Files whose content was hashed this run.
    pub hashed: usize,
    /// Files per second over the most recent sampling window.
    pub throughput: f64,
    /// Time since the run started.
    pub elapsed: Duration,
    /// Whether a checkpoint save is in progress.
    pub saving: bool,
}

/// Receives progress updates from the indexer.
///
/// All methods have empty defaults; implement only what you render.
pub trait ProgressSink: Send + Sync {
    /// Called periodically from the indexer's coordination thread.
    fn on_snapshot(&self, _snapshot: &ProgressSnapshot) {}

    /// Called from a worker after each chunk of a large file is hashed.
    fn on_file_progress(&self, _path: &Path, _read: u64, _total: u64) {}

    /// Called for notable events (checkpoint written, cancellation).
    fn on_message(&self, _message: &str) {}

    /// Called once when the run is over.
    fn on_finish(&self, _snapshot: &ProgressSnapshot) {}
}

/// Shared counters for one indexing run.
#[derive(Debug)]
pub struct ProgressTracker {
    started: Instant,
    scanned: AtomicUsize,
    hashed: AtomicUsize,
    pending: AtomicUsize,
    throughput_bits: AtomicU64,
    window: usize,
    window_start: Mutex<Instant>,
    saving: Arc<AtomicBool>,
}

impl ProgressTracker {
    /// Create a tracker sampling throughput every `window` completions.
    #[must_use]
    pub fn new(window: usize, saving: Arc<AtomicBool>) -> Self {
        let now = Instant::now();
        Self {
            started: now,
            scanned: AtomicUsize::new(0),
            hashed: AtomicUsize::new(0),
            pending: AtomicUsize::new(0),
            throughput_bits: AtomicU64::new(0f64.to_bits()),
            window: window.max(1),
            window_start: Mutex::new(now),
            saving,
        }
    }

    /// Record one processed work item.
    pub fn record_item(&self) {
        let n = self.scanned.fetch_add(1, Ordering::Relaxed) + 1;
        if n % self.window == 0 {
            if let Ok(mut start) = self.window_start.lock() {
                let secs = start.elapsed().as_secs_f64();
                if secs > 0.0 {
                    let rate = self.window as f64 / secs;
                    self.throughput_bits.store(rate.to_bits(), Ordering::Relaxed);
                }
                *start = Instant::now();
            }
        }
    }

    /// Record one file whose content was hashed.
    pub fn record_hashed(&self) {
        self.hashed.fetch_add(1, Ordering::Relaxed);
    }

    /// Update the pending-work gauge.
    pub fn set_pending(&self, pending: usize) {
        self.pending.store(pending, Ordering::Relaxed);
    }

    /// Current state of the run.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            scanned: self.scanned.load(Ordering::Relaxed),
            pending: self.pending.load(Ordering::Relaxed),
            hashed: self.hashed.load(Ordering::Relaxed),
            throughput: f64::from_bits(self.throughput_bits.load(Ordering::Relaxed)),
            elapsed: self.started.elapsed(),
            saving: self.saving.load(Ordering::SeqCst),
        }
    }
}

/// Console progress using an indicatif spinner.
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    /// Create a spinner on stderr.
    ///
    /// # Examples
    ///
    /// ```
    /// use fsindex::progress::ConsoleProgress;
    ///
    /// let progress = ConsoleProgress::new();
    /// ```
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_snapshot(&self, snapshot: &ProgressSnapshot) {
        self.bar.set_message(format_snapshot(snapshot));
    }

    fn on_file_progress(&self, path: &Path, read: u64, total: u64) {
        let percent = if total == 0 { 100 } else { read * 100 / total };
        self.bar.set_message(format!(
            "Hashing {} {}/{} ({}%)",
            truncate_path(&path.to_string_lossy(), 30),
            bytesize::ByteSize(read),
            bytesize::ByteSize(total),
            percent
        ));
    }

    fn on_message(&self, message: &str) {
        self.bar.println(message);
    }

    fn on_finish(&self, snapshot: &ProgressSnapshot) {
        self.bar.finish_with_message(format!("Done: {}", format_snapshot(snapshot)));
    }
}

/// Progress sink that writes a log line at most once per interval.
pub struct LogProgress {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl LogProgress {
    /// Create a sink logging at most once per `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }
}

impl ProgressSink for LogProgress {
    fn on_snapshot(&self, snapshot: &ProgressSnapshot) {
        let Ok(mut last) = self.last.lock() else {
            return;
        };
        if last.is_some_and(|t| t.elapsed() < self.interval) {
            return;
        }
        *last = Some(Instant::now());
        log::info!("Indexing... {}", format_snapshot(snapshot));
    }

    fn on_message(&self, message: &str) {
        log::info!("{}", message);
    }

    fn on_finish(&self, snapshot: &ProgressSnapshot) {
        log::info!("Finished indexing: {}", format_snapshot(snapshot));
    }
}

/// Render a snapshot as a single status line.
#[must_use]
pub fn format_snapshot(snapshot: &ProgressSnapshot) -> String {
    let mut line = format!(
        "{} scanned, {} left, {} hashed, {:.0} files/sec",
        snapshot.scanned, snapshot.pending, snapshot.hashed, snapshot.throughput
    );
    if snapshot.saving {
        line.push_str(" [saving]");
    }
    line
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.len() <= max_len {
        return path.to_string();
    }

    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if file_name.len() >= max_len {
        let tail: String = file_name
            .chars()
            .rev()
            .take(max_len.saturating_sub(3))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
