use fsindex::checkpoint::{CheckpointStore, CheckpointWriter};
use fsindex::index::Index;
use fsindex::indexer::{Indexer, IndexerConfig};
use fsindex::progress::ProgressSink;
use fsindex::signal::ShutdownHandler;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Requests shutdown the first time any file reports hashing progress.
struct TripAfterFirstChunk {
    flag: Arc<AtomicBool>,
}

impl ProgressSink for TripAfterFirstChunk {
    fn on_file_progress(&self, _path: &Path, _read: u64, _total: u64) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Requests shutdown when the file after the first `limit` starts hashing.
struct TripAfterFiles {
    flag: Arc<AtomicBool>,
    limit: usize,
    started: Mutex<Vec<PathBuf>>,
    tripped: Mutex<Option<PathBuf>>,
}

impl TripAfterFiles {
    fn new(flag: Arc<AtomicBool>, limit: usize) -> Self {
        Self {
            flag,
            limit,
            started: Mutex::new(Vec::new()),
            tripped: Mutex::new(None),
        }
    }
}

impl ProgressSink for TripAfterFiles {
    fn on_file_progress(&self, path: &Path, _read: u64, _total: u64) {
        let mut started = self.started.lock().unwrap();
        if started.iter().any(|p| p == path) {
            return;
        }
        if started.len() == self.limit {
            self.flag.store(true, Ordering::SeqCst);
            *self.tripped.lock().unwrap() = Some(path.to_path_buf());
        }
        started.push(path.to_path_buf());
    }
}

fn setup_many_files(count: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    for i in 0..count {
        fs::write(dir.path().join(format!("file_{i:03}.dat")), vec![i as u8; 64 * 1024]).unwrap();
    }
    dir
}

#[test]
fn test_cancel_mid_run_keeps_partial_index() {
    let dir = setup_many_files(100);
    let handler = ShutdownHandler::new();
    let sink = Arc::new(TripAfterFirstChunk {
        flag: handler.get_flag(),
    });

    let config = IndexerConfig::default()
        .with_workers(2)
        .with_large_file_threshold(0)
        .with_shutdown_flag(handler.get_flag())
        .with_progress(sink);
    let outcome = Indexer::new(config).run(dir.path(), Index::new()).unwrap();

    assert!(outcome.summary.interrupted);
    assert!(handler.is_shutdown_requested());
    assert!(outcome.index.len() < 100);
    assert_eq!(outcome.summary.pruned, 0);
}

#[test]
fn test_cancel_saves_exactly_the_finished_files() {
    const FINISHED: usize = 7;

    let dir = setup_many_files(40);
    let root = fs::canonicalize(dir.path()).unwrap();
    let state = TempDir::new().unwrap();
    let store = CheckpointStore::new(state.path().join("index.json"));
    let writer = Arc::new(CheckpointWriter::new(store.clone()));

    let flag = Arc::new(AtomicBool::new(false));
    let sink = Arc::new(TripAfterFiles::new(Arc::clone(&flag), FINISHED));

    // One worker hashes files strictly one after another.
    let config = IndexerConfig::default()
        .with_workers(1)
        .with_large_file_threshold(0)
        .with_shutdown_flag(flag)
        .with_progress(Arc::clone(&sink) as Arc<dyn ProgressSink>);
    let outcome = Indexer::new(config)
        .with_checkpoint_writer(writer)
        .run(&root, Index::new())
        .unwrap();

    assert!(outcome.summary.interrupted);
    assert!(outcome.summary.final_save_error.is_none());

    let started = sink.started.lock().unwrap().clone();
    let tripped = sink.tripped.lock().unwrap().clone().unwrap();
    assert_eq!(started.len(), FINISHED + 1);
    let finished = &started[..FINISHED];

    let loaded = store.load().unwrap().unwrap();
    assert_eq!(loaded.len(), FINISHED);
    assert_eq!(loaded, outcome.index);
    for path in finished {
        let entry = loaded.get(path).unwrap();
        let content = fs::read(path).unwrap();
        assert_eq!(entry.hash, *blake3::hash(&content).as_bytes());
        assert_eq!(entry.size, content.len() as u64);
    }
    assert!(!loaded.contains(&tripped));
}

#[test]
fn test_cancel_does_not_prune_baseline() {
    let dir = setup_many_files(50);
    let first = Indexer::new(IndexerConfig::default().with_workers(4))
        .run(dir.path(), Index::new())
        .unwrap();
    assert_eq!(first.index.len(), 50);

    let flag = Arc::new(AtomicBool::new(false));
    let sink = Arc::new(TripAfterFirstChunk {
        flag: Arc::clone(&flag),
    });
    fs::write(dir.path().join("file_000.dat"), "rewritten").unwrap();
    fs::remove_file(dir.path().join("file_049.dat")).unwrap();

    let config = IndexerConfig::default()
        .with_workers(1)
        .with_large_file_threshold(0)
        .with_shutdown_flag(flag)
        .with_progress(sink);
    let outcome = Indexer::new(config)
        .run(dir.path(), first.index.clone())
        .unwrap();

    assert!(outcome.summary.interrupted);
    assert_eq!(outcome.index.len(), 50);
}

#[test]
fn test_cancelled_run_still_saves_final_checkpoint() {
    let dir = setup_many_files(20);
    let state = TempDir::new().unwrap();
    let store = CheckpointStore::new(state.path().join("index.json"));

    let mut baseline = Index::new();
    let seed = Indexer::new(IndexerConfig::default().with_workers(2))
        .run(dir.path(), Index::new())
        .unwrap();
    for (path, entry) in seed.index.iter().take(5) {
        baseline.insert(path.clone(), entry.clone());
    }

    let flag = Arc::new(AtomicBool::new(true));
    let writer = Arc::new(CheckpointWriter::new(store.clone()));
    let outcome = Indexer::new(IndexerConfig::default().with_shutdown_flag(flag))
        .with_checkpoint_writer(writer)
        .run(dir.path(), baseline.clone())
        .unwrap();

    assert!(outcome.summary.interrupted);
    assert_eq!(outcome.summary.checkpoints_written, 1);
    assert_eq!(store.load().unwrap().unwrap(), baseline);
}

#[test]
fn test_handler_reset_allows_new_run() {
    let dir = setup_many_files(5);
    let handler = ShutdownHandler::new();
    handler.request_shutdown();

    let config = IndexerConfig::default().with_shutdown_flag(handler.get_flag());
    let outcome = Indexer::new(config.clone()).run(dir.path(), Index::new()).unwrap();
    assert!(outcome.summary.interrupted);

    handler.reset();
    let outcome = Indexer::new(config).run(dir.path(), Index::new()).unwrap();
    assert!(!outcome.summary.interrupted);
    assert_eq!(outcome.index.len(), 5);
}
