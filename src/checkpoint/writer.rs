//! Serialized checkpoint saving for a running indexer.
//!
//! At most one save runs at any time. Periodic saves run on a background
//! thread from a snapshot taken while the indexer was quiesced; a periodic
//! trigger that arrives while a save is still running is dropped. The final
//! save of a run waits for any background save and then runs synchronously.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use super::{CheckpointError, CheckpointStore};
use crate::index::Index;

/// Owns the save-in-flight flag for one checkpoint store.
pub struct CheckpointWriter {
    store: Arc<CheckpointStore>,
    saving: Arc<AtomicBool>,
    background: Mutex<Option<JoinHandle<()>>>,
    written: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    dropped: AtomicUsize,
}

impl CheckpointWriter {
    /// Create a writer for `store`.
    #[must_use]
    pub fn new(store: CheckpointStore) -> Self {
        Self {
            store: Arc::new(store),
            saving: Arc::new(AtomicBool::new(false)),
            background: Mutex::new(None),
            written: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
            dropped: AtomicUsize::new(0),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Shared flag that is `true` while a save is running.
    #[must_use]
    pub fn saving_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.saving)
    }

    /// Whether a save is running right now.
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    /// Number of checkpoints committed by this writer.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written.load(Ordering::SeqCst)
    }

    /// Number of saves that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Number of background triggers dropped because a save was running.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Count a trigger that was skipped because a save was running.
    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
        log::debug!("Checkpoint already in progress, skipping this one");
    }

    /// Save `snapshot` on a background thread.
    ///
    /// Returns `false` without doing anything if a save is already running.
    pub fn save_in_background(&self, snapshot: Index) -> bool {
        if self
            .saving
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.record_dropped();
            return false;
        }

        // The previous thread has cleared the flag, so it is done or about to be.
        self.reap();

        let store = Arc::clone(&self.store);
        let saving = Arc::clone(&self.saving);
        let written = Arc::clone(&self.written);
        let failed = Arc::clone(&self.failed);

        let spawned = std::thread::Builder::new()
            .name("fsindex-checkpoint".to_string())
            .spawn(move || {
                match store.save(&snapshot) {
                    Ok(()) => {
                        written.fetch_add(1, Ordering::SeqCst);
                        log::info!(
                            "Checkpoint saved ({} entries) to {}",
                            snapshot.len(),
                            store.path().display()
                        );
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::SeqCst);
                        log::error!("Checkpoint save failed, continuing in memory: {}", e);
                    }
                }
                saving.store(false, Ordering::SeqCst);
            });

        match spawned {
            Ok(handle) => {
                if let Ok(mut slot) = self.background.lock() {
                    *slot = Some(handle);
                }
                true
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                self.saving.store(false, Ordering::SeqCst);
                log::error!("Failed to start checkpoint thread: {}", e);
                false
            }
        }
    }

    /// Save `index` on the calling thread, after any background save ends.
    ///
    /// # Errors
    ///
    /// Returns the [`CheckpointError`] of the save; the previous checkpoint
    /// remains authoritative in that case.
    pub fn save_blocking(&self, index: &Index) -> Result<(), CheckpointError> {
        self.wait();

        while self
            .saving
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Another caller raced us into a background save.
            self.wait();
            std::thread::yield_now();
        }

        let result = self.store.save(index);
        match &result {
            Ok(()) => {
                self.written.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                log::error!("Checkpoint save failed: {}", e);
            }
        }
        self.saving.store(false, Ordering::SeqCst);
        result
    }

    /// Block until the background save (if any) has finished.
    pub fn wait(&self) {
        self.reap();
    }

    fn reap(&self) {
        let handle = self.background.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Checkpoint thread panicked");
                self.saving.store(false, Ordering::SeqCst);
            }
        }
    }
}

impl Drop for CheckpointWriter {
    fn drop(&mut self) {
        self.reap();
    }
}
