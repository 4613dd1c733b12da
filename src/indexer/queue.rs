//! Pending-work collection shared by the indexing workers.
//!
//! A LIFO stack behind a mutex, with a condition variable so idle workers
//! block instead of spinning. The queue also tracks how many popped items are
//! still being processed; the run is finished once the stack is empty and
//! nothing is in flight, because only in-flight directories can produce more
//! work.
//!
//! Pausing stops new items from being handed out. Together with
//! [`WorkQueue::wait_quiesced`] this gives the coordinator a point at which
//! no worker holds an item, so a copy of the index taken then is consistent.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::scanner::WorkItem;

#[derive(Debug, Default)]
struct QueueState {
    items: Vec<WorkItem>,
    in_flight: usize,
    paused: bool,
    closed: bool,
}

impl QueueState {
    fn is_drained(&self) -> bool {
        self.items.is_empty() && self.in_flight == 0
    }
}

/// Blocking LIFO work queue with in-flight accounting.
#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    /// Signalled when items arrive, the queue resumes, drains, or closes.
    available: Condvar,
    /// Signalled when the in-flight count drops to zero.
    idle: Condvar,
}

impl WorkQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add one item.
    pub fn push(&self, item: WorkItem) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.items.push(item);
        drop(state);
        self.available.notify_one();
    }

    /// Add several items at once.
    pub fn extend(&self, items: Vec<WorkItem>) {
        if items.is_empty() {
            return;
        }
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.items.extend(items);
        drop(state);
        self.available.notify_all();
    }

    /// Take the most recently added item, blocking while none is available.
    ///
    /// Returns `None` once the queue is closed, or once it is empty with no
    /// item in flight. Every `Some` must be followed by exactly one
    /// [`complete`](Self::complete).
    pub fn pop(&self) -> Option<WorkItem> {
        let mut state = self.lock();
        loop {
            if state.closed || state.is_drained() {
                return None;
            }
            if !state.paused {
                if let Some(item) = state.items.pop() {
                    state.in_flight += 1;
                    return Some(item);
                }
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Mark one popped item as fully processed.
    pub fn complete(&self) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        let idle = state.in_flight == 0;
        let drained = state.is_drained();
        drop(state);

        if idle {
            self.idle.notify_all();
        }
        if drained {
            // Wake blocked workers so they can observe the end of the run.
            self.available.notify_all();
        }
    }

    /// Stop handing out items. In-flight items are unaffected.
    pub fn pause(&self) {
        self.lock().paused = true;
    }

    /// Resume handing out items.
    pub fn resume(&self) {
        self.lock().paused = false;
        self.available.notify_all();
    }

    /// Close the queue: pending items are dropped and every blocked or
    /// future [`pop`](Self::pop) returns `None`.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.items.clear();
        drop(state);
        self.available.notify_all();
        self.idle.notify_all();
    }

    /// Wait up to `timeout` for the in-flight count to reach zero.
    ///
    /// Returns `true` if no item is in flight.
    pub fn wait_quiesced(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, |s| s.in_flight == 0)
    }

    /// Wait up to `timeout` for the run to finish.
    ///
    /// Returns `true` if the queue is empty with no item in flight.
    pub fn wait_drained(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, QueueState::is_drained)
    }

    fn wait_until<F>(&self, timeout: Duration, done: F) -> bool
    where
        F: Fn(&QueueState) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if done(&state) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline || state.closed {
                return false;
            }
            let (next, _) = self
                .idle
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = next;
        }
    }

    /// Number of items waiting to be handed out.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether no items are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Number of popped items not yet completed.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
