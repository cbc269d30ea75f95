//! Deferred task queue.
//!
//! Producers on any thread hand work to the affinity thread through a
//! [`TaskQueue`]. Ordering is FIFO; the queue owns a task from `add` until it
//! is popped, after which the popping thread runs it and frees it.

mod task;

use std::time::Duration;

pub use task::{DeferredTask, Disposition};

/// Thread-safe FIFO of [`DeferredTask`]s.
#[derive(Debug)]
pub struct TaskQueue {
    tx: flume::Sender<DeferredTask>,
    rx: flume::Receiver<DeferredTask>,
}

impl TaskQueue {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }

    /// Enqueues a task. Safe from any thread.
    pub fn add(&self, task: DeferredTask) {
        // Both channel ends live in `self`, so the channel cannot be closed here.
        if let Err(flume::SendError(task)) = self.tx.send(task) {
            log::error!("task queue closed; dropping {:?}", task.label());
        }
    }

    /// Pops the earliest task, blocking until one is available.
    pub fn remove(&self) -> Option<DeferredTask> {
        self.rx.recv().ok()
    }

    /// Pops the earliest task, waiting at most `timeout`.
    pub fn remove_timeout(&self, timeout: Duration) -> Option<DeferredTask> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Pops the earliest task if one is queued.
    pub fn try_remove(&self) -> Option<DeferredTask> {
        self.rx.try_recv().ok()
    }

    /// Number of pending tasks.
    ///
    /// A hint only: concurrent producers may change it right after the read.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
