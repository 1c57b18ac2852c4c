//! Deferred task queue - "run after the current event" work
//!
//! Some widget work has to wait until the host has finished the current
//! event, e.g. focusing a search field once the panel exists. Tasks are
//! queued with [`TaskQueue::schedule`] and run when the host calls
//! [`TaskQueue::run_pending`] on its next tick.
//!
//! Every task comes with a [`TaskHandle`]. Cancelling the handle guarantees
//! the task will not run, which lets a widget invalidate deferred work when
//! it closes before the tick arrives.
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use dropsel_core::tasks::TaskQueue;
//!
//! let queue = TaskQueue::new();
//! let runs = Arc::new(AtomicUsize::new(0));
//!
//! let r = runs.clone();
//! let keep = queue.schedule(move || { r.fetch_add(1, Ordering::SeqCst); });
//! let r = runs.clone();
//! let dropped = queue.schedule(move || { r.fetch_add(1, Ordering::SeqCst); });
//! dropped.cancel();
//!
//! assert_eq!(queue.run_pending(), 1);
//! assert_eq!(runs.load(Ordering::SeqCst), 1);
//! assert!(keep.is_finished());
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const PENDING: u8 = 0;
const CANCELLED: u8 = 1;
const FINISHED: u8 = 2;

struct Task {
    status: Arc<AtomicU8>,
    run: Box<dyn FnOnce() + Send>,
}

/// Handle to a scheduled task
#[derive(Clone, Debug)]
pub struct TaskHandle {
    status: Arc<AtomicU8>,
}

impl TaskHandle {
    /// Prevent the task from running. No effect once it has run.
    pub fn cancel(&self) {
        let _ = self
            .status
            .compare_exchange(PENDING, CANCELLED, Ordering::SeqCst, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.load(Ordering::SeqCst) == CANCELLED
    }

    /// Whether the task has run to completion
    pub fn is_finished(&self) -> bool {
        self.status.load(Ordering::SeqCst) == FINISHED
    }

    /// Whether the task is still waiting to run
    pub fn is_pending(&self) -> bool {
        self.status.load(Ordering::SeqCst) == PENDING
    }
}

/// Host-driven queue of deferred tasks (cheap to clone)
#[derive(Clone, Default)]
pub struct TaskQueue {
    queue: Arc<Mutex<VecDeque<Task>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Task>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a task for the next [`run_pending`](Self::run_pending)
    pub fn schedule<F>(&self, f: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let status = Arc::new(AtomicU8::new(PENDING));
        self.lock().push_back(Task {
            status: Arc::clone(&status),
            run: Box::new(f),
        });
        TaskHandle { status }
    }

    /// Run every task queued so far. Returns how many ran.
    ///
    /// Tasks scheduled while draining wait for the following call, so a task
    /// that reschedules itself cannot spin this loop forever.
    pub fn run_pending(&self) -> usize {
        let batch: Vec<Task> = self.lock().drain(..).collect();
        let mut ran = 0;

        for task in batch {
            if task
                .status
                .compare_exchange(PENDING, FINISHED, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                (task.run)();
                ran += 1;
            }
        }

        if ran > 0 {
            tracing::trace!("TaskQueue: ran {} deferred tasks", ran);
        }
        ran
    }

    /// Number of queued tasks, cancelled ones included
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue").field("queued", &self.len()).finish()
    }
}
