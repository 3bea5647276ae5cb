//! Task Submission
//!
//! Pooled experiments hand their work to an externally owned [`TaskPool`].
//! The pool is opaque: it only has to run every submitted task eventually,
//! on any thread. Results come back through a [`TaskHandle`].

use scientist_core::PoolError;
use std::fmt;
use std::sync::mpsc;

/// A unit of work submitted to a pool
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs submitted tasks, typically on worker threads
///
/// Implementations must be thread-safe; their lifecycle (creation, shutdown)
/// belongs to the caller.
pub trait TaskPool: Send + Sync {
    /// Queue `task` for execution
    fn submit(&self, task: Task);
}

impl TaskPool for rayon::ThreadPool {
    fn submit(&self, task: Task) {
        self.spawn(task);
    }
}

/// Blocking handle on the result of a submitted task
pub struct TaskHandle<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Block until the task has produced its result.
    ///
    /// Fails if the pool dropped the task without running it to completion.
    pub fn join(self) -> Result<T, PoolError> {
        self.receiver.recv().map_err(|_| PoolError::Disconnected)
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").finish_non_exhaustive()
    }
}

/// Submit `work` to `pool` and return a handle on its result
pub fn spawn_task<T, F>(pool: &dyn TaskPool, work: F) -> TaskHandle<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(1);
    pool.submit(Box::new(move || {
        // the handle may already be gone; nobody is waiting then
        let _ = sender.send(work());
    }));
    TaskHandle { receiver }
}
