//! Executor Chain
//!
//! An [`Executor`] runs a unit of work and returns its value or a classified
//! [`ExecutionError`]. Decorators own an inner executor and delegate to it
//! around their own behavior; [`Direct`] ends every chain by invoking the
//! work itself.
//!
//! ```text
//! TimingExecutor ──► TrialExecutor ──► Direct ──► work()
//!      duration          trials        classify
//! ```

use crate::error::{ExecutionError, Failure, panic_message};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// Measurements recorded by the chain for one call
///
/// A field is `None` when no executor of that kind took part in the call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Wall-clock time measured by the outermost timing executor
    pub duration: Option<Duration>,
    /// Attempts made by the outermost trial executor
    pub trials: Option<u32>,
}

/// A successful execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed<V> {
    /// Value produced by the work
    pub value: V,
    /// Measurements for this call
    pub stats: ExecutionStats,
}

impl<V> Completed<V> {
    /// Drop the statistics and keep the value
    pub fn into_value(self) -> V {
        self.value
    }

    /// Elapsed time, if a timing executor was part of the chain
    pub fn duration(&self) -> Option<Duration> {
        self.stats.duration
    }

    /// Attempts made, if a trial executor was part of the chain
    pub fn trials(&self) -> Option<u32> {
        self.stats.trials
    }
}

/// Runs units of work
pub trait Executor {
    /// Run `work` and return its value, or the classified failure.
    ///
    /// Decorators may invoke `work` more than once.
    fn execute<V, E, F>(&self, work: F) -> Result<Completed<V>, ExecutionError<E>>
    where
        F: FnMut() -> Result<V, E>;

    /// Run `work` for its side effects only.
    fn run<E, F>(&self, work: F) -> Result<ExecutionStats, ExecutionError<E>>
    where
        F: FnMut() -> Result<(), E>,
    {
        self.execute(work).map(|done| done.stats)
    }
}

/// The end of every chain: invokes the work on the calling thread
///
/// An `Err` from the work becomes [`Failure::Error`], a panic becomes
/// [`Failure::Panic`]. Panics are only caught when the binary unwinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Direct;

impl Direct {
    /// Invoke single-use `work` and classify the outcome.
    ///
    /// Not part of [`Executor`]: retrying chains need work they can call again.
    pub fn execute_once<V, E, F>(&self, work: F) -> Result<Completed<V>, ExecutionError<E>>
    where
        F: FnOnce() -> Result<V, E>,
    {
        match panic::catch_unwind(AssertUnwindSafe(work)) {
            Ok(Ok(value)) => Ok(Completed {
                value,
                stats: ExecutionStats::default(),
            }),
            Ok(Err(error)) => Err(ExecutionError::new(Failure::Error(error))),
            Err(payload) => Err(ExecutionError::new(Failure::Panic(panic_message(
                payload.as_ref(),
            )))),
        }
    }
}

impl Executor for Direct {
    fn execute<V, E, F>(&self, mut work: F) -> Result<Completed<V>, ExecutionError<E>>
    where
        F: FnMut() -> Result<V, E>,
    {
        self.execute_once(&mut work)
    }
}

impl<T: Executor> Executor for &T {
    fn execute<V, E, F>(&self, work: F) -> Result<Completed<V>, ExecutionError<E>>
    where
        F: FnMut() -> Result<V, E>,
    {
        (**self).execute(work)
    }
}

impl<T: Executor> Executor for Arc<T> {
    fn execute<V, E, F>(&self, work: F) -> Result<Completed<V>, ExecutionError<E>>
    where
        F: FnMut() -> Result<V, E>,
    {
        (**self).execute(work)
    }
}
