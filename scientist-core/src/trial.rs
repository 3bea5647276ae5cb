//! Bounded Retry
//!
//! `TrialExecutor` re-attempts failed work until it succeeds or the attempt
//! bound is used up. There is no backoff between attempts, so the work should
//! be idempotent.

use crate::chain::{Completed, Direct, Executor};
use crate::error::{ConfigError, ExecutionError};

/// Attempt bound used when none is given
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Retries failing work up to `max_attempts` times in total
///
/// On success the returned stats carry the attempt number that succeeded; on
/// exhaustion the last attempt's error is returned with `trials ==
/// max_attempts`.
#[derive(Debug, Clone)]
pub struct TrialExecutor<I = Direct> {
    max_attempts: u32,
    inner: I,
}

impl TrialExecutor {
    /// A trial executor that invokes the work itself
    pub fn new(max_attempts: u32) -> Result<Self, ConfigError> {
        Self::chained(max_attempts, Direct)
    }
}

impl Default for TrialExecutor {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            inner: Direct,
        }
    }
}

impl<I: Executor> TrialExecutor<I> {
    /// A trial executor that runs every attempt through `inner`
    pub fn chained(max_attempts: u32, inner: I) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidAttempts(max_attempts));
        }
        Ok(Self {
            max_attempts,
            inner,
        })
    }

    /// Chain `inner` with [`DEFAULT_MAX_ATTEMPTS`]
    pub fn with_default_attempts(inner: I) -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            inner,
        }
    }

    /// Total attempts allowed per call
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The wrapped executor
    pub fn inner(&self) -> &I {
        &self.inner
    }
}

impl<I: Executor> Executor for TrialExecutor<I> {
    fn execute<V, E, F>(&self, mut work: F) -> Result<Completed<V>, ExecutionError<E>>
    where
        F: FnMut() -> Result<V, E>,
    {
        let mut trials = 0;
        loop {
            trials += 1;
            match self.inner.execute(&mut work) {
                Ok(mut done) => {
                    done.stats.trials = Some(trials);
                    return Ok(done);
                }
                Err(mut error) if trials >= self.max_attempts => {
                    tracing::debug!(
                        trials,
                        failure = error.cause().kind(),
                        "attempts exhausted"
                    );
                    error.stats_mut().trials = Some(trials);
                    return Err(error);
                }
                Err(error) => {
                    tracing::debug!(
                        trial = trials,
                        max_attempts = self.max_attempts,
                        failure = error.cause().kind(),
                        "attempt failed, retrying"
                    );
                }
            }
        }
    }
}
