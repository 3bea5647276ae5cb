//! Failure Classification
//!
//! A failure raised by a unit of work is classified exactly once, at the
//! [`Direct`](crate::Direct) leaf of a chain. Decorating executors hand the
//! classified error upward unchanged and only annotate its statistics.

use crate::ExecutionStats;
use std::any::Any;
use std::error::Error;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Invalid constructor or configuration argument, raised before any execution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("max attempts must be > 0, got {0}")]
    InvalidAttempts(u32),

    #[error("candidate-first ratio must be within [0, 1], got {0}")]
    InvalidRatio(f64),

    #[error("experiment name must not be empty")]
    EmptyName,
}

/// Failure of the concurrency layer while waiting for a submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("task was dropped before it reported a result")]
    Disconnected,
}

/// Why a unit of work did not produce a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure<E> {
    /// The work returned an error
    Error(E),
    /// The work panicked; holds the panic message
    Panic(String),
    /// The task carrying the work never reported back (pooled execution only)
    Interrupted(PoolError),
}

impl<E> Failure<E> {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::Error(_) => "error",
            Failure::Panic(_) => "panic",
            Failure::Interrupted(_) => "interrupted",
        }
    }

    /// The error returned by the work, if that is what failed
    pub fn error(&self) -> Option<&E> {
        match self {
            Failure::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Map the error type, keeping panics and interruptions as they are
    pub fn map<F, O>(self, op: O) -> Failure<F>
    where
        O: FnOnce(E) -> F,
    {
        match self {
            Failure::Error(e) => Failure::Error(op(e)),
            Failure::Panic(message) => Failure::Panic(message),
            Failure::Interrupted(e) => Failure::Interrupted(e),
        }
    }
}

impl<E: fmt::Display> fmt::Display for Failure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Error(e) => e.fmt(f),
            Failure::Panic(message) => f.write_str(message),
            Failure::Interrupted(e) => e.fmt(f),
        }
    }
}

impl<E: Error + 'static> Error for Failure<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Failure::Error(e) => Some(e),
            Failure::Panic(_) => None,
            Failure::Interrupted(e) => Some(e),
        }
    }
}

/// A classified execution failure together with the statistics of the call
///
/// The message is the cause's message; `source()` is the original error.
#[derive(Debug, Clone)]
pub struct ExecutionError<E> {
    cause: Failure<E>,
    stats: ExecutionStats,
}

impl<E> ExecutionError<E> {
    /// Classify a failure with empty statistics
    pub fn new(cause: Failure<E>) -> Self {
        Self {
            cause,
            stats: ExecutionStats::default(),
        }
    }

    /// The original failure
    pub fn cause(&self) -> &Failure<E> {
        &self.cause
    }

    /// Unwrap to the original failure
    pub fn into_cause(self) -> Failure<E> {
        self.cause
    }

    /// Statistics recorded by the chain for this call
    pub fn stats(&self) -> ExecutionStats {
        self.stats
    }

    /// Mutable statistics, for decorating executors
    pub fn stats_mut(&mut self) -> &mut ExecutionStats {
        &mut self.stats
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

impl<E: fmt::Display> fmt::Display for ExecutionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.cause.fmt(f)
    }
}

impl<E: Error + 'static> Error for ExecutionError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Failure::Error(e) => Some(e),
            Failure::Panic(_) => None,
            Failure::Interrupted(e) => Some(e),
        }
    }
}

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
