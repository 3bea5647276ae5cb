#![warn(missing_docs)]
//! Scientist Core - Composable Executors
//!
//! This crate provides the execution chain the experiment harness is built on:
//! - `Executor` trait: run a unit of work, return its value or a classified failure
//! - `Direct` leaf executor that invokes the work and catches panics
//! - `TimingExecutor` decorator measuring wall-clock duration
//! - `TrialExecutor` decorator retrying failed work up to a bound
//!
//! Wrappers compose by owning an inner executor:
//!
//! ```
//! use scientist_core::{Executor, TimingExecutor, TrialExecutor};
//!
//! let chain = TimingExecutor::chained(TrialExecutor::new(3)?);
//! let done = chain.execute(|| Ok::<_, std::io::Error>(21 * 2))?;
//!
//! assert_eq!(done.value, 42);
//! assert_eq!(done.trials(), Some(1));
//! assert!(done.duration().is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Per-call measurements travel with the result as [`ExecutionStats`]
//! instead of living in thread-local state, so one executor can be shared
//! freely between threads.

mod chain;
mod error;
mod timing;
mod trial;

pub use chain::{Completed, Direct, ExecutionStats, Executor};
pub use error::{ConfigError, ExecutionError, Failure, PoolError, panic_message};
pub use timing::TimingExecutor;
pub use trial::{DEFAULT_MAX_ATTEMPTS, TrialExecutor};
