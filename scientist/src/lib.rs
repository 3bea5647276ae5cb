#![warn(missing_docs)]
//! # Scientist
//!
//! Refactor critical paths safely by running the old code (the control) and
//! the new code (the candidate) side by side in production:
//! - **Control is authoritative**: callers always get the control's value or failure
//! - **Candidate is contained**: its errors and panics are captured, never raised
//! - **Randomised order**: control-first or candidate-first per invocation
//! - **Blocking or pooled**: run sequentially, or concurrently on a rayon pool
//! - **Composable executors**: timing and retry wrappers over any unit of work
//!
//! ## Quick Start
//!
//! ```
//! use scientist::prelude::*;
//!
//! let experiment = Experiment::builder("checkout-pricing")
//!     .publisher(|result: &ExperimentResult<u64, String>| -> anyhow::Result<()> {
//!         if let Some(candidate) = result.candidate() {
//!             if candidate.outcome() != result.control().outcome() {
//!                 eprintln!("mismatch in {}", result.name());
//!             }
//!         }
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let total = experiment.run(|| Ok(1200), || Ok(1200)).unwrap();
//! assert_eq!(total, 1200);
//! # Ok::<(), scientist::ConfigError>(())
//! ```
//!
//! ## Retrying Work
//!
//! ```
//! use scientist::prelude::*;
//!
//! let retry = TimingExecutor::chained(TrialExecutor::new(3)?);
//! let done = retry.execute(|| Ok::<_, std::io::Error>("ok"))?;
//! assert_eq!(done.trials(), Some(1));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export executor chain
pub use scientist_core::{
    Completed, ConfigError, DEFAULT_MAX_ATTEMPTS, Direct, ExecutionError, ExecutionStats,
    Executor, Failure, PoolError, TimingExecutor, TrialExecutor, panic_message,
};

// Re-export experiment harness
pub use scientist_lab::{
    CONFIG_FILE, ConfigFileError, Context, DEFAULT_CANDIDATE_FIRST_RATIO, DEFAULT_NAME,
    ExecutionMode, ExecutionOrder, Experiment, ExperimentBuilder, ExperimentConfig,
    ExperimentError, ExperimentResult, NoopPublisher, Observation, OrderPolicy, PoolConfig,
    Publisher, RandomOrder, RetryConfig, ScientistConfig, Task, TaskHandle, TaskPool,
    TracingPublisher, observe, spawn_task,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ExecutionMode, ExecutionOrder, Executor, Experiment, ExperimentError, ExperimentResult,
        Failure, Observation, Publisher, TimingExecutor, TrialExecutor,
    };
}

/// Install a `tracing` subscriber printing to stderr.
///
/// `verbose` raises the crate filter from `info` to `debug`. Returns `false`
/// if a global subscriber was already installed.
pub fn init_logging(verbose: bool) -> bool {
    let filter = if verbose { "scientist=debug" } else { "scientist=info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_installs_once() {
        assert!(init_logging(true));
        // a second global subscriber is refused, not a panic
        assert!(!init_logging(false));
    }
}
