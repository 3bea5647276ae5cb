#![warn(missing_docs)]
//! Scientist Lab - Control/Candidate Experiments
//!
//! Runs a trusted control and an experimental candidate for the same
//! operation, captures both as [`Observation`]s and hands them to a
//! [`Publisher`]. The caller only ever sees the control's outcome.
//!
//! - `observation`: run work once through a timing executor, capture the outcome
//! - `order`: which path starts first
//! - `pool`: submission to an externally owned worker pool
//! - `experiment`: the harness itself, blocking or pooled
//! - `config`: `scientist.toml` loading and discovery
//!
//! ```
//! use scientist_lab::{Experiment, ExperimentResult};
//!
//! let experiment = Experiment::builder("pricing")
//!     .publisher(|result: &ExperimentResult<u32, String>| -> anyhow::Result<()> {
//!         assert_eq!(result.control().value(), Some(&100));
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let price = experiment.run(|| Ok(100), || Ok(99)).unwrap();
//! assert_eq!(price, 100);
//! # Ok::<(), scientist_core::ConfigError>(())
//! ```

mod config;
mod experiment;
mod observation;
mod order;
mod pool;
mod publish;
mod result;

pub use config::{
    CONFIG_FILE, ConfigFileError, ExperimentConfig, PoolConfig, RetryConfig, ScientistConfig,
};
pub use experiment::{DEFAULT_NAME, ExecutionMode, Experiment, ExperimentBuilder, ExperimentError};
pub use observation::{Observation, observe};
pub use order::{DEFAULT_CANDIDATE_FIRST_RATIO, ExecutionOrder, OrderPolicy, RandomOrder};
pub use pool::{Task, TaskHandle, TaskPool, spawn_task};
pub use publish::{NoopPublisher, Publisher, TracingPublisher};
pub use result::{Context, ExperimentResult};
