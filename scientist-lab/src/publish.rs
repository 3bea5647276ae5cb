//! Publishing
//!
//! The publisher is where results leave the experiment: comparing control
//! against candidate, recording mismatches, emitting metrics. The harness
//! calls it exactly once per invocation and ignores anything it returns or
//! raises.

use crate::result::ExperimentResult;
use std::fmt::Debug;

/// Consumes finished experiment results
///
/// Implemented for closures taking `&ExperimentResult<V, E>`.
pub trait Publisher<V, E>: Send + Sync {
    /// Publish one result. Errors are logged and discarded by the harness.
    fn publish(&self, result: &ExperimentResult<V, E>) -> anyhow::Result<()>;
}

impl<V, E, F> Publisher<V, E> for F
where
    F: Fn(&ExperimentResult<V, E>) -> anyhow::Result<()> + Send + Sync,
{
    fn publish(&self, result: &ExperimentResult<V, E>) -> anyhow::Result<()> {
        self(result)
    }
}

/// Discards every result
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl<V, E> Publisher<V, E> for NoopPublisher {
    fn publish(&self, _result: &ExperimentResult<V, E>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Logs a summary of every result at `info`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPublisher;

impl<V: Debug, E: Debug> Publisher<V, E> for TracingPublisher {
    fn publish(&self, result: &ExperimentResult<V, E>) -> anyhow::Result<()> {
        let control = result.control();
        match result.candidate() {
            Some(candidate) => tracing::info!(
                experiment = result.name(),
                order = ?result.order(),
                control = ?control.outcome(),
                control_duration = ?control.duration(),
                candidate = ?candidate.outcome(),
                candidate_duration = ?candidate.duration(),
                "experiment observed"
            ),
            None => tracing::info!(
                experiment = result.name(),
                control = ?control.outcome(),
                control_duration = ?control.duration(),
                "control observed, candidate skipped"
            ),
        }
        Ok(())
    }
}
