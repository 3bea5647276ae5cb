//! Execution Order
//!
//! Decides, once per invocation, whether the control or the candidate starts
//! first. The default draws 50/50 so that ordering effects (warm caches,
//! connection reuse) average out across invocations.

use rand::Rng;
use scientist_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Default probability of running the candidate first
pub const DEFAULT_CANDIDATE_FIRST_RATIO: f64 = 0.5;

/// Which path starts first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionOrder {
    /// Control starts first
    ControlFirst,
    /// Candidate starts first
    CandidateFirst,
}

impl ExecutionOrder {
    /// `true` for [`ExecutionOrder::ControlFirst`]
    pub fn is_control_first(self) -> bool {
        matches!(self, ExecutionOrder::ControlFirst)
    }

    /// `true` for [`ExecutionOrder::CandidateFirst`]
    pub fn is_candidate_first(self) -> bool {
        matches!(self, ExecutionOrder::CandidateFirst)
    }
}

/// Chooses the execution order of an invocation
///
/// Implemented by [`RandomOrder`], by [`ExecutionOrder`] itself (a fixed
/// order) and by any `Fn() -> ExecutionOrder`.
pub trait OrderPolicy: Send + Sync {
    /// Draw the order for one invocation
    fn choose(&self) -> ExecutionOrder;
}

impl OrderPolicy for ExecutionOrder {
    fn choose(&self) -> ExecutionOrder {
        *self
    }
}

impl<F> OrderPolicy for F
where
    F: Fn() -> ExecutionOrder + Send + Sync,
{
    fn choose(&self) -> ExecutionOrder {
        self()
    }
}

/// Random order with a configurable candidate-first probability
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomOrder {
    candidate_first_ratio: f64,
}

impl RandomOrder {
    /// `candidate_first_ratio` must lie within `[0, 1]`
    pub fn new(candidate_first_ratio: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&candidate_first_ratio) {
            return Err(ConfigError::InvalidRatio(candidate_first_ratio));
        }
        Ok(Self {
            candidate_first_ratio,
        })
    }

    /// Probability of drawing [`ExecutionOrder::CandidateFirst`]
    pub fn candidate_first_ratio(&self) -> f64 {
        self.candidate_first_ratio
    }
}

impl Default for RandomOrder {
    fn default() -> Self {
        Self {
            candidate_first_ratio: DEFAULT_CANDIDATE_FIRST_RATIO,
        }
    }
}

impl OrderPolicy for RandomOrder {
    fn choose(&self) -> ExecutionOrder {
        if rand::thread_rng().gen_bool(self.candidate_first_ratio) {
            ExecutionOrder::CandidateFirst
        } else {
            ExecutionOrder::ControlFirst
        }
    }
}
