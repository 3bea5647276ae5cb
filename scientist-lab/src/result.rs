//! Experiment Results
//!
//! One `ExperimentResult` is built per invocation and handed to the
//! publisher. It is never mutated afterwards.

use crate::observation::Observation;
use crate::order::ExecutionOrder;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Free-form data attached to an experiment for the publisher's use
pub type Context = BTreeMap<String, Value>;

/// Control and candidate observations of one invocation
#[derive(Debug, Clone)]
pub struct ExperimentResult<V, E> {
    name: Arc<str>,
    control: Observation<V, E>,
    candidate: Option<Observation<V, E>>,
    order: Option<ExecutionOrder>,
    context: Arc<Context>,
}

impl<V, E> ExperimentResult<V, E> {
    pub(crate) fn new(
        name: Arc<str>,
        context: Arc<Context>,
        control: Observation<V, E>,
        candidate: Option<(ExecutionOrder, Observation<V, E>)>,
    ) -> Self {
        let (order, candidate) = candidate.unzip();
        Self {
            name,
            control,
            candidate,
            order,
            context,
        }
    }

    /// Name of the experiment that produced this result
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The control observation
    pub fn control(&self) -> &Observation<V, E> {
        &self.control
    }

    /// The candidate observation, present iff the candidate ran
    pub fn candidate(&self) -> Option<&Observation<V, E>> {
        self.candidate.as_ref()
    }

    /// The order drawn for this invocation, present iff the candidate ran
    pub fn order(&self) -> Option<ExecutionOrder> {
        self.order
    }

    /// Context supplied when the experiment was built
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub(crate) fn into_control(self) -> Observation<V, E> {
        self.control
    }
}
