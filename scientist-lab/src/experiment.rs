//! Experiment Harness
//!
//! Runs a trusted control and an experimental candidate for the same
//! operation, publishes both observations, and hands the caller the control
//! outcome only.
//!
//! ## Invocation
//!
//! ```text
//!   START
//!     │  enabled()? ── no ──► control only
//!     ▼
//!   ORDER-DECIDED (one draw)
//!     │
//!     ▼
//!   control / candidate observed in order
//!     │
//!     ▼
//!   PUBLISHED ──► return control value / raise control failure
//! ```
//!
//! ## Execution Modes
//!
//! - **Blocking**: both paths run on the calling thread, one after the other.
//!   Publication finishes before `run` returns.
//! - **Pooled**: both paths are submitted to a [`TaskPool`]; `run` waits for
//!   the control task only. A third task waits for the candidate and
//!   publishes, so publication may finish after `run` has returned.

use crate::observation::{Observation, PanicPayload, observe, observe_with_payload};
use crate::order::{ExecutionOrder, OrderPolicy, RandomOrder};
use crate::pool::{TaskHandle, TaskPool, spawn_task};
use crate::publish::{NoopPublisher, Publisher};
use crate::result::{Context, ExperimentResult};
use scientist_core::{ConfigError, Failure, PoolError, panic_message};
use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Name used when none is given
pub const DEFAULT_NAME: &str = "experiment";

/// How control and candidate are scheduled
#[derive(Clone, Default)]
pub enum ExecutionMode {
    /// Sequentially on the calling thread; publication completes before return.
    ///
    /// [`Experiment::run`] still asks for `Send + 'static` work because the
    /// mode is picked at runtime; [`Experiment::run_blocking`] takes
    /// borrowing closures.
    #[default]
    Blocking,
    /// Concurrently on a pool; publication may complete after return
    Pooled(Arc<dyn TaskPool>),
}

impl ExecutionMode {
    /// Whether work is submitted to a pool
    pub fn is_pooled(&self) -> bool {
        matches!(self, ExecutionMode::Pooled(_))
    }
}

impl fmt::Debug for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Blocking => f.write_str("Blocking"),
            ExecutionMode::Pooled(_) => f.write_str("Pooled"),
        }
    }
}

/// Failure surfaced to the caller of [`Experiment::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentError<E> {
    /// The control returned this error; it is the original value
    Control(E),
    /// Waiting for the control task failed (pooled mode only)
    Interrupted(PoolError),
}

impl<E> ExperimentError<E> {
    /// The control's own error, if that is what failed
    pub fn into_control(self) -> Option<E> {
        match self {
            ExperimentError::Control(e) => Some(e),
            ExperimentError::Interrupted(_) => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for ExperimentError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::Control(e) => e.fmt(f),
            ExperimentError::Interrupted(e) => write!(f, "experiment interrupted: {e}"),
        }
    }
}

impl<E: Error + 'static> Error for ExperimentError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExperimentError::Control(e) => e.source(),
            ExperimentError::Interrupted(e) => Some(e),
        }
    }
}

type EnabledFn = dyn Fn() -> bool + Send + Sync;

/// Control/candidate experiment
///
/// Built with [`Experiment::builder`]. Cheap to share: every invocation is
/// independent and all configuration is read-only.
pub struct Experiment<V, E> {
    name: Arc<str>,
    context: Arc<Context>,
    mode: ExecutionMode,
    enabled: Arc<EnabledFn>,
    order: Arc<dyn OrderPolicy>,
    publisher: Arc<dyn Publisher<V, E>>,
}

impl<V, E> Experiment<V, E> {
    /// Start configuring an experiment called `name`
    pub fn builder(name: impl Into<String>) -> ExperimentBuilder<V, E> {
        ExperimentBuilder::new(name)
    }

    /// Blocking experiment with default policies and a no-op publisher
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        Self::builder(name).build()
    }

    /// Pooled experiment with default policies and a no-op publisher
    pub fn pooled(name: impl Into<String>, pool: Arc<dyn TaskPool>) -> Result<Self, ConfigError> {
        Self::builder(name).pool(pool).build()
    }

    /// Experiment name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Context attached to every result
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Scheduling mode chosen at construction
    pub fn mode(&self) -> &ExecutionMode {
        &self.mode
    }

    /// Run `control` and, if enabled, `candidate`; return the control outcome.
    ///
    /// A control error is returned as [`ExperimentError::Control`] holding
    /// the original value. A control panic is resumed on the calling thread
    /// with its original payload. Candidate failures and publisher failures
    /// never reach the caller.
    ///
    /// In pooled mode the result may be published after this returns.
    pub fn run<C, D>(&self, control: C, candidate: D) -> Result<V, ExperimentError<E>>
    where
        V: Clone + Send + 'static,
        E: Clone + Send + 'static,
        C: FnOnce() -> Result<V, E> + Send + 'static,
        D: FnOnce() -> Result<V, E> + Send + 'static,
    {
        match &self.mode {
            ExecutionMode::Blocking => self.run_blocking(control, candidate),
            ExecutionMode::Pooled(pool) => self.run_pooled(pool.as_ref(), control, candidate),
        }
    }

    /// `None` when the candidate is disabled for this invocation
    fn decide_order(&self) -> Option<ExecutionOrder> {
        if !(self.enabled)() {
            tracing::debug!(experiment = %self.name, "candidate disabled");
            return None;
        }
        let order = self.order.choose();
        tracing::debug!(experiment = %self.name, ?order, "execution order drawn");
        Some(order)
    }

    /// Run both paths on the calling thread, whatever the configured mode.
    ///
    /// Same outcome rules as [`Experiment::run`]; publication completes
    /// before this returns, so the closures may borrow from the caller.
    pub fn run_blocking<C, D>(&self, control: C, candidate: D) -> Result<V, ExperimentError<E>>
    where
        C: FnOnce() -> Result<V, E>,
        D: FnOnce() -> Result<V, E>,
    {
        let ((control, payload), candidate) = match self.decide_order() {
            Some(order @ ExecutionOrder::CandidateFirst) => {
                let candidate = observe(candidate);
                (observe_with_payload(control), Some((order, candidate)))
            }
            Some(order @ ExecutionOrder::ControlFirst) => {
                let control = observe_with_payload(control);
                (control, Some((order, observe(candidate))))
            }
            None => (observe_with_payload(control), None),
        };

        let result = ExperimentResult::new(
            Arc::clone(&self.name),
            Arc::clone(&self.context),
            control,
            candidate,
        );
        publish(self.publisher.as_ref(), &result);
        conclude(result.into_control().into_outcome(), payload)
    }

    fn run_pooled<C, D>(
        &self,
        pool: &dyn TaskPool,
        control: C,
        candidate: D,
    ) -> Result<V, ExperimentError<E>>
    where
        V: Clone + Send + 'static,
        E: Clone + Send + 'static,
        C: FnOnce() -> Result<V, E> + Send + 'static,
        D: FnOnce() -> Result<V, E> + Send + 'static,
    {
        let (control_task, candidate_task) = match self.decide_order() {
            Some(order @ ExecutionOrder::CandidateFirst) => {
                let candidate_task = spawn_task(pool, move || observe(candidate));
                let control_task = spawn_task(pool, move || observe_with_payload(control));
                (control_task, Some((order, candidate_task)))
            }
            Some(order @ ExecutionOrder::ControlFirst) => {
                let control_task = spawn_task(pool, move || observe_with_payload(control));
                let candidate_task = spawn_task(pool, move || observe(candidate));
                (control_task, Some((order, candidate_task)))
            }
            None => (spawn_task(pool, move || observe_with_payload(control)), None),
        };
        tracing::debug!(
            experiment = %self.name,
            with_candidate = candidate_task.is_some(),
            "submitted to pool"
        );

        let (control, payload) = control_task.join().map_err(|error| {
            tracing::warn!(experiment = %self.name, %error, "control task lost");
            ExperimentError::Interrupted(error)
        })?;

        let publication = Publication {
            name: Arc::clone(&self.name),
            context: Arc::clone(&self.context),
            publisher: Arc::clone(&self.publisher),
            control: control.clone(),
        };
        pool.submit(Box::new(move || publication.complete(candidate_task)));

        conclude(control.into_outcome(), payload)
    }
}

impl<V, E> fmt::Debug for Experiment<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Experiment")
            .field("name", &self.name)
            .field("context", &self.context)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Deferred publication of a pooled invocation
struct Publication<V, E> {
    name: Arc<str>,
    context: Arc<Context>,
    publisher: Arc<dyn Publisher<V, E>>,
    control: Observation<V, E>,
}

impl<V, E> Publication<V, E> {
    fn complete(self, candidate: Option<(ExecutionOrder, TaskHandle<Observation<V, E>>)>) {
        let name = &self.name;
        let candidate = candidate.map(|(order, task)| {
            let observation = task.join().unwrap_or_else(|error| {
                tracing::warn!(experiment = %name, %error, "candidate task lost");
                Observation::interrupted(error)
            });
            (order, observation)
        });

        let result = ExperimentResult::new(
            Arc::clone(&self.name),
            self.context,
            self.control,
            candidate,
        );
        publish(self.publisher.as_ref(), &result);
    }
}

/// Hand `result` to `publisher`, swallowing errors and panics
fn publish<V, E>(publisher: &dyn Publisher<V, E>, result: &ExperimentResult<V, E>) {
    match panic::catch_unwind(AssertUnwindSafe(|| publisher.publish(result))) {
        Ok(Ok(())) => {}
        Ok(Err(error)) => {
            tracing::warn!(experiment = result.name(), error = %error, "publisher failed, result dropped");
        }
        Err(payload) => {
            tracing::warn!(
                experiment = result.name(),
                panic = %panic_message(payload.as_ref()),
                "publisher panicked, result dropped"
            );
        }
    }
}

/// Turn the control outcome into what the caller sees.
///
/// A panic resumes with the original payload when it was kept.
fn conclude<V, E>(
    outcome: Result<V, Failure<E>>,
    payload: Option<PanicPayload>,
) -> Result<V, ExperimentError<E>> {
    match outcome {
        Ok(value) => Ok(value),
        Err(Failure::Error(error)) => Err(ExperimentError::Control(error)),
        Err(Failure::Interrupted(error)) => Err(ExperimentError::Interrupted(error)),
        Err(Failure::Panic(message)) => {
            panic::resume_unwind(payload.unwrap_or_else(|| Box::new(message)))
        }
    }
}

/// Configures an [`Experiment`]
pub struct ExperimentBuilder<V, E> {
    name: String,
    context: Context,
    mode: ExecutionMode,
    enabled: Arc<EnabledFn>,
    order: Arc<dyn OrderPolicy>,
    publisher: Arc<dyn Publisher<V, E>>,
}

impl<V, E> ExperimentBuilder<V, E> {
    /// Blocking, always enabled, 50/50 order, no-op publisher, empty context
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: Context::new(),
            mode: ExecutionMode::Blocking,
            enabled: Arc::new(|| true),
            order: Arc::new(RandomOrder::default()),
            publisher: Arc::new(NoopPublisher),
        }
    }

    /// Replace the context attached to every result
    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Add one context entry
    pub fn context_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Choose the scheduling mode
    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run on `pool` (pooled mode)
    pub fn pool(self, pool: Arc<dyn TaskPool>) -> Self {
        self.mode(ExecutionMode::Pooled(pool))
    }

    /// Decide per invocation whether the candidate runs at all
    pub fn enabled<F>(mut self, enabled: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.enabled = Arc::new(enabled);
        self
    }

    /// Decide per invocation which path starts first
    pub fn order<P>(mut self, order: P) -> Self
    where
        P: OrderPolicy + 'static,
    {
        self.order = Arc::new(order);
        self
    }

    /// Where results go
    pub fn publisher<P>(mut self, publisher: P) -> Self
    where
        P: Publisher<V, E> + 'static,
    {
        self.publisher = Arc::new(publisher);
        self
    }

    /// Validate and build
    pub fn build(self) -> Result<Experiment<V, E>, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        Ok(Experiment {
            name: self.name.into(),
            context: Arc::new(self.context),
            mode: self.mode,
            enabled: self.enabled,
            order: self.order,
            publisher: self.publisher,
        })
    }
}

impl<V, E> Default for ExperimentBuilder<V, E> {
    fn default() -> Self {
        Self::new(DEFAULT_NAME)
    }
}
