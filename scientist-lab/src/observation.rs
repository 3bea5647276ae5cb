//! Observation Capture
//!
//! Runs one unit of work through a fresh timing executor and records what
//! happened. Capturing never fails: errors and panics become the
//! observation's failure.

use scientist_core::{Failure, PoolError, TimingExecutor, panic_message};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

/// Raw payload of a panic, as handed to `resume_unwind`
pub(crate) type PanicPayload = Box<dyn Any + Send>;

/// What happened when a control or candidate ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation<V, E> {
    outcome: Result<V, Failure<E>>,
    duration: Duration,
}

impl<V, E> Observation<V, E> {
    /// Build an observation from an outcome and its wall-clock duration
    pub fn new(outcome: Result<V, Failure<E>>, duration: Duration) -> Self {
        Self { outcome, duration }
    }

    /// Observation for a task that never reported back
    pub(crate) fn interrupted(error: PoolError) -> Self {
        Self::new(Err(Failure::Interrupted(error)), Duration::ZERO)
    }

    /// The value, if the work succeeded
    pub fn value(&self) -> Option<&V> {
        self.outcome.as_ref().ok()
    }

    /// The failure, if the work failed
    pub fn failure(&self) -> Option<&Failure<E>> {
        self.outcome.as_ref().err()
    }

    /// Borrow the outcome
    pub fn outcome(&self) -> Result<&V, &Failure<E>> {
        self.outcome.as_ref()
    }

    /// Consume into the outcome
    pub fn into_outcome(self) -> Result<V, Failure<E>> {
        self.outcome
    }

    /// Whether the work produced a value
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Wall-clock time of the single attempt
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Run `work` once and record its outcome and duration
pub fn observe<V, E, F>(work: F) -> Observation<V, E>
where
    F: FnOnce() -> Result<V, E>,
{
    match TimingExecutor::new().execute_once(work) {
        Ok(done) => Observation::new(Ok(done.value), done.stats.duration.unwrap_or_default()),
        Err(error) => {
            let duration = error.duration().unwrap_or_default();
            Observation::new(Err(error.into_cause()), duration)
        }
    }
}

/// Like [`observe`], but also hand back the untouched payload if `work`
/// panicked. The observation itself records the panic message.
pub(crate) fn observe_with_payload<V, E, F>(work: F) -> (Observation<V, E>, Option<PanicPayload>)
where
    F: FnOnce() -> Result<V, E>,
{
    let mut payload = None;
    let observation = observe(|| match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(outcome) => outcome,
        Err(raw) => {
            let message = panic_message(raw.as_ref());
            payload = Some(raw);
            // resume_unwind skips the panic hook, so the panic is reported once
            panic::resume_unwind(Box::new(message))
        }
    });
    (observation, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_value() {
        let observation = observe(|| {
            std::thread::sleep(Duration::from_millis(2));
            Ok::<_, String>(5)
        });
        assert!(observation.is_success());
        assert_eq!(observation.value(), Some(&5));
        assert!(observation.failure().is_none());
        assert!(observation.duration() >= Duration::from_millis(2));
    }

    #[test]
    fn test_observe_error_keeps_original() {
        let observation: Observation<(), _> = observe(|| Err(String::from("nope")));
        assert_eq!(observation.value(), None);
        assert_eq!(
            observation.failure(),
            Some(&Failure::Error("nope".to_string()))
        );
        assert!(observation.duration() > Duration::ZERO);
    }

    #[test]
    fn test_observe_panic_is_captured() {
        let observation: Observation<u8, ()> = observe(|| panic!("candidate blew up"));
        assert_eq!(
            observation.into_outcome(),
            Err(Failure::Panic("candidate blew up".to_string()))
        );
    }

    #[test]
    fn test_payload_kept_alongside_message() {
        let (observation, payload) =
            observe_with_payload(|| -> Result<u8, ()> { panic!("static literal") });
        assert_eq!(
            observation.failure(),
            Some(&Failure::Panic("static literal".to_string()))
        );
        let payload = payload.unwrap();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"static literal"));

        let (observation, payload) =
            observe_with_payload(|| -> Result<u8, ()> { panic::panic_any(7u32) });
        assert_eq!(
            observation.failure(),
            Some(&Failure::Panic("Unknown panic".to_string()))
        );
        assert_eq!(payload.unwrap().downcast_ref::<u32>(), Some(&7));
    }

    #[test]
    fn test_no_payload_without_panic() {
        let (observation, payload) = observe_with_payload(|| Err::<u8, _>("plain error"));
        assert_eq!(observation.failure(), Some(&Failure::Error("plain error")));
        assert!(payload.is_none());
    }

    #[test]
    fn test_interrupted_observation() {
        let observation: Observation<u8, ()> = Observation::interrupted(PoolError::Disconnected);
        assert_eq!(
            observation.failure(),
            Some(&Failure::Interrupted(PoolError::Disconnected))
        );
        assert_eq!(observation.duration(), Duration::ZERO);
    }
}
