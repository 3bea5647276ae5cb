//! Wall-Clock Timing
//!
//! `TimingExecutor` starts a clock before delegating and records the elapsed
//! time on the way out, whether the call succeeded or failed.

use crate::chain::{Completed, Direct, Executor};
use crate::error::ExecutionError;
use std::time::Instant;

/// Measures the duration of each execution
///
/// The measurement is returned with the call (`Completed::duration` or
/// `ExecutionError::duration`); nothing is kept between calls, so a single
/// instance can time concurrent calls from many threads.
#[derive(Debug, Clone, Default)]
pub struct TimingExecutor<I = Direct> {
    inner: I,
}

impl TimingExecutor {
    /// A timing executor that invokes the work itself
    pub fn new() -> Self {
        Self { inner: Direct }
    }

    /// Time single-use `work`, run once by the leaf
    pub fn execute_once<V, E, F>(&self, work: F) -> Result<Completed<V>, ExecutionError<E>>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let start = Instant::now();
        stamp(self.inner.execute_once(work), start)
    }
}

impl<I: Executor> TimingExecutor<I> {
    /// A timing executor around `inner`; the clock covers the whole inner call
    pub fn chained(inner: I) -> Self {
        Self { inner }
    }

    /// The wrapped executor
    pub fn inner(&self) -> &I {
        &self.inner
    }
}

impl<I: Executor> Executor for TimingExecutor<I> {
    fn execute<V, E, F>(&self, work: F) -> Result<Completed<V>, ExecutionError<E>>
    where
        F: FnMut() -> Result<V, E>,
    {
        let start = Instant::now();
        stamp(self.inner.execute(work), start)
    }
}

/// Record the time elapsed since `start` on either outcome
fn stamp<V, E>(
    outcome: Result<Completed<V>, ExecutionError<E>>,
    start: Instant,
) -> Result<Completed<V>, ExecutionError<E>> {
    let elapsed = start.elapsed();
    match outcome {
        Ok(mut done) => {
            done.stats.duration = Some(elapsed);
            Ok(done)
        }
        Err(mut error) => {
            error.stats_mut().duration = Some(elapsed);
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Failure;
    use crate::trial::TrialExecutor;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_duration_on_success() {
        let timing = TimingExecutor::new();
        let done = timing
            .execute(|| {
                std::thread::sleep(Duration::from_millis(10));
                Ok::<_, ()>(7)
            })
            .unwrap();

        assert_eq!(done.value, 7);
        let elapsed = done.duration().unwrap();
        // Should be at least 10ms
        assert!(elapsed >= Duration::from_millis(10));
        assert_eq!(done.trials(), None);
    }

    #[test]
    fn test_duration_recorded_on_failure() {
        let timing = TimingExecutor::new();
        let err = timing
            .execute(|| {
                std::thread::sleep(Duration::from_millis(5));
                Err::<(), _>("late failure")
            })
            .unwrap_err();

        assert_eq!(err.cause(), &Failure::Error("late failure"));
        assert!(err.duration().unwrap() >= Duration::from_millis(5));
    }

    #[test]
    fn test_duration_recorded_on_panic() {
        let err = TimingExecutor::new()
            .execute(|| -> Result<(), ()> {
                std::thread::sleep(Duration::from_millis(2));
                panic!("slow panic")
            })
            .unwrap_err();

        assert!(matches!(err.cause(), Failure::Panic(m) if m == "slow panic"));
        assert!(err.duration().unwrap() > Duration::ZERO);
    }

    #[test]
    fn test_execute_once_keeps_the_work_error() {
        let reason = String::from("database down");
        let err = TimingExecutor::new()
            .execute_once(move || {
                std::thread::sleep(Duration::from_millis(2));
                Err::<(), _>(reason)
            })
            .unwrap_err();

        assert_eq!(err.cause(), &Failure::Error("database down".to_string()));
        assert_eq!(err.trials(), None);
        assert!(err.duration().unwrap() >= Duration::from_millis(2));
    }

    #[test]
    fn test_outer_timing_covers_all_attempts() {
        let chain = TimingExecutor::chained(TrialExecutor::new(3).unwrap());
        let mut calls = 0;
        let done = chain
            .execute(|| {
                calls += 1;
                std::thread::sleep(Duration::from_millis(5));
                if calls < 3 { Err("retry me") } else { Ok(calls) }
            })
            .unwrap();

        assert_eq!(done.value, 3);
        assert_eq!(done.trials(), Some(3));
        assert!(done.duration().unwrap() >= Duration::from_millis(15));
    }

    #[test]
    fn test_inner_failure_passes_through_unchanged() {
        let inner = TrialExecutor::new(2).unwrap();
        let chain = TimingExecutor::chained(&inner);
        let err = chain.execute(|| Err::<(), _>(404)).unwrap_err();

        assert_eq!(err.cause(), &Failure::Error(404));
        assert_eq!(err.trials(), Some(2));
        assert!(err.duration().is_some());
    }

    #[test]
    fn test_concurrent_calls_keep_their_own_duration() {
        let timing = Arc::new(TimingExecutor::new());

        std::thread::scope(|scope| {
            let handles: Vec<_> = [1u64, 40]
                .into_iter()
                .map(|millis| {
                    let timing = Arc::clone(&timing);
                    scope.spawn(move || {
                        let done = timing
                            .execute(|| {
                                std::thread::sleep(Duration::from_millis(millis));
                                Ok::<_, ()>(millis)
                            })
                            .unwrap();
                        (done.value, done.duration().unwrap())
                    })
                })
                .collect();

            for handle in handles {
                let (millis, elapsed) = handle.join().unwrap();
                assert!(elapsed >= Duration::from_millis(millis));
            }
        });
    }
}
