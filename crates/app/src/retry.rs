//! Retry policy — exponential backoff for transient faults.
//!
//! Only errors classified as [`Transient`] are retried. Anything else
//! (unsupported operations, unknown commands) is returned on the first
//! attempt: retries mask operational hiccups, never misuse.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use smarthub_domain::error::Transient;

/// Backoff configuration: up to `max_attempts` calls, waiting `base_delay`
/// after the first failure and multiplying the wait by `multiplier` after
/// each further one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// # Errors
    ///
    /// Returns [`InvalidRetryPolicy`] when `max_attempts` is zero or the
    /// multiplier is negative or not finite.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        multiplier: f64,
    ) -> Result<Self, InvalidRetryPolicy> {
        if max_attempts == 0 {
            return Err(InvalidRetryPolicy::NoAttempts);
        }
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(InvalidRetryPolicy::Multiplier(multiplier));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            multiplier,
        })
    }

    /// A policy that calls the operation exactly once.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    #[must_use]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.multiplier).unwrap_or(Duration::MAX)
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// budget is spent.
    ///
    /// Waiting between attempts suspends only the current task.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::Permanent`] for the first non-transient error,
    /// or [`RetryError::Exhausted`] wrapping the last transient error once
    /// `max_attempts` calls have failed.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        E: Transient + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut delay = self.base_delay;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(RetryError::Permanent(err)),
                Err(err) if attempt >= self.max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = self.next_delay(delay);
                }
            }
        }
    }
}

/// Rejected [`RetryPolicy`] parameters.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum InvalidRetryPolicy {
    #[error("max_attempts must be greater than zero")]
    NoAttempts,
    #[error("multiplier must be finite and non-negative, got {0}")]
    Multiplier(f64),
}

/// Outcome of a failed [`RetryPolicy::execute`].
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a transient error.
    #[error("retries exhausted after {attempts} attempts")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },
    /// A non-transient error, returned without retrying.
    #[error(transparent)]
    Permanent(E),
}

impl<E> RetryError<E> {
    /// The underlying error, whichever way the retry loop ended.
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Permanent(err) => err,
        }
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use smarthub_domain::error::DeviceError;
    use smarthub_domain::id::DeviceId;
    use tokio::time::Instant;

    use super::*;

    fn busy() -> DeviceError {
        DeviceError::Busy { id: DeviceId::new(1) }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(100), 2.0).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn should_succeed_on_third_attempt_after_backoff() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let started = Instant::now();

        let result = policy()
            .execute(move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(busy())
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_exhaustion_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), _> = policy()
            .execute(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(busy())
            })
            .await;

        assert_eq!(
            result,
            Err(RetryError::Exhausted {
                attempts: 3,
                last: busy()
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let started = Instant::now();

        let result: Result<(), _> = policy()
            .execute(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(DeviceError::UnsupportedCommand("dim".to_string()))
            })
            .await;

        assert!(matches!(result, Err(RetryError::Permanent(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn should_call_once_with_no_retry_policy() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = RetryPolicy::no_retry()
            .execute(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(busy())
            })
            .await;
        assert!(result.unwrap_err().is_exhausted());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn should_reject_zero_attempts() {
        let result = RetryPolicy::new(0, Duration::ZERO, 2.0);
        assert_eq!(result, Err(InvalidRetryPolicy::NoAttempts));
    }

    #[test]
    fn should_reject_non_finite_multiplier() {
        assert!(RetryPolicy::new(3, Duration::ZERO, f64::NAN).is_err());
        assert!(RetryPolicy::new(3, Duration::ZERO, -1.0).is_err());
    }

    #[test]
    fn should_grow_delay_geometrically() {
        let policy = policy();
        let second = policy.next_delay(policy.base_delay());
        assert_eq!(second, Duration::from_millis(200));
        assert_eq!(policy.next_delay(second), Duration::from_millis(400));
    }

    #[test]
    fn should_unwrap_inner_error() {
        let err: RetryError<DeviceError> = RetryError::Exhausted {
            attempts: 3,
            last: busy(),
        };
        assert_eq!(err.to_string(), "retries exhausted after 3 attempts");
        assert_eq!(err.into_inner(), busy());
    }
}
