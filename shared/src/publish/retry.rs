//! Async retry policy with capped exponential backoff.

use std::future::Future;
use std::time::Duration;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default delay before the first retry, in milliseconds.
pub const DEFAULT_MIN_DELAY_MS: u64 = 1000;

/// Default upper bound for any single delay, in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;

/// Factor applied to the delay after every retry.
pub const BACKOFF_MULTIPLIER: u32 = 2;

/// How often and how patiently to retry a failing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            min_delay: Duration::from_millis(DEFAULT_MIN_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

/// The error of the last attempt of an operation that never succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure<E> {
    /// Error returned by the last attempt.
    pub error: E,
    /// Number of attempts made, including the first.
    pub attempts: u32,
    /// True if the loop stopped because retries ran out rather than on a terminal error.
    pub exhausted: bool,
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub fn new(max_retries: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            min_delay,
            max_delay,
        }
    }

    /// Returns the delay to wait before the given retry (1-based).
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::publish::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.delay_before_retry(1), Duration::from_secs(1));
    /// assert_eq!(policy.delay_before_retry(3), Duration::from_secs(4));
    /// assert_eq!(policy.delay_before_retry(10), Duration::from_secs(60));
    /// ```
    #[must_use]
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let factor = BACKOFF_MULTIPLIER.saturating_pow(retry.saturating_sub(1));
        self.min_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs an async operation until it succeeds, fails terminally, or retries run out.
    ///
    /// `is_retryable` classifies each error; a terminal error stops the loop at once.
    /// Returns the number of attempts on success.
    ///
    /// # Errors
    ///
    /// Returns the last error together with the attempt count if the operation
    /// never succeeded.
    pub async fn run<F, Fut, E, C>(&self, mut operation: F, is_retryable: C) -> Result<u32, RetryFailure<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: std::fmt::Display,
        C: Fn(&E) -> bool,
    {
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match operation().await {
                Ok(()) => return Ok(attempts),
                Err(e) => {
                    if !is_retryable(&e) {
                        return Err(RetryFailure {
                            error: e,
                            attempts,
                            exhausted: false,
                        });
                    }
                    if attempts > self.max_retries {
                        return Err(RetryFailure {
                            error: e,
                            attempts,
                            exhausted: true,
                        });
                    }
                    let delay = self.delay_before_retry(attempts);
                    tracing::warn!(
                        error = %e,
                        attempt = attempts,
                        delay_ms = delay.as_millis(),
                        "Retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
