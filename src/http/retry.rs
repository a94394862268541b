//! Retry policy for HTTP observables.
//!
//! Retries happen inside the task of a single subscription, so the observable
//! still emits at most one value and unsubscribing cancels the backoff sleep
//! along with the request in flight.

use std::{future::Future, time::Duration};

use rand::Rng;
use tracing::warn;

use crate::FetchError;

/// Exponential backoff with optional jitter.
///
/// `max_attempts` counts the first request: a policy with `max_attempts == 3`
/// sends at most three requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of requests, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound of any delay.
    pub max_delay: Duration,
    /// Factor applied to the delay after every retry.
    pub backoff_multiplier: f64,
    /// Whether to randomize delays by up to `jitter_factor` in both directions.
    pub use_jitter: bool,
    /// Maximum jitter as a fraction of the delay (0.0 to 1.0).
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            use_jitter: true,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub const fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Sets the jitter factor, clamped to 0.0 to 1.0. A non-finite factor
    /// disables jitter.
    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = if factor.is_finite() {
            factor.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// Whether a request that failed with `error` on the zero-based `attempt`
    /// should be sent again.
    pub fn should_retry(&self, error: &FetchError, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts && error.is_retryable()
    }

    /// Delay to wait after the zero-based `attempt` failed.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_delay =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);

        let delay = Duration::from_millis(base_delay as u64).min(self.max_delay);

        if self.use_jitter {
            self.add_jitter(delay)
        } else {
            delay
        }
    }

    fn add_jitter(&self, delay: Duration) -> Duration {
        let jitter_range = delay.as_millis() as f64 * self.jitter_factor;
        if !jitter_range.is_finite() || jitter_range <= 0.0 {
            return delay;
        }
        let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);

        let new_delay = delay.as_millis() as f64 + jitter;
        Duration::from_millis(new_delay.max(0.0) as u64)
    }
}

/// Runs `operation` until it succeeds, fails with an error `policy` does not
/// retry, or runs out of attempts. Without a policy the operation runs once.
pub(crate) async fn execute<T, F, Fut>(
    policy: Option<&RetryPolicy>,
    url: &str,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;
    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        match policy {
            Some(policy) if policy.should_retry(&error, attempt) => {
                let delay = policy.calculate_delay(attempt);
                warn!(%url, attempt, ?delay, error = %error, "request failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            _ => return Err(error),
        }
    }
}
