//! Retry policy with exponential backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::ConfigError;
use crate::retry::Retryable;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of invocations of the operation, first one included.
    pub max_retries: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Growth factor applied to the delay after each failure.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Creates a default policy with the given attempt budget.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Builds the policy from server configuration.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            max_retries: config.retry_max_retries,
            initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
            backoff_multiplier: config.retry_backoff_multiplier,
        }
    }

    /// Rejects policies that could never make progress or never back off.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if !(self.backoff_multiplier > 1.0) {
            return Err(ConfigError::Invalid(format!(
                "backoff_multiplier must be greater than 1, got {}",
                self.backoff_multiplier
            )));
        }
        if self.initial_delay > self.max_delay {
            return Err(ConfigError::Invalid(
                "initial_delay must not exceed max_delay".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay slept after failed attempt `attempt` (1-based).
    ///
    /// `min(initial_delay * backoff_multiplier^(attempt - 1), max_delay)`
    ///
    /// Values that are negative or not representable fall back to `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());

        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }

    /// Upper bound on the total time spent sleeping across all retries.
    pub fn total_delay_bound(&self) -> Duration {
        (1..self.max_retries.max(1))
            .map(|attempt| self.delay_for_attempt(attempt))
            .sum()
    }

    /// Executes `f`, retrying transient failures.
    pub async fn execute<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        self.execute_with(f, |_, _| {}).await
    }

    /// Executes `f`, calling `on_retry(attempt, &error)` before each backoff.
    ///
    /// Terminal errors are returned on first occurrence. Once the attempt
    /// budget is spent the last error is returned as-is.
    pub async fn execute_with<F, Fut, T, E, R>(&self, mut f: F, mut on_retry: R) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
        R: FnMut(u32, &E),
    {
        let max_retries = self.max_retries.max(1);
        let mut attempt = 1;

        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => {
                    debug!(attempt, error = %err, "Non-retryable error, giving up");
                    return Err(err);
                }
                Err(err) if attempt >= max_retries => {
                    error!(attempts = attempt, error = %err, "Operation failed after all retries");
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Operation failed, retrying"
                    );
                    on_retry(attempt, &err);
                    drop(err);

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
