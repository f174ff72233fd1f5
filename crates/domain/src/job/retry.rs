//! Retry policy: how many times a job runs and how long it waits between runs.

use std::time::Duration;

use chrono::TimeDelta;

use crate::error::{HearthError, ValidationError};
use crate::time::Timestamp;

/// Bounded exponential backoff.
///
/// The delay after the `n`-th failed attempt is
/// `base_delay * multiplier^(n - 1)`, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total executions allowed, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(3600),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries immediately, mostly useful in tests.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Check the policy is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroMaxAttempts`] when `max_attempts` is 0.
    pub fn validate(&self) -> Result<(), HearthError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::ZeroMaxAttempts.into());
        }
        Ok(())
    }

    /// Delay before retrying after `attempt` executions have failed.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let raw = self.base_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        let capped = raw.min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }

    /// Absolute time of the next attempt after `attempt` failures at `now`.
    #[must_use]
    pub fn retry_at(&self, now: Timestamp, attempt: u32) -> Timestamp {
        TimeDelta::from_std(self.backoff(attempt)).map_or(now, |delta| now + delta)
    }
}
