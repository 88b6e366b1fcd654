//! Retry policy and the per-attempt decision.

use crate::config::RetryConfig;
use crate::executor::{ExecutionFailure, ExecutionResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Retry policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,

    /// Delay after the first failed attempt, in milliseconds.
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds.
    pub max_delay_ms: u64,

    /// Backoff multiplier.
    pub multiplier: f64,
}

/// What the worker does after an attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// The attempt succeeded.
    Complete(Value),
    /// The attempt failed; sleep `backoff` and try again.
    Retry {
        failure: ExecutionFailure,
        backoff: Duration,
    },
    /// The attempt failed and no attempts remain.
    Fail {
        failure: ExecutionFailure,
        total_attempts: u32,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3)
    }
}

impl RetryPolicy {
    /// Exponential backoff of `2^attempt` seconds (1s, 2s, 4s, ...).
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay_ms: 1000, // 1 second
            max_delay_ms: 300_000,  // 5 minutes
            multiplier: 2.0,
        }
    }

    /// Returns true if another attempt may follow attempt `attempt` (0-based).
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }

    /// Delay after failed attempt `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(exp);
        let delay_ms = if delay.is_finite() { delay as u64 } else { u64::MAX };

        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }

    /// Sum of every backoff a job can sleep through before failing.
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|attempt| self.delay_for_attempt(attempt))
            .sum()
    }

    /// Decide the next step after attempt `attempt` produced `result`.
    pub fn decide(&self, attempt: u32, result: ExecutionResult) -> RetryDecision {
        match result {
            Ok(value) => RetryDecision::Complete(value),
            Err(failure) if self.should_retry(attempt) => RetryDecision::Retry {
                failure,
                backoff: self.delay_for_attempt(attempt),
            },
            Err(failure) => RetryDecision::Fail {
                failure,
                total_attempts: attempt + 1,
            },
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay_ms: config.initial_backoff_ms,
            max_delay_ms: config.max_backoff_ms,
            multiplier: config.multiplier,
        }
    }
}
