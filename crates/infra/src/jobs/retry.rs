//! Retry policy and the supervising retry loop.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Linear backoff: base * attempt
    #[default]
    Linear,
    /// Exponential backoff: base * 2^(attempt - 1)
    Exponential,
}

impl FromStr for BackoffStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            other => Err(format!("unknown backoff strategy `{other}` (fixed, linear, exponential)")),
        }
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Backoff unit
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2), BackoffStrategy::Linear)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, strategy: BackoffStrategy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(300),
            strategy,
        }
    }

    /// Create a policy that gives up after the first failure.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, BackoffStrategy::Fixed)
    }

    /// Calculate delay after a failed attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Linear => self.base_delay.saturating_mul(attempt),
            BackoffStrategy::Exponential => {
                let factor = 2u32.saturating_pow(attempt - 1);
                self.base_delay.saturating_mul(factor)
            }
        };
        delay.min(self.max_delay)
    }

    /// Check if another attempt is allowed after `attempt` failed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Runs `op` until it succeeds or the policy is exhausted.
///
/// Sleeps `policy.delay_for_attempt(n)` after the n-th failure. The last
/// failure is returned as-is so the process can exit loudly.
pub fn retry_with_backoff<T, E, F, S>(policy: &RetryPolicy, mut sleep: S, mut op: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Result<T, E>,
    S: FnMut(Duration),
{
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if policy.should_retry(attempt) => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(attempt, max_attempts = policy.max_attempts, delay_ms = delay.as_millis() as u64, error = %err, "attempt failed, backing off");
                sleep(delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_backoff_increases_linearly() {
        let policy = RetryPolicy::new(5, Duration::from_secs(2), BackoffStrategy::Linear);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(6));
    }

    #[test]
    fn exponential_backoff_calculates_correctly() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), BackoffStrategy::Exponential);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(800));
    }

    #[test]
    fn delays_are_capped() {
        let mut policy = RetryPolicy::new(50, Duration::from_secs(10), BackoffStrategy::Exponential);
        policy.max_delay = Duration::from_secs(60);
        assert_eq!(policy.delay_for_attempt(40), Duration::from_secs(60));
    }

    #[test]
    fn zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO, BackoffStrategy::Fixed).max_attempts, 1);
    }

    #[test]
    fn recovers_before_exhaustion() {
        let mut slept = Vec::new();
        let result: Result<&str, String> = retry_with_backoff(
            &RetryPolicy::default(),
            |d| slept.push(d),
            |attempt| if attempt < 3 { Err(format!("boom {attempt}")) } else { Ok("done") },
        );
        assert_eq!(result, Ok("done"));
        assert_eq!(slept, vec![Duration::from_secs(2), Duration::from_secs(4)]);
    }

    #[test]
    fn final_failure_propagates() {
        let mut calls = 0;
        let mut slept = Vec::new();
        let result: Result<(), String> = retry_with_backoff(
            &RetryPolicy::default(),
            |d| slept.push(d),
            |attempt| {
                calls += 1;
                Err(format!("boom {attempt}"))
            },
        );
        assert_eq!(result, Err("boom 3".to_string()));
        assert_eq!(calls, 3);
        // no sleep after the last attempt
        assert_eq!(slept.len(), 2);
    }
}
