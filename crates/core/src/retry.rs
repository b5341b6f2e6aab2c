//! Linear-backoff retry policy for whole-pipeline attempts.
//!
//! After a transient failure on attempt `n` the caller waits
//! `n * backoff_unit` (5 s, 10 s, 15 s, ... by default) and starts the
//! next attempt. Permanent failures and exhausted budgets are terminal.

use std::time::Duration;

/// Default number of attempts per pipeline invocation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff unit.
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(5);

/// Tunable parameters for the linear-backoff strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Treated as at least 1.
    pub max_attempts: u32,
    /// Multiplied by the attempt number to get the wait.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts,
            backoff_unit,
        }
    }

    /// Effective attempt budget (never zero).
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait after a transient failure on 1-based `attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }

    /// Total time slept when every attempt fails transiently.
    pub fn total_backoff(&self) -> Duration {
        (1..self.attempts())
            .map(|attempt| self.backoff_for(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Decide what follows a failed attempt.
    pub fn after_failure(&self, attempt: u32, transient: bool) -> AttemptState {
        if !transient {
            AttemptState::Error { transient: false }
        } else if attempt >= self.attempts() {
            AttemptState::Error { transient: true }
        } else {
            AttemptState::Backoff(self.backoff_for(attempt))
        }
    }
}

/// What follows a failed attempt under the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Transient failure with budget left; wait, then run the next attempt.
    Backoff(Duration),
    /// Terminal failure. `transient` tells whether the budget ran out on a
    /// retryable error or a permanent error stopped the loop.
    Error { transient: bool },
}
