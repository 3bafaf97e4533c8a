//! Backoff policy for retrying provider requests
//!
//! The schedule is fixed rather than randomized: attempt 0 waits 1s,
//! attempt 1 waits 4s, and anything past the end of the schedule reuses the
//! last entry. The policy is stateless and takes no wall-clock input.

use crate::http::error::AiError;
use backoff::backoff::Backoff;
use std::time::Duration;

/// Delay schedule in milliseconds, indexed by attempt
pub const BACKOFF_SCHEDULE_MS: [u64; 2] = [1000, 4000];

/// Additional attempts after the first send
pub const MAX_RETRY_ATTEMPTS: u32 = 2;

/// Upper bound on a provider-advertised `Retry-After`
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Delay before retrying after `attempt` under the default schedule
pub fn next_delay_ms(attempt: u32) -> u64 {
    let index = (attempt as usize).min(BACKOFF_SCHEDULE_MS.len() - 1);
    BACKOFF_SCHEDULE_MS[index]
}

/// Stretch a scheduled delay to honour a provider `Retry-After`, capped at
/// [`MAX_RETRY_AFTER`]
pub fn with_retry_after(scheduled: Duration, retry_after: Option<Duration>) -> Duration {
    match retry_after {
        Some(advertised) => scheduled.max(advertised.min(MAX_RETRY_AFTER)),
        None => scheduled,
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delays indexed by attempt; never empty
    schedule: Vec<Duration>,
    /// Maximum number of retries after the first attempt
    max_retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            schedule: BACKOFF_SCHEDULE_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            max_retries: MAX_RETRY_ATTEMPTS,
        }
    }
}

impl BackoffPolicy {
    /// Default schedule with a custom retry budget
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Replace the delay schedule. An empty schedule is ignored.
    pub fn with_schedule(mut self, schedule: Vec<Duration>) -> Self {
        if !schedule.is_empty() {
            self.schedule = schedule;
        }
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before the retry that follows `attempt`
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let index = (attempt as usize).min(self.schedule.len() - 1);
        self.schedule[index]
    }

    pub fn next_delay_ms(&self, attempt: u32) -> u64 {
        self.next_delay(attempt).as_millis() as u64
    }

    /// Decide whether a failed `attempt` should be retried
    pub fn decide(&self, attempt: u32, error: &AiError, retry_after: Option<Duration>) -> RetryDecision {
        if !error.retryable || attempt >= self.max_retries {
            return RetryDecision::NoRetry;
        }

        RetryDecision::Retry {
            delay: with_retry_after(self.next_delay(attempt), retry_after),
        }
    }

    /// Iterator-style view of the schedule for one logical call
    pub fn backoff(&self) -> ScheduledBackoff {
        ScheduledBackoff {
            policy: self.clone(),
            attempt: 0,
        }
    }
}

/// Decision on whether to retry a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay
    Retry { delay: Duration },
    /// Do not retry the request
    NoRetry,
}

/// Per-call cursor over a [`BackoffPolicy`], yielding `None` once the retry
/// budget is spent
#[derive(Debug, Clone)]
pub struct ScheduledBackoff {
    policy: BackoffPolicy,
    attempt: u32,
}

impl ScheduledBackoff {
    /// Number of delays handed out so far
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

impl Backoff for ScheduledBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempt >= self.policy.max_retries {
            return None;
        }
        let delay = self.policy.next_delay(self.attempt);
        self.attempt += 1;
        Some(delay)
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::error::ErrorKind;

    #[test]
    fn test_schedule_values() {
        assert_eq!(next_delay_ms(0), 1000);
        assert_eq!(next_delay_ms(1), 4000);
        assert_eq!(next_delay_ms(2), 4000);
        assert_eq!(next_delay_ms(17), 4000);

        let policy = BackoffPolicy::default();
        assert_eq!(policy.next_delay_ms(0), 1000);
        assert_eq!(policy.next_delay_ms(5), 4000);
        assert_eq!(policy.max_retries(), MAX_RETRY_ATTEMPTS);
    }

    #[test]
    fn test_backoff_budget() {
        let mut backoff = BackoffPolicy::default().backoff();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(1000)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(4000)));
        assert_eq!(backoff.next_backoff(), None);
        assert_eq!(backoff.attempts(), 2);

        backoff.reset();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_decide_respects_retryability() {
        let policy = BackoffPolicy::default();

        let unauthorized = AiError::new(ErrorKind::Unauthorized);
        assert_eq!(policy.decide(0, &unauthorized, None), RetryDecision::NoRetry);

        let server = AiError::new(ErrorKind::ServerError);
        assert_eq!(
            policy.decide(0, &server, None),
            RetryDecision::Retry {
                delay: Duration::from_millis(1000)
            }
        );
        assert_eq!(policy.decide(2, &server, None), RetryDecision::NoRetry);
    }

    #[test]
    fn test_retry_after_is_floor_and_capped() {
        let policy = BackoffPolicy::default();
        let limited = AiError::new(ErrorKind::RateLimited);

        assert_eq!(
            policy.decide(0, &limited, Some(Duration::from_secs(10))),
            RetryDecision::Retry {
                delay: Duration::from_secs(10)
            }
        );
        assert_eq!(
            policy.decide(1, &limited, Some(Duration::from_secs(1))),
            RetryDecision::Retry {
                delay: Duration::from_millis(4000)
            }
        );
        assert_eq!(
            policy.decide(0, &limited, Some(Duration::from_secs(600))),
            RetryDecision::Retry {
                delay: MAX_RETRY_AFTER
            }
        );
    }

    #[test]
    fn test_custom_schedule() {
        let policy = BackoffPolicy::new(3).with_schedule(vec![Duration::from_millis(5)]);
        assert_eq!(policy.next_delay_ms(0), 5);
        assert_eq!(policy.next_delay_ms(2), 5);

        let unchanged = BackoffPolicy::default().with_schedule(Vec::new());
        assert_eq!(unchanged, BackoffPolicy::default());
    }
}
