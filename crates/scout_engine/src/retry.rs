use std::time::Duration;

use crate::{FailureKind, UpstreamError};

/// Retry policy for failed upstream page requests.
///
/// The default makes no retries: the first failure ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Whether failure number `attempt` (1-based) should be retried.
    pub fn should_retry(&self, attempt: u32, err: &UpstreamError) -> bool {
        attempt <= self.max_retries && is_transient(&err.kind)
    }

    /// Delay before retry number `attempt` (1-based): `base_delay * 2^(attempt-1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

fn is_transient(kind: &FailureKind) -> bool {
    match kind {
        FailureKind::Network | FailureKind::Timeout => true,
        FailureKind::HttpStatus(code) => *code == 429 || (500..600).contains(code),
        FailureKind::InvalidUrl | FailureKind::MalformedResponse => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_never_retries() {
        let err = UpstreamError::new(FailureKind::Timeout, "slow");
        assert!(!RetryPolicy::default().should_retry(1, &err));
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn only_transient_failures_are_retried() {
        let policy = RetryPolicy::with_retries(2);
        let busy = UpstreamError::new(FailureKind::HttpStatus(503), "busy");
        let missing = UpstreamError::new(FailureKind::HttpStatus(404), "gone");
        let garbled = UpstreamError::new(FailureKind::MalformedResponse, "bad json");
        assert!(policy.should_retry(2, &busy));
        assert!(!policy.should_retry(3, &busy));
        assert!(!policy.should_retry(1, &missing));
        assert!(!policy.should_retry(1, &garbled));
    }
}
