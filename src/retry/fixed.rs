use super::RetryPolicy;
use crate::error::Error;
use std::time::Duration;

/// 固定延迟重试策略
pub struct FixedRetryPolicy {
    max_attempts: usize,
    delay: Duration,
}

impl FixedRetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl RetryPolicy for FixedRetryPolicy {
    fn should_retry(&self, attempt: usize, error: &Error) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }

        // 只对可重试的错误进行重试
        error.is_retryable()
    }

    fn backoff_duration(&self, _attempt: usize) -> Duration {
        self.delay
    }

    fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_retryable_errors() {
        let policy = FixedRetryPolicy::new(3, Duration::from_millis(50));
        assert!(policy.should_retry(1, &Error::NoEndpoints));
        assert!(policy.should_retry(2, &Error::transport("reset")));
        assert!(!policy.should_retry(3, &Error::transport("reset")));
        assert!(!policy.should_retry(1, &Error::business("rejected")));
        assert_eq!(policy.backoff_duration(2), Duration::from_millis(50));
    }
}
