use super::RetryPolicy;
use crate::error::Error;
use std::time::Duration;

/// 指数退避重试策略
///
/// 第 n 次失败后等待 `base_delay * 2^(n-1)`，不超过 `max_delay`。
pub struct ExponentialBackoffPolicy {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl ExponentialBackoffPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }
}

impl RetryPolicy for ExponentialBackoffPolicy {
    fn should_retry(&self, attempt: usize, error: &Error) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }

        // 只对可重试的错误进行重试
        error.is_retryable()
    }

    fn backoff_duration(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(10) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift);
        delay.min(self.max_delay)
    }

    fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_capped() {
        let policy = ExponentialBackoffPolicy::new(
            10,
            Duration::from_millis(100),
            Duration::from_millis(500),
        );
        assert_eq!(policy.backoff_duration(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_duration(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_duration(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_duration(4), Duration::from_millis(500));
        assert_eq!(policy.backoff_duration(60), Duration::from_millis(500));
    }

    #[test]
    fn test_stops_at_max_attempts() {
        let policy =
            ExponentialBackoffPolicy::new(2, Duration::from_millis(10), Duration::from_secs(1));
        assert!(policy.should_retry(1, &Error::transport("reset")));
        assert!(!policy.should_retry(2, &Error::transport("reset")));
    }
}
