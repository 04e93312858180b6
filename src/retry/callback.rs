use super::{RetryDecision, RetryPolicy};
use crate::error::Error;

/// 回调重试策略
///
/// 回调返回 `(是否继续, 替换错误)`，次数不设上限，仅受重试超时约束。
pub struct Callback<F> {
    callback: F,
}

impl<F> Callback<F>
where
    F: Fn(usize, &Error) -> (bool, Option<Error>) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> RetryPolicy for Callback<F>
where
    F: Fn(usize, &Error) -> (bool, Option<Error>) + Send + Sync,
{
    fn should_retry(&self, attempt: usize, error: &Error) -> bool {
        (self.callback)(attempt, error).0
    }

    fn max_attempts(&self) -> usize {
        usize::MAX
    }

    fn on_failure(&self, attempt: usize, error: &Error) -> RetryDecision {
        let (keep_trying, replacement) = (self.callback)(attempt, error);
        RetryDecision {
            keep_trying,
            replacement,
        }
    }
}
