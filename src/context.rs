//! 调用上下文
//!
//! 携带取消信号和截止时间，贯穿一次端点调用的全部层次。
//! 父上下文取消会传播到所有子上下文；子上下文的截止时间
//! 不会晚于父上下文。

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// 调用上下文
#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

/// 取消句柄
///
/// 由 [`Context::with_cancel`] 返回，丢弃句柄不会取消上下文。
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// 取消关联的上下文及其所有子上下文
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// 是否已取消
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Context {
    /// 根上下文：永不取消，没有截止时间
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// 创建带超时的子上下文
    ///
    /// 超时大到无法表示为时间点时（如 `Duration::MAX`）不增加截止时间，
    /// 沿用父上下文的截止时间。
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => Self {
                token: self.token.child_token(),
                deadline: self.deadline,
            },
        }
    }

    /// 创建带截止时间的子上下文，截止时间取父子两者中较早者
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// 创建可手动取消的子上下文
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let token = self.token.child_token();
        let handle = CancelHandle {
            token: token.clone(),
        };
        (
            Self {
                token,
                deadline: self.deadline,
            },
            handle,
        )
    }

    /// 截止时间
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// 剩余时间，没有截止时间时返回 `None`
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// 上下文结束的原因；尚未结束时返回 `None`
    ///
    /// 取消优先于超时。
    pub fn err(&self) -> Option<Error> {
        if self.token.is_cancelled() {
            return Some(Error::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Error::DeadlineExceeded),
            _ => None,
        }
    }

    /// 是否已结束
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// 等待上下文结束，返回结束原因
    pub async fn done(&self) -> Error {
        if let Some(err) = self.err() {
            return err;
        }
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => Error::Canceled,
                    _ = tokio::time::sleep_until(deadline) => Error::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                Error::Canceled
            }
        }
    }

    /// 在上下文约束下运行 future
    ///
    /// 上下文先结束时丢弃 future 并返回取消类错误。
    pub async fn run<F>(&self, fut: F) -> Result<F::Output>
    where
        F: Future,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            output = fut => Ok(output),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_expires() {
        let ctx = Context::background().with_timeout(Duration::from_secs(1));
        assert!(ctx.err().is_none());

        let err = ctx.done().await;
        assert!(matches!(err, Error::DeadlineExceeded));
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn test_parent_cancel_propagates() {
        let (parent, handle) = Context::background().with_cancel();
        let child = parent.with_timeout(Duration::from_secs(60));

        handle.cancel();
        assert!(matches!(child.err(), Some(Error::Canceled)));
        assert!(matches!(child.done().await, Error::Canceled));
    }

    #[tokio::test]
    async fn test_child_deadline_never_later_than_parent() {
        let parent = Context::background().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(10));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_cancellation_promptly() {
        let ctx = Context::background().with_timeout(Duration::from_millis(50));
        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert!(matches!(result, Err(Error::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_inherits_parent_deadline() {
        let unbounded = Context::background().with_timeout(Duration::MAX);
        assert!(unbounded.deadline().is_none());
        assert!(unbounded.err().is_none());

        let parent = Context::background().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::MAX);
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test]
    async fn test_child_cancel_does_not_affect_parent() {
        let parent = Context::background();
        let (child, handle) = parent.with_cancel();
        handle.cancel();
        assert!(child.is_done());
        assert!(!parent.is_done());
    }
}
