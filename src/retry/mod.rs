//! 重试模块
//!
//! 把 [`Balancer`] 包装为单个可靠的端点：所有尝试共享同一个截止时间，
//! 每次尝试重新向均衡器选择端点；上下文取消或超时时立即终止，
//! 不再进行任何尝试。

pub mod callback;
pub mod exponential;
pub mod fixed;

pub use callback::Callback;
pub use exponential::ExponentialBackoffPolicy;
pub use fixed::FixedRetryPolicy;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::balancer::Balancer;
use crate::context::Context;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result, RetryError};

/// 选择端点失败且策略没有退避时，下一次尝试前的最小等待
///
/// 让出运行时，使 Endpointer 有机会发布新的成员快照。
pub const SELECTION_RETRY_PAUSE: Duration = Duration::from_millis(10);

/// 一次失败后的重试决定
#[derive(Debug, Clone, Default)]
pub struct RetryDecision {
    /// 是否继续尝试
    pub keep_trying: bool,
    /// 放弃时替换最终上报的错误
    pub replacement: Option<Error>,
}

/// 重试策略 trait
///
/// `attempt` 为已经完成的尝试次数，从 1 开始。
pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, attempt: usize, error: &Error) -> bool;

    fn backoff_duration(&self, _attempt: usize) -> Duration {
        Duration::ZERO
    }

    fn max_attempts(&self) -> usize;

    fn on_failure(&self, attempt: usize, error: &Error) -> RetryDecision {
        RetryDecision {
            keep_trying: self.should_retry(attempt, error),
            replacement: None,
        }
    }
}

/// 最大尝试次数策略：任何非取消类错误都会重试，没有退避
#[derive(Debug, Clone, Copy)]
pub struct MaxAttempts {
    max_attempts: usize,
}

impl MaxAttempts {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl RetryPolicy for MaxAttempts {
    fn should_retry(&self, attempt: usize, _error: &Error) -> bool {
        attempt < self.max_attempts
    }

    fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

/// 重试包装器
pub struct Retry<Req, Resp> {
    policy: Arc<dyn RetryPolicy>,
    timeout: Duration,
    balancer: Arc<dyn Balancer<Req, Resp>>,
}

impl<Req, Resp> Retry<Req, Resp>
where
    Req: Clone + Send + 'static,
    Resp: Send + 'static,
{
    pub fn new<P>(policy: P, timeout: Duration, balancer: Arc<dyn Balancer<Req, Resp>>) -> Self
    where
        P: RetryPolicy + 'static,
    {
        Self {
            policy: Arc::new(policy),
            timeout,
            balancer,
        }
    }

    /// 在共享截止时间内执行调用
    pub async fn call(&self, ctx: &Context, req: Req) -> Result<Resp> {
        let ctx = ctx.with_timeout(self.timeout);
        let mut raw_errors: Vec<Error> = Vec::new();
        let mut attempt = 0usize;

        loop {
            if let Some(err) = ctx.err() {
                return Err(err);
            }
            attempt += 1;

            let mut selection_failed = false;
            let result = match self.balancer.endpoint() {
                Ok(endpoint) => ctx
                    .run(endpoint.call(ctx.clone(), req.clone()))
                    .await
                    .and_then(|result| result),
                Err(err) => {
                    selection_failed = true;
                    Err(err)
                }
            };
            let err = match result {
                Ok(resp) => return Ok(resp),
                Err(err) => err,
            };

            if let Some(ctx_err) = ctx.err() {
                debug!(attempt, error = %err, "context done, abandoning retry");
                return Err(ctx_err);
            }
            if err.is_cancellation() {
                return Err(err);
            }

            let decision = self.policy.on_failure(attempt, &err);
            raw_errors.push(err);
            if !decision.keep_trying {
                let final_error = match decision.replacement {
                    Some(replacement) => replacement,
                    None => raw_errors.last().cloned().unwrap_or(Error::NoEndpoints),
                };
                warn!(attempts = attempt, error = %final_error, "retry exhausted");
                return Err(RetryError {
                    raw_errors,
                    final_error: Box::new(final_error),
                }
                .into());
            }

            let mut delay = self.policy.backoff_duration(attempt);
            if delay.is_zero() && selection_failed {
                delay = SELECTION_RETRY_PAUSE;
            }
            debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying call");
            if delay.is_zero() {
                ctx.run(tokio::task::yield_now()).await?;
            } else {
                ctx.run(tokio::time::sleep(delay)).await?;
            }
        }
    }

    /// 转换为端点
    pub fn into_endpoint(self) -> Endpoint<Req, Resp> {
        let retry = Arc::new(self);
        Endpoint::new(move |ctx: Context, req: Req| {
            let retry = retry.clone();
            async move { retry.call(&ctx, req).await }
        })
    }
}

/// 最多尝试 `max_attempts` 次、总耗时不超过 `timeout` 的重试端点
pub fn retry<Req, Resp>(
    max_attempts: usize,
    timeout: Duration,
    balancer: Arc<dyn Balancer<Req, Resp>>,
) -> Endpoint<Req, Resp>
where
    Req: Clone + Send + 'static,
    Resp: Send + 'static,
{
    Retry::new(MaxAttempts::new(max_attempts), timeout, balancer).into_endpoint()
}

/// 由回调决定是否继续的重试端点，只受 `timeout` 约束
///
/// 回调参数为已完成的尝试次数和本次错误，返回是否继续以及可选的替换错误。
pub fn retry_with_callback<Req, Resp, F>(
    timeout: Duration,
    balancer: Arc<dyn Balancer<Req, Resp>>,
    callback: F,
) -> Endpoint<Req, Resp>
where
    Req: Clone + Send + 'static,
    Resp: Send + 'static,
    F: Fn(usize, &Error) -> (bool, Option<Error>) + Send + Sync + 'static,
{
    Retry::new(Callback::new(callback), timeout, balancer).into_endpoint()
}

/// 退避方式
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// 立即重试
    #[default]
    None,
    /// 固定延迟
    Fixed,
    /// 指数退避
    Exponential,
}

/// 重试配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// 最大尝试次数（含首次）
    pub max_attempts: usize,
    /// 所有尝试共享的总超时（毫秒）
    pub timeout_ms: u64,
    /// 退避方式
    pub backoff: BackoffKind,
    /// 基础延迟（毫秒）
    pub base_delay_ms: u64,
    /// 最大延迟（毫秒），仅用于指数退避
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout_ms: 3000,
            backoff: BackoffKind::None,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 按配置构建重试包装器
    pub fn build<Req, Resp>(&self, balancer: Arc<dyn Balancer<Req, Resp>>) -> Retry<Req, Resp>
    where
        Req: Clone + Send + 'static,
        Resp: Send + 'static,
    {
        let base = Duration::from_millis(self.base_delay_ms);
        match self.backoff {
            BackoffKind::None => Retry::new(MaxAttempts::new(self.max_attempts), self.timeout(), balancer),
            BackoffKind::Fixed => Retry::new(
                FixedRetryPolicy::new(self.max_attempts, base),
                self.timeout(),
                balancer,
            ),
            BackoffKind::Exponential => Retry::new(
                ExponentialBackoffPolicy::new(
                    self.max_attempts,
                    base,
                    Duration::from_millis(self.max_delay_ms),
                ),
                self.timeout(),
                balancer,
            ),
        }
    }
}
