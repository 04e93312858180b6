//! 统一错误类型
//!
//! 服务发现、工厂和释放错误在源头被吸收（只上报不传播），
//! 负载均衡与重试错误直接作为端点调用的返回错误传播给调用方。

use super::code::ErrorCode;
use std::sync::Arc;
use thiserror::Error;

/// 装箱的外部错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 可共享（可克隆）的外部错误
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// 端点调用与服务发现的统一错误类型
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// 上下文被取消
    #[error("context canceled")]
    Canceled,

    /// 上下文截止时间已过
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// 负载均衡器没有可用的端点
    #[error("no endpoints available")]
    NoEndpoints,

    /// 服务发现后端不可用（非致命，通过事件上报）
    #[error("discovery failed: {0}")]
    Discovery(#[source] SharedError),

    /// 单个实例的端点构建失败（非致命，丢弃该实例）
    #[error("failed to build endpoint for {instance}: {source}")]
    Factory {
        instance: String,
        #[source]
        source: SharedError,
    },

    /// 释放已移除实例的资源失败（非致命，仅记录日志）
    #[error("failed to release endpoint for {instance}: {source}")]
    Release {
        instance: String,
        #[source]
        source: SharedError,
    },

    /// 业务错误（传输成功，但业务语义失败）
    #[error("business error: {0}")]
    Business(#[source] SharedError),

    /// 重试耗尽
    #[error(transparent)]
    Retry(#[from] RetryError),

    /// 配置错误
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// 端点调用返回的传输层错误
    #[error("{0}")]
    Transport(#[source] SharedError),
}

impl Error {
    /// 从任意外部错误创建传输层错误
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Error::Transport(Arc::from(err.into()))
    }

    /// 创建服务发现错误
    pub fn discovery(err: impl Into<BoxError>) -> Self {
        Error::Discovery(Arc::from(err.into()))
    }

    /// 创建业务错误
    pub fn business(err: impl Into<BoxError>) -> Self {
        Error::Business(Arc::from(err.into()))
    }

    /// 创建工厂错误
    pub fn factory(instance: impl Into<String>, err: impl Into<BoxError>) -> Self {
        Error::Factory {
            instance: instance.into(),
            source: Arc::from(err.into()),
        }
    }

    /// 创建释放错误
    pub fn release(instance: impl Into<String>, err: impl Into<BoxError>) -> Self {
        Error::Release {
            instance: instance.into(),
            source: Arc::from(err.into()),
        }
    }

    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Canceled => ErrorCode::Canceled,
            Error::DeadlineExceeded => ErrorCode::DeadlineExceeded,
            Error::NoEndpoints => ErrorCode::NoEndpoints,
            Error::Discovery(_) => ErrorCode::DiscoveryFailed,
            Error::Factory { .. } => ErrorCode::FactoryFailed,
            Error::Release { .. } => ErrorCode::ReleaseFailed,
            Error::Business(_) => ErrorCode::BusinessError,
            Error::Retry(_) => ErrorCode::RetryExhausted,
            Error::InvalidConfig(_) => ErrorCode::InvalidConfig,
            Error::Transport(_) => ErrorCode::TransportError,
        }
    }

    /// 是否为取消类错误（取消或截止时间已过）
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Canceled | Error::DeadlineExceeded)
    }

    /// 判断是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

/// 重试耗尽错误
///
/// 保存每次尝试的原始错误，`final_error` 为最后一次尝试的错误
/// （或重试策略给出的替换错误）。
#[derive(Error, Debug, Clone)]
#[error("retry exhausted after {} attempts: {final_error}", .raw_errors.len())]
pub struct RetryError {
    /// 每次尝试的原始错误，按发生顺序排列
    pub raw_errors: Vec<Error>,
    /// 最终上报的错误
    #[source]
    pub final_error: Box<Error>,
}

impl RetryError {
    /// 尝试次数
    pub fn attempts(&self) -> usize {
        self.raw_errors.len()
    }

    /// 最终错误
    pub fn final_error(&self) -> &Error {
        &self.final_error
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_retry_error_wraps_last_error() {
        let err = Error::from(RetryError {
            raw_errors: vec![Error::NoEndpoints, Error::transport("boom")],
            final_error: Box::new(Error::transport("boom")),
        });

        assert_eq!(err.code(), ErrorCode::RetryExhausted);
        assert_eq!(err.to_string(), "retry exhausted after 2 attempts: boom");
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("boom"));
    }

    #[test]
    fn test_cancellation_classification() {
        assert!(Error::Canceled.is_cancellation());
        assert!(Error::DeadlineExceeded.is_cancellation());
        assert!(!Error::NoEndpoints.is_cancellation());
        assert!(!Error::Canceled.is_retryable());
        assert!(Error::transport("io").is_retryable());
    }

    #[test]
    fn test_factory_error_display() {
        let err = Error::factory("10.0.0.1:80", "connection refused");
        assert_eq!(
            err.to_string(),
            "failed to build endpoint for 10.0.0.1:80: connection refused"
        );
        assert_eq!(err.code(), ErrorCode::FactoryFailed);
    }
}
