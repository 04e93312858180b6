//! 非致命错误上报
//!
//! 工厂错误、释放错误和服务发现错误在源头被吸收，通过
//! [`ErrorReporter`] 上报，永远不会让正在进行的调用失败。

use tracing::warn;

use crate::error::Error;

/// 非致命错误上报器
pub trait ErrorReporter: Send + Sync {
    fn report(&self, err: &Error);
}

impl<F> ErrorReporter for F
where
    F: Fn(&Error) + Send + Sync,
{
    fn report(&self, err: &Error) {
        self(err)
    }
}

/// 通过 tracing 记录错误（默认）
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, err: &Error) {
        match err {
            Error::Factory { instance, source } => {
                warn!(instance = %instance, error = %source, "endpoint factory failed, instance dropped");
            }
            Error::Release { instance, source } => {
                warn!(instance = %instance, error = %source, "failed to release endpoint");
            }
            other => {
                warn!(code = %other.code(), error = %other, "endpointer reported error");
            }
        }
    }
}

/// 丢弃所有错误
#[derive(Debug, Clone, Copy, Default)]
pub struct NopReporter;

impl ErrorReporter for NopReporter {
    fn report(&self, _err: &Error) {}
}
