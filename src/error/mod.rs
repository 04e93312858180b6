//! 错误处理模块
//!
//! 提供统一的错误类型、错误代码分类和错误转换，
//! 区分取消类错误（永不重试）与普通调用失败

pub mod code;
pub mod conversions;
pub mod flare_error;

pub use code::{ErrorCategory, ErrorCode};
pub use flare_error::{BoxError, Error, Result, RetryError, SharedError};
