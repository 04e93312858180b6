//! 错误类型转换实现
//!
//! 提供外部错误类型到 [`Error`] 的转换

use super::{BoxError, Error};
use std::io;
use std::sync::Arc;

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Transport(Arc::new(err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::InvalidConfig(format!("TOML 解析错误: {}", err))
    }
}

/// 装箱错误如果本身就是 [`Error`]，则原样还原，否则视为传输层错误
impl From<BoxError> for Error {
    fn from(err: BoxError) -> Self {
        match err.downcast::<Error>() {
            Ok(err) => *err,
            Err(other) => Error::Transport(Arc::from(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_error_is_unwrapped() {
        let boxed: BoxError = Box::new(Error::NoEndpoints);
        assert!(matches!(Error::from(boxed), Error::NoEndpoints));

        let boxed: BoxError = "connection reset".into();
        let err = Error::from(boxed);
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(err.to_string(), "connection reset");
    }

    #[test]
    fn test_io_error_is_transport() {
        let err: Error = io::Error::new(io::ErrorKind::ConnectionRefused, "refused").into();
        assert!(err.is_retryable());
    }
}
