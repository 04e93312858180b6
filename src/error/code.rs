//! 错误代码和错误类别定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
///
/// 错误代码按类别分组，每个类别占用1000个代码范围：
/// - 1000-1999: 负载均衡相关错误
/// - 2000-2999: 上下文（取消/超时）相关错误
/// - 3000-3999: 重试相关错误
/// - 4000-4999: 服务发现相关错误
/// - 5000-5999: 配置相关错误
/// - 6000-6999: 调用相关错误
/// - 9000-9999: 通用错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 负载均衡相关错误 (1000-1999)
    // ============================================================
    NoEndpoints = 1000,

    // ============================================================
    // 上下文相关错误 (2000-2999)
    // ============================================================
    Canceled = 2000,
    DeadlineExceeded = 2001,

    // ============================================================
    // 重试相关错误 (3000-3999)
    // ============================================================
    RetryExhausted = 3000,

    // ============================================================
    // 服务发现相关错误 (4000-4999)
    // ============================================================
    DiscoveryFailed = 4000,
    FactoryFailed = 4001,
    ReleaseFailed = 4002,

    // ============================================================
    // 配置相关错误 (5000-5999)
    // ============================================================
    InvalidConfig = 5000,

    // ============================================================
    // 调用相关错误 (6000-6999)
    // ============================================================
    TransportError = 6000,
    BusinessError = 6001,

    // ============================================================
    // 通用错误 (9000-9999)
    // ============================================================
    UnknownError = 9999,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ErrorCode {
    /// 获取错误代码的数字值
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 从数字值创建错误代码
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            1000 => Some(ErrorCode::NoEndpoints),
            2000 => Some(ErrorCode::Canceled),
            2001 => Some(ErrorCode::DeadlineExceeded),
            3000 => Some(ErrorCode::RetryExhausted),
            4000 => Some(ErrorCode::DiscoveryFailed),
            4001 => Some(ErrorCode::FactoryFailed),
            4002 => Some(ErrorCode::ReleaseFailed),
            5000 => Some(ErrorCode::InvalidConfig),
            6000 => Some(ErrorCode::TransportError),
            6001 => Some(ErrorCode::BusinessError),
            9999 => Some(ErrorCode::UnknownError),
            _ => None,
        }
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NoEndpoints => "NO_ENDPOINTS",
            ErrorCode::Canceled => "CANCELED",
            ErrorCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorCode::RetryExhausted => "RETRY_EXHAUSTED",
            ErrorCode::DiscoveryFailed => "DISCOVERY_FAILED",
            ErrorCode::FactoryFailed => "FACTORY_FAILED",
            ErrorCode::ReleaseFailed => "RELEASE_FAILED",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::TransportError => "TRANSPORT_ERROR",
            ErrorCode::BusinessError => "BUSINESS_ERROR",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// 获取错误代码的类别（用于错误分类）
    pub fn category(&self) -> ErrorCategory {
        match self.as_u32() {
            1000..=1999 => ErrorCategory::Balancer,
            2000..=2999 => ErrorCategory::Cancellation,
            3000..=3999 => ErrorCategory::Retry,
            4000..=4999 => ErrorCategory::Discovery,
            5000..=5999 => ErrorCategory::Config,
            6000..=6999 => ErrorCategory::Call,
            _ => ErrorCategory::General,
        }
    }

    /// 判断是否为可重试的错误
    ///
    /// 取消类错误永远不可重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NoEndpoints
                | ErrorCode::DiscoveryFailed
                | ErrorCode::TransportError
                | ErrorCode::UnknownError
        )
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Balancer,
    Cancellation,
    Retry,
    Discovery,
    Config,
    Call,
    General,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Balancer => write!(f, "BALANCER"),
            ErrorCategory::Cancellation => write!(f, "CANCELLATION"),
            ErrorCategory::Retry => write!(f, "RETRY"),
            ErrorCategory::Discovery => write!(f, "DISCOVERY"),
            ErrorCategory::Config => write!(f, "CONFIG"),
            ErrorCategory::Call => write!(f, "CALL"),
            ErrorCategory::General => write!(f, "GENERAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip_and_category() {
        for code in [
            ErrorCode::NoEndpoints,
            ErrorCode::Canceled,
            ErrorCode::RetryExhausted,
            ErrorCode::ReleaseFailed,
            ErrorCode::BusinessError,
        ] {
            assert_eq!(ErrorCode::from_u32(code.as_u32()), Some(code));
        }
        assert_eq!(ErrorCode::DeadlineExceeded.category(), ErrorCategory::Cancellation);
        assert_eq!(ErrorCode::FactoryFailed.category(), ErrorCategory::Discovery);
        assert_eq!(ErrorCode::UnknownError.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::from_u32(42), None);
    }

    #[test]
    fn test_cancellation_never_retryable() {
        assert!(!ErrorCode::Canceled.is_retryable());
        assert!(!ErrorCode::DeadlineExceeded.is_retryable());
        assert!(ErrorCode::TransportError.is_retryable());
        assert!(ErrorCode::NoEndpoints.is_retryable());
    }
}
