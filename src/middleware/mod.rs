//! 端点中间件模块
//!
//! 提供日志、超时、并发限制等中间件功能

pub mod concurrency;
pub mod logging;
pub mod timeout;

pub use concurrency::{concurrency_limit, ConcurrencyLimitMiddleware};
pub use logging::{logging, LoggingMiddleware};
pub use timeout::{timeout, TimeoutMiddleware};
