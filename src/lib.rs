//! Flare Endpoint Library
//!
//! 端点抽象与客户端端点管理：中间件链、服务发现驱动的端点缓存、
//! 负载均衡以及受次数和截止时间约束的重试。

pub mod balancer;
pub mod config;
pub mod context;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod retry;

// Re-exports
pub use balancer::{Balancer, BalancerConfig, LoadBalanceStrategy, Random, RoundRobin};
pub use config::Config;
pub use context::{CancelHandle, Context};
pub use discovery::{
    BackendType, Closer, DefaultEndpointer, DiscoveryBackend, DiscoveryConfig, DiscoveryFactory,
    Endpointer, EndpointerOptions, ErrorReporter, Event, Factory, FixedEndpointer, FixedInstancer,
    Instance, InstanceCache, Instancer, PollingInstancer, ServiceClient,
};
pub use endpoint::{business_error, chain, Chain, Endpoint, Fallible, Failer, MaybeFailer, Middleware};
pub use error::{BoxError, Error, ErrorCategory, ErrorCode, Result, RetryError};
pub use logging::{init_logging, LogConfig};
pub use retry::{retry, retry_with_callback, Retry, RetryConfig, RetryPolicy};
