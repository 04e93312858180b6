//! 服务发现后端抽象和实现

pub mod dns;
pub mod fixed;

pub use dns::DnsBackend;
pub use fixed::StaticBackend;

use async_trait::async_trait;

use crate::discovery::instance::Instance;
use crate::error::BoxError;

/// 服务发现后端 trait
///
/// 由 [`PollingInstancer`](crate::discovery::PollingInstancer) 周期性调用。
/// 注意：由于需要动态分发（dyn），使用 async-trait
#[async_trait]
pub trait DiscoveryBackend: Send + Sync {
    /// 发现服务实例
    ///
    /// # 参数
    /// * `service` - 服务名（具体含义由后端决定）
    ///
    /// # 返回
    /// 返回当前完整的实例列表
    async fn discover(&self, service: &str) -> Result<Vec<Instance>, BoxError>;
}
