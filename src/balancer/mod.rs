//! 负载均衡模块
//!
//! 每次调用从 [`Endpointer`] 的当前快照中选择一个端点。
//! 均衡器本身不缓存快照，快照的增减在下一次选择时立即生效。

pub mod random;
pub mod round_robin;

pub use random::Random;
pub use round_robin::RoundRobin;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::discovery::Endpointer;
use crate::endpoint::Endpoint;
use crate::error::Result;

/// 负载均衡器
pub trait Balancer<Req, Resp>: Send + Sync {
    /// 选择一个端点；快照为空时返回 [`Error::NoEndpoints`](crate::Error::NoEndpoints)
    fn endpoint(&self) -> Result<Endpoint<Req, Resp>>;
}

impl<Req, Resp, B> Balancer<Req, Resp> for Arc<B>
where
    B: Balancer<Req, Resp> + ?Sized,
{
    fn endpoint(&self) -> Result<Endpoint<Req, Resp>> {
        (**self).endpoint()
    }
}

/// 负载均衡策略
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalanceStrategy {
    /// 轮询
    #[default]
    RoundRobin,
    /// 随机
    Random,
}

impl std::str::FromStr for LoadBalanceStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "round_robin" | "roundrobin" => Ok(LoadBalanceStrategy::RoundRobin),
            "random" => Ok(LoadBalanceStrategy::Random),
            _ => Err(format!("Unknown load balance strategy: {}", s)),
        }
    }
}

/// 负载均衡配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// 均衡策略
    pub strategy: LoadBalanceStrategy,
    /// 随机策略的种子，未设置时使用系统熵
    pub seed: Option<u64>,
}

impl BalancerConfig {
    /// 按配置构建均衡器
    pub fn build<Req, Resp>(
        &self,
        endpointer: Arc<dyn Endpointer<Req, Resp>>,
    ) -> Arc<dyn Balancer<Req, Resp>>
    where
        Req: 'static,
        Resp: 'static,
    {
        match (self.strategy, self.seed) {
            (LoadBalanceStrategy::RoundRobin, _) => Arc::new(RoundRobin::new(endpointer)),
            (LoadBalanceStrategy::Random, Some(seed)) => Arc::new(Random::new(endpointer, seed)),
            (LoadBalanceStrategy::Random, None) => Arc::new(Random::from_entropy(endpointer)),
        }
    }
}
