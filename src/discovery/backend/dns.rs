//! DNS 服务发现后端

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::discovery::backend::DiscoveryBackend;
use crate::discovery::instance::Instance;
use crate::error::BoxError;

/// DNS 服务发现后端
///
/// 将 `host:port` 形式的服务名解析为全部地址，每个解析出的
/// socket 地址对应一个实例。
#[derive(Debug, Clone, Default)]
pub struct DnsBackend {
    default_port: Option<u16>,
}

impl DnsBackend {
    /// 创建新的 DNS 后端
    pub fn new() -> Self {
        Self::default()
    }

    /// 服务名不带端口时使用的默认端口
    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = Some(port);
        self
    }

    fn target(&self, service: &str) -> String {
        match self.default_port {
            Some(port) if !service.contains(':') => format!("{}:{}", service, port),
            _ => service.to_string(),
        }
    }
}

#[async_trait]
impl DiscoveryBackend for DnsBackend {
    async fn discover(&self, service: &str) -> Result<Vec<Instance>, BoxError> {
        let target = self.target(service);
        let addresses = tokio::net::lookup_host(target.as_str())
            .await
            .map_err(|e| format!("Failed to resolve {}: {}", target, e))?;

        let instances: BTreeSet<Instance> = addresses.map(|addr| addr.to_string()).collect();
        Ok(instances.into_iter().collect())
    }
}
