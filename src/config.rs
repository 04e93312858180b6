//! 配置

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::balancer::BalancerConfig;
use crate::discovery::{BackendType, DiscoveryConfig, EndpointerConfig};
use crate::error::{Error, Result};
use crate::logging::LogConfig;
use crate::retry::RetryConfig;

/// 客户端配置
///
/// ```toml
/// [discovery]
/// service = "users"
/// backend = "static"
/// addresses = ["10.0.0.1:9000", "10.0.0.2:9000"]
///
/// [balancer]
/// strategy = "round_robin"
///
/// [retry]
/// max_attempts = 3
/// timeout_ms = 3000
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub balancer: BalancerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub endpointer: EndpointerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::InvalidConfig(format!("读取配置文件失败 {}: {}", path.display(), err))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.discovery.service.trim().is_empty() {
            return Err(Error::InvalidConfig("discovery.service 不能为空".to_string()));
        }
        if self.discovery.backend == BackendType::Static && self.discovery.addresses.is_empty() {
            return Err(Error::InvalidConfig(
                "static 后端需要至少一个 discovery.addresses".to_string(),
            ));
        }
        if self.discovery.backend == BackendType::Dns && self.discovery.refresh_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "discovery.refresh_interval_secs 必须大于 0".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::InvalidConfig("retry.max_attempts 必须大于 0".to_string()));
        }
        if self.retry.timeout_ms == 0 {
            return Err(Error::InvalidConfig("retry.timeout_ms 必须大于 0".to_string()));
        }
        Ok(())
    }
}
