//! 服务发现配置

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::discovery::endpointer::EndpointerOptions;

/// 服务发现配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// 服务名；DNS 后端下为要解析的 `host[:port]`
    pub service: String,

    /// 后端类型：static, dns
    #[serde(default)]
    pub backend: BackendType,

    /// 静态后端的实例地址列表
    #[serde(default)]
    pub addresses: Vec<String>,

    /// DNS 名称未携带端口时使用的端口
    #[serde(default)]
    pub default_port: Option<u16>,

    /// 刷新间隔（秒）
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_refresh_interval_secs() -> u64 {
    30
}

impl DiscoveryConfig {
    /// 静态实例列表配置
    pub fn fixed<I, S>(service: impl Into<String>, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            service: service.into(),
            backend: BackendType::Static,
            addresses: addresses.into_iter().map(Into::into).collect(),
            default_port: None,
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }

    /// 刷新间隔
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// 后端类型
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// 固定地址列表
    #[default]
    Static,
    /// DNS 解析
    Dns,
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "static" | "fixed" => Ok(BackendType::Static),
            "dns" => Ok(BackendType::Dns),
            _ => Err(format!("Unknown backend type: {}", s)),
        }
    }
}

/// 端点缓存配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointerConfig {
    /// 服务发现持续失败多久后清空端点缓存（毫秒），未设置时保留旧缓存
    pub invalidate_on_error_ms: Option<u64>,
}

impl EndpointerConfig {
    /// 转换为 [`EndpointerOptions`]，使用默认的日志上报器
    pub fn options(&self) -> EndpointerOptions {
        let options = EndpointerOptions::default();
        match self.invalidate_on_error_ms {
            Some(ms) => options.invalidate_on_error(Duration::from_millis(ms)),
            None => options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_from_str() {
        assert_eq!("DNS".parse::<BackendType>().unwrap(), BackendType::Dns);
        assert_eq!("fixed".parse::<BackendType>().unwrap(), BackendType::Static);
        assert!("etcd".parse::<BackendType>().is_err());
    }

    #[test]
    fn test_defaults_from_toml() {
        let config: DiscoveryConfig = toml::from_str(r#"service = "users""#).unwrap();
        assert_eq!(config.backend, BackendType::Static);
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        assert!(config.addresses.is_empty());
    }

    #[test]
    fn test_endpointer_options() {
        let options = EndpointerConfig {
            invalidate_on_error_ms: Some(1500),
        }
        .options();
        assert_eq!(options.invalidate_on_error, Some(Duration::from_millis(1500)));
        assert!(EndpointerConfig::default().options().invalidate_on_error.is_none());
    }
}
