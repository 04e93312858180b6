//! 服务发现工厂
//!
//! 按配置把 Instancer → Endpointer → Balancer → Retry 串成一个可直接调用的端点。

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::context::Context;
use crate::discovery::backend::{DiscoveryBackend, DnsBackend, StaticBackend};
use crate::discovery::config::{BackendType, DiscoveryConfig};
use crate::discovery::endpointer::{DefaultEndpointer, Endpointer, Factory};
use crate::discovery::instancer::{FixedInstancer, Instancer, PollingInstancer};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};

/// 服务发现工厂
pub struct DiscoveryFactory;

impl DiscoveryFactory {
    /// 从配置创建服务发现后端
    pub fn create_backend(config: &DiscoveryConfig) -> Result<Arc<dyn DiscoveryBackend>> {
        match config.backend {
            BackendType::Static => {
                if config.addresses.is_empty() {
                    return Err(Error::InvalidConfig(
                        "static 后端需要至少一个地址".to_string(),
                    ));
                }
                Ok(Arc::new(StaticBackend::new(config.addresses.iter().cloned())))
            }
            BackendType::Dns => {
                let backend = match config.default_port {
                    Some(port) => DnsBackend::new().with_default_port(port),
                    None => DnsBackend::new(),
                };
                Ok(Arc::new(backend))
            }
        }
    }

    /// 从配置创建成员来源
    ///
    /// 静态后端直接使用固定列表，DNS 后端按刷新间隔轮询。
    pub async fn create_instancer(config: &DiscoveryConfig) -> Result<Arc<dyn Instancer>> {
        match config.backend {
            BackendType::Static => {
                if config.addresses.is_empty() {
                    return Err(Error::InvalidConfig(
                        "static 后端需要至少一个地址".to_string(),
                    ));
                }
                Ok(Arc::new(FixedInstancer::new(config.addresses.iter().cloned())))
            }
            BackendType::Dns => {
                let backend = Self::create_backend(config)?;
                let instancer = PollingInstancer::start(
                    backend,
                    config.service.clone(),
                    config.refresh_interval(),
                )
                .await;
                Ok(Arc::new(instancer))
            }
        }
    }

    /// 按配置构建完整的客户端端点
    ///
    /// 返回前等待 Endpointer 处理完第一个成员事件。
    pub async fn build_endpoint<Req, Resp, F>(config: &Config, factory: F) -> Result<ServiceClient<Req, Resp>>
    where
        Req: Clone + Send + 'static,
        Resp: Send + 'static,
        F: Factory<Req, Resp> + 'static,
    {
        config.validate()?;

        let instancer = Self::create_instancer(&config.discovery).await?;
        let endpointer = Arc::new(DefaultEndpointer::new(
            instancer.clone(),
            factory,
            config.endpointer.options(),
        ));
        endpointer.ready().await?;

        let balancer = config.balancer.build(endpointer.clone() as Arc<dyn Endpointer<Req, Resp>>);
        let endpoint = config.retry.build(balancer).into_endpoint();

        info!(
            service = %config.discovery.service,
            backend = ?config.discovery.backend,
            strategy = ?config.balancer.strategy,
            instances = endpointer.instances().len(),
            "service client ready"
        );

        Ok(ServiceClient {
            endpoint,
            endpointer,
            instancer,
        })
    }
}

/// 服务客户端
///
/// 持有组合好的端点以及用于关闭的 Endpointer 和 Instancer。
pub struct ServiceClient<Req, Resp> {
    endpoint: Endpoint<Req, Resp>,
    endpointer: Arc<DefaultEndpointer<Req, Resp>>,
    instancer: Arc<dyn Instancer>,
}

impl<Req, Resp> ServiceClient<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    /// 组合好的端点（带负载均衡和重试）
    pub fn endpoint(&self) -> Endpoint<Req, Resp> {
        self.endpoint.clone()
    }

    pub fn endpointer(&self) -> &Arc<DefaultEndpointer<Req, Resp>> {
        &self.endpointer
    }

    pub fn instancer(&self) -> &Arc<dyn Instancer> {
        &self.instancer
    }

    /// 调用服务
    pub async fn call(&self, ctx: Context, req: Req) -> Result<Resp> {
        self.endpoint.call(ctx, req).await
    }

    /// 关闭 Endpointer 并停止 Instancer
    pub async fn shutdown(self) {
        self.endpointer.close().await;
        self.instancer.stop();
        info!("service client shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::endpointer::Built;
    use crate::error::BoxError;

    #[tokio::test]
    async fn test_static_instancer_from_config() {
        let config = DiscoveryConfig::fixed("users", ["a:80", "b:80"]);
        let instancer = DiscoveryFactory::create_instancer(&config).await.unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        instancer.register(tx);
        assert_eq!(rx.recv().await.unwrap().instances, vec!["a:80", "b:80"]);
    }

    #[tokio::test]
    async fn test_static_backend_requires_addresses() {
        let config = DiscoveryConfig::fixed("users", Vec::<String>::new());
        assert!(matches!(
            DiscoveryFactory::create_instancer(&config).await,
            Err(Error::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_build_endpoint_round_robins_instances() {
        let config = Config::from_toml_str(
            r#"
            [discovery]
            service = "echo"
            addresses = ["a:80", "b:80"]
            "#,
        )
        .unwrap();

        let factory = |instance: String| async move {
            let endpoint = Endpoint::new(move |_ctx, req: String| {
                let instance = instance.clone();
                async move { Ok(format!("{instance}:{req}")) }
            });
            Ok::<Built<String, String>, BoxError>((endpoint, None))
        };
        let client = DiscoveryFactory::build_endpoint(&config, factory).await.unwrap();

        let first = client.call(Context::background(), "x".into()).await.unwrap();
        let second = client.call(Context::background(), "x".into()).await.unwrap();
        assert_eq!(first, "a:80:x");
        assert_eq!(second, "b:80:x");

        client.shutdown().await;
    }
}
