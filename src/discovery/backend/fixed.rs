//! 静态地址列表后端

use async_trait::async_trait;

use crate::discovery::backend::DiscoveryBackend;
use crate::discovery::instance::Instance;
use crate::error::BoxError;

/// 静态后端：总是返回配置的地址
#[derive(Debug, Clone)]
pub struct StaticBackend {
    instances: Vec<Instance>,
}

impl StaticBackend {
    pub fn new<I, S>(instances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Instance>,
    {
        Self {
            instances: instances.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl DiscoveryBackend for StaticBackend {
    async fn discover(&self, _service: &str) -> Result<Vec<Instance>, BoxError> {
        Ok(self.instances.clone())
    }
}
