//! 服务发现与端点缓存模块
//!
//! [`Instancer`] 把服务发现后端抽象为完整快照的成员事件流，
//! [`DefaultEndpointer`] 订阅该事件流并通过 [`Factory`] 把实例调和为
//! 一组存活端点，供负载均衡器读取。

pub mod backend;
pub mod cache;
pub mod config;
pub mod endpointer;
pub mod factory;
pub mod instance;
pub mod instancer;
pub mod reporter;

pub use backend::{DiscoveryBackend, DnsBackend, StaticBackend};
pub use cache::InstanceCache;
pub use config::{BackendType, DiscoveryConfig, EndpointerConfig};
pub use endpointer::{
    Built, Closer, DefaultEndpointer, Endpointer, EndpointerOptions, Endpoints, Factory,
    FixedEndpointer,
};
pub use factory::{DiscoveryFactory, ServiceClient};
pub use instance::{Event, Instance};
pub use instancer::{EventSink, FixedInstancer, Instancer, PollingInstancer, SubscriptionId};
pub use reporter::{ErrorReporter, NopReporter, TracingReporter};
