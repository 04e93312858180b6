//! 成员来源（Instancer）
//!
//! 把服务发现后端抽象为统一的异步通知流：订阅方注册一个接收端，
//! 成员变化时收到完整快照，注册时立即收到一次当前快照。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::discovery::backend::DiscoveryBackend;
use crate::discovery::cache::InstanceCache;
use crate::discovery::instance::{Event, Instance};
use crate::error::Error;

/// 事件接收端
pub type EventSink = mpsc::UnboundedSender<Event>;

/// 订阅句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// 成员来源 trait
pub trait Instancer: Send + Sync {
    /// 注册接收端，立即推送一次当前快照
    fn register(&self, sink: EventSink) -> SubscriptionId;

    /// 注销接收端
    fn deregister(&self, id: SubscriptionId);

    /// 停止：释放后端监听资源，之后不再推送任何事件
    fn stop(&self);
}

/// 固定成员来源
///
/// 实例列表在创建时给定，不会变化。
pub struct FixedInstancer {
    cache: InstanceCache,
}

impl FixedInstancer {
    pub fn new<I, S>(instances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Instance>,
    {
        let cache = InstanceCache::new();
        cache.update(Event::new(instances));
        Self { cache }
    }
}

impl Instancer for FixedInstancer {
    fn register(&self, sink: EventSink) -> SubscriptionId {
        self.cache.register(sink)
    }

    fn deregister(&self, id: SubscriptionId) {
        self.cache.deregister(id);
    }

    fn stop(&self) {
        self.cache.stop();
    }
}

/// 轮询成员来源
///
/// 后台任务按固定间隔调用 [`DiscoveryBackend::discover`]，
/// 成功时发布实例快照，失败时发布携带 [`Error::Discovery`] 的事件。
pub struct PollingInstancer {
    cache: Arc<InstanceCache>,
    token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollingInstancer {
    /// 立即执行一次服务发现，然后启动后台轮询任务
    pub async fn start(
        backend: Arc<dyn DiscoveryBackend>,
        service: impl Into<String>,
        interval: Duration,
    ) -> Self {
        let service = service.into();
        let cache = Arc::new(InstanceCache::new());
        cache.update(poll(backend.as_ref(), &service).await);

        let token = CancellationToken::new();
        let task = tokio::spawn(refresh_loop(
            backend,
            service.clone(),
            interval,
            cache.clone(),
            token.clone(),
        ));
        info!(service = %service, interval_ms = interval.as_millis() as u64, "polling instancer started");

        Self {
            cache,
            token,
            task: Mutex::new(Some(task)),
        }
    }

    /// 当前状态
    pub fn state(&self) -> Event {
        self.cache.state()
    }
}

async fn poll(backend: &dyn DiscoveryBackend, service: &str) -> Event {
    match backend.discover(service).await {
        Ok(instances) => Event::new(instances),
        Err(err) => {
            warn!(service = %service, error = %err, "Failed to refresh service instances");
            Event::error(Error::discovery(err))
        }
    }
}

async fn refresh_loop(
    backend: Arc<dyn DiscoveryBackend>,
    service: String,
    interval: Duration,
    cache: Arc<InstanceCache>,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // 跳过第一次 tick，创建时已经执行过一次
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let event = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            event = poll(backend.as_ref(), &service) => event,
        };
        cache.update(event);
    }
    debug!(service = %service, "polling instancer stopped");
}

impl Instancer for PollingInstancer {
    fn register(&self, sink: EventSink) -> SubscriptionId {
        self.cache.register(sink)
    }

    fn deregister(&self, id: SubscriptionId) {
        self.cache.deregister(id);
    }

    fn stop(&self) {
        self.token.cancel();
        self.cache.stop();
        let task = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

impl Drop for PollingInstancer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::backend::StaticBackend;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::BoxError;

    /// 依次返回预设结果的后端
    struct ScriptedBackend {
        calls: AtomicUsize,
        script: Vec<Result<Vec<Instance>, &'static str>>,
    }

    #[async_trait]
    impl DiscoveryBackend for ScriptedBackend {
        async fn discover(&self, _service: &str) -> Result<Vec<Instance>, BoxError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.script.get(n).or(self.script.last()).cloned();
            match step {
                Some(Ok(instances)) => Ok(instances),
                Some(Err(msg)) => Err(msg.into()),
                None => Ok(Vec::new()),
            }
        }
    }

    #[test]
    fn test_fixed_instancer_replays_on_register() {
        let instancer = FixedInstancer::new(["a:80", "b:80"]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        instancer.register(tx);
        assert_eq!(rx.try_recv().unwrap().instances, vec!["a:80", "b:80"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_publishes_changes_and_errors() {
        let backend = Arc::new(ScriptedBackend {
            calls: AtomicUsize::new(0),
            script: vec![
                Ok(vec!["a:80".into()]),
                Ok(vec!["a:80".into(), "b:80".into()]),
                Err("registry unreachable"),
            ],
        });
        let instancer = PollingInstancer::start(backend, "svc", Duration::from_secs(1)).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        instancer.register(tx);
        assert_eq!(rx.recv().await.unwrap().instances, vec!["a:80"]);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.instances, vec!["a:80", "b:80"]);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event.err, Some(Error::Discovery(_))));

        instancer.stop();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_initial_snapshot_available_immediately() {
        let backend = Arc::new(StaticBackend::new(["10.0.0.1:9000"]));
        let instancer = PollingInstancer::start(backend, "svc", Duration::from_secs(30)).await;
        assert_eq!(instancer.state().instances, vec!["10.0.0.1:9000"]);
        instancer.stop();
    }
}
