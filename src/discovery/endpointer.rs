//! 端点缓存（Endpointer）
//!
//! 订阅 [`Instancer`]，把成员快照增量地调和为一组存活的端点：
//! 新增实例调用工厂构建端点，移除实例释放其资源，两次事件中都存在的
//! 实例保持不动。每次调和结束后原子地发布一个不可变快照，读取方
//! 永远不会看到半更新的状态，也不会与写入方竞争锁。

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::discovery::instance::{Event, Instance};
use crate::discovery::instancer::{Instancer, SubscriptionId};
use crate::discovery::reporter::{ErrorReporter, TracingReporter};
use crate::endpoint::Endpoint;
use crate::error::{BoxError, Error, Result};

/// 端点快照
pub type Endpoints<Req, Resp> = Arc<Vec<Endpoint<Req, Resp>>>;

/// 端点集合的提供者
pub trait Endpointer<Req, Resp>: Send + Sync {
    /// 返回当前的不可变快照；之后的缓存变化不会影响已经返回的快照
    fn endpoints(&self) -> Result<Endpoints<Req, Resp>>;
}

/// 固定端点集合：没有成员来源，也没有调和
pub struct FixedEndpointer<Req, Resp> {
    endpoints: Endpoints<Req, Resp>,
}

impl<Req, Resp> FixedEndpointer<Req, Resp> {
    pub fn new(endpoints: Vec<Endpoint<Req, Resp>>) -> Self {
        Self {
            endpoints: Arc::new(endpoints),
        }
    }
}

impl<Req, Resp> From<Vec<Endpoint<Req, Resp>>> for FixedEndpointer<Req, Resp> {
    fn from(endpoints: Vec<Endpoint<Req, Resp>>) -> Self {
        Self::new(endpoints)
    }
}

impl<Req, Resp> Endpointer<Req, Resp> for FixedEndpointer<Req, Resp> {
    fn endpoints(&self) -> Result<Endpoints<Req, Resp>> {
        Ok(self.endpoints.clone())
    }
}

/// 资源释放句柄
///
/// 实例被移除时调用一次，之后不再使用。
pub trait Closer: Send {
    fn close(self: Box<Self>) -> std::result::Result<(), BoxError>;
}

impl<F> Closer for F
where
    F: FnOnce() -> std::result::Result<(), BoxError> + Send,
{
    fn close(self: Box<Self>) -> std::result::Result<(), BoxError> {
        (*self)()
    }
}

/// 工厂构建结果：端点和可选的释放句柄
pub type Built<Req, Resp> = (Endpoint<Req, Resp>, Option<Box<dyn Closer>>);

/// 端点工厂
///
/// 由传输集成层提供，可能较慢（例如需要建立连接）。
#[async_trait]
pub trait Factory<Req, Resp>: Send + Sync {
    async fn build(&self, instance: &str) -> std::result::Result<Built<Req, Resp>, BoxError>;
}

#[async_trait]
impl<F, Fut, Req, Resp> Factory<Req, Resp> for F
where
    F: Fn(Instance) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<Built<Req, Resp>, BoxError>> + Send + 'static,
    Req: 'static,
    Resp: 'static,
{
    async fn build(&self, instance: &str) -> std::result::Result<Built<Req, Resp>, BoxError> {
        self(instance.to_string()).await
    }
}

/// Endpointer 选项
#[derive(Clone)]
pub struct EndpointerOptions {
    /// 收到错误事件后，经过该时长仍未恢复则清空缓存；`None` 表示永远保留旧缓存
    pub invalidate_on_error: Option<Duration>,
    /// 非致命错误上报器
    pub reporter: Arc<dyn ErrorReporter>,
}

impl EndpointerOptions {
    #[must_use]
    pub fn invalidate_on_error(mut self, timeout: Duration) -> Self {
        self.invalidate_on_error = Some(timeout);
        self
    }

    #[must_use]
    pub fn reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }
}

impl Default for EndpointerOptions {
    fn default() -> Self {
        Self {
            invalidate_on_error: None,
            reporter: Arc::new(TracingReporter),
        }
    }
}

impl fmt::Debug for EndpointerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointerOptions")
            .field("invalidate_on_error", &self.invalidate_on_error)
            .finish_non_exhaustive()
    }
}

struct Entry<Req, Resp> {
    endpoint: Endpoint<Req, Resp>,
    closer: Option<Box<dyn Closer>>,
}

struct Snapshot<Req, Resp> {
    endpoints: Endpoints<Req, Resp>,
    instances: Vec<Instance>,
    invalidated: Option<Error>,
}

impl<Req, Resp> Snapshot<Req, Resp> {
    fn empty() -> Self {
        Self {
            endpoints: Arc::new(Vec::new()),
            instances: Vec::new(),
            invalidated: None,
        }
    }
}

/// 调和状态：`entries` 只由后台任务写入，读取方只访问 `snapshot`
struct EndpointCache<Req, Resp> {
    factory: Arc<dyn Factory<Req, Resp>>,
    reporter: Arc<dyn ErrorReporter>,
    entries: Mutex<BTreeMap<Instance, Entry<Req, Resp>>>,
    snapshot: ArcSwap<Snapshot<Req, Resp>>,
}

impl<Req, Resp> EndpointCache<Req, Resp> {
    async fn update(&self, instances: &[Instance]) {
        let mut entries = self.entries.lock().await;

        let wanted: BTreeSet<&str> = instances.iter().map(String::as_str).collect();
        let to_add: Vec<&str> = wanted
            .iter()
            .copied()
            .filter(|instance| !entries.contains_key(*instance))
            .collect();
        let to_remove: Vec<Instance> = entries
            .keys()
            .filter(|instance| !wanted.contains(instance.as_str()))
            .cloned()
            .collect();

        let built = join_all(to_add.iter().map(|instance| async move {
            (*instance, self.factory.build(instance).await)
        }))
        .await;

        let mut added = 0usize;
        for (instance, result) in built {
            match result {
                Ok((endpoint, closer)) => {
                    entries.insert(instance.to_string(), Entry { endpoint, closer });
                    added += 1;
                }
                Err(err) => self.reporter.report(&Error::factory(instance, err)),
            }
        }

        for instance in &to_remove {
            if let Some(entry) = entries.remove(instance) {
                self.release(instance, entry);
            }
        }

        self.publish(&entries, None);
        debug!(
            added,
            removed = to_remove.len(),
            total = entries.len(),
            "endpoint cache reconciled"
        );
    }

    /// 清空缓存并记录失效原因
    async fn invalidate(&self, err: Error) {
        let mut entries = self.entries.lock().await;
        for (instance, entry) in std::mem::take(&mut *entries) {
            self.release(&instance, entry);
        }
        self.publish(&entries, Some(err));
    }

    async fn release_all(&self) {
        let mut entries = self.entries.lock().await;
        for (instance, entry) in std::mem::take(&mut *entries) {
            self.release(&instance, entry);
        }
        self.publish(&entries, None);
    }

    fn release(&self, instance: &str, entry: Entry<Req, Resp>) {
        if let Some(closer) = entry.closer {
            if let Err(err) = closer.close() {
                self.reporter.report(&Error::release(instance, err));
            }
        }
    }

    fn publish(&self, entries: &BTreeMap<Instance, Entry<Req, Resp>>, invalidated: Option<Error>) {
        let snapshot = Snapshot {
            endpoints: Arc::new(entries.values().map(|entry| entry.endpoint.clone()).collect()),
            instances: entries.keys().cloned().collect(),
            invalidated,
        };
        self.snapshot.store(Arc::new(snapshot));
    }

    fn is_invalidated(&self) -> bool {
        self.snapshot.load().invalidated.is_some()
    }
}

/// 默认的 Endpointer 实现
///
/// 创建时向 [`Instancer`] 注册，并启动后台调和任务，
/// 因此必须在 tokio 运行时内创建。
pub struct DefaultEndpointer<Req, Resp> {
    cache: Arc<EndpointCache<Req, Resp>>,
    instancer: Arc<dyn Instancer>,
    subscription: SubscriptionId,
    token: CancellationToken,
    task: StdMutex<Option<JoinHandle<()>>>,
    progress: watch::Receiver<u64>,
}

impl<Req, Resp> DefaultEndpointer<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    pub fn new<F>(instancer: Arc<dyn Instancer>, factory: F, options: EndpointerOptions) -> Self
    where
        F: Factory<Req, Resp> + 'static,
    {
        let cache = Arc::new(EndpointCache {
            factory: Arc::new(factory),
            reporter: options.reporter.clone(),
            entries: Mutex::new(BTreeMap::new()),
            snapshot: ArcSwap::from_pointee(Snapshot::empty()),
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = instancer.register(tx);
        let token = CancellationToken::new();
        let (progress_tx, progress) = watch::channel(0u64);

        let task = tokio::spawn(reconcile_loop(
            cache.clone(),
            rx,
            options.invalidate_on_error,
            token.clone(),
            progress_tx,
        ));

        Self {
            cache,
            instancer,
            subscription,
            token,
            task: StdMutex::new(Some(task)),
            progress,
        }
    }
}

impl<Req, Resp> DefaultEndpointer<Req, Resp> {
    /// 当前缓存中的实例（有序）
    pub fn instances(&self) -> Vec<Instance> {
        self.cache.snapshot.load().instances.clone()
    }

    /// 已处理的事件数量
    pub fn processed(&self) -> u64 {
        *self.progress.borrow()
    }

    /// 等待已处理的事件数量达到 `count`
    ///
    /// 后台任务在此之前停止（`close` 或丢弃）时返回 [`Error::Canceled`]。
    pub async fn wait_for_events(&self, count: u64) -> Result<()> {
        let mut progress = self.progress.clone();
        match progress.wait_for(|processed| *processed >= count).await {
            Ok(_) => Ok(()),
            Err(_) => {
                debug!(count, processed = self.processed(), "endpointer stopped before reaching event count");
                Err(Error::Canceled)
            }
        }
    }

    /// 等待第一个事件处理完成
    pub async fn ready(&self) -> Result<()> {
        self.wait_for_events(1).await
    }

    /// 注销订阅、停止后台任务并释放所有缓存条目
    pub async fn close(&self) {
        self.instancer.deregister(self.subscription);
        self.token.cancel();
        let task = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl<Req, Resp> Endpointer<Req, Resp> for DefaultEndpointer<Req, Resp> {
    fn endpoints(&self) -> Result<Endpoints<Req, Resp>> {
        let snapshot = self.cache.snapshot.load();
        match &snapshot.invalidated {
            Some(err) => Err(err.clone()),
            None => Ok(snapshot.endpoints.clone()),
        }
    }
}

impl<Req, Resp> Drop for DefaultEndpointer<Req, Resp> {
    fn drop(&mut self) {
        self.instancer.deregister(self.subscription);
        self.token.cancel();
    }
}

async fn reconcile_loop<Req, Resp>(
    cache: Arc<EndpointCache<Req, Resp>>,
    mut events: mpsc::UnboundedReceiver<Event>,
    invalidate_on_error: Option<Duration>,
    token: CancellationToken,
    progress: watch::Sender<u64>,
) {
    // 待生效的失效：(截止时间, 触发失效的错误)
    let mut pending: Option<(Instant, Error)> = None;

    loop {
        let deadline = pending.as_ref().map(|(at, _)| *at);
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some((_, err)) = pending.take() {
                    info!(error = %err, "discovery still failing, invalidating endpoint cache");
                    cache.invalidate(err).await;
                }
            }
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("instancer closed the event stream, keeping last endpoints");
                    token.cancelled().await;
                    break;
                };
                match event.err {
                    None => {
                        pending = None;
                        cache.update(&event.instances).await;
                    }
                    Some(err) => {
                        cache.reporter.report(&err);
                        if let Some(timeout) = invalidate_on_error {
                            if pending.is_none() && !cache.is_invalidated() {
                                // 无法表示的超时视为永不失效
                                if let Some(at) = Instant::now().checked_add(timeout) {
                                    pending = Some((at, err));
                                }
                            }
                        }
                    }
                }
                progress.send_modify(|processed| *processed += 1);
            }
        }
    }

    cache.release_all().await;
    debug!("endpointer stopped");
}
