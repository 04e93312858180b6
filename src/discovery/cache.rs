//! 实例缓存与订阅注册表
//!
//! 保存最后一次成员事件并向所有订阅方扇出。新订阅方注册时会
//! 立即收到当前快照；与当前状态相同的事件会被丢弃。
//! 可以直接作为手动驱动的 [`Instancer`] 使用。

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, trace};

use crate::discovery::instance::Event;
use crate::discovery::instancer::{EventSink, Instancer, SubscriptionId};

#[derive(Default)]
struct State {
    current: Event,
    sinks: HashMap<SubscriptionId, EventSink>,
    next_id: u64,
    stopped: bool,
}

/// 实例缓存
#[derive(Default)]
pub struct InstanceCache {
    state: Mutex<State>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 发布新事件
    ///
    /// 与当前状态等价的事件会被忽略；停止后的更新也会被忽略。
    pub fn update(&self, event: Event) {
        let event = event.normalize();
        let mut state = self.lock();
        if state.stopped {
            trace!("instance cache stopped, dropping event");
            return;
        }
        if state.current.same_as(&event) {
            trace!("duplicate membership event ignored");
            return;
        }

        debug!(
            instances = event.instances.len(),
            error = event.err.is_some(),
            subscribers = state.sinks.len(),
            "broadcasting membership event"
        );
        state
            .sinks
            .retain(|_, sink| sink.send(event.clone()).is_ok());
        state.current = event;
    }

    /// 当前状态
    pub fn state(&self) -> Event {
        self.lock().current.clone()
    }

    /// 当前订阅方数量
    pub fn subscribers(&self) -> usize {
        self.lock().sinks.len()
    }
}

impl Instancer for InstanceCache {
    fn register(&self, sink: EventSink) -> SubscriptionId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        if state.stopped {
            return id;
        }
        if sink.send(state.current.clone()).is_ok() {
            state.sinks.insert(id, sink);
        }
        id
    }

    fn deregister(&self, id: SubscriptionId) {
        self.lock().sinks.remove(&id);
    }

    fn stop(&self) {
        let mut state = self.lock();
        state.stopped = true;
        state.sinks.clear();
    }
}
