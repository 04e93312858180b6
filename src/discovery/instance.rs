//! 服务实例与成员变更事件

use crate::error::Error;

/// 服务实例：一个可达副本的地址/标识，仅以字符串相等区分
pub type Instance = String;

/// 成员变更事件
///
/// 总是当前成员的完整快照，而不是增量。携带错误的事件表示
/// 后端暂时不可用，此时 `instances` 没有意义，订阅方应保留
/// 最后一次成功的实例集合。
#[derive(Debug, Clone, Default)]
pub struct Event {
    pub instances: Vec<Instance>,
    pub err: Option<Error>,
}

impl Event {
    /// 成功的成员快照
    pub fn new<I, S>(instances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Instance>,
    {
        Self {
            instances: instances.into_iter().map(Into::into).collect(),
            err: None,
        }
    }

    /// 后端失败事件
    pub fn error(err: Error) -> Self {
        Self {
            instances: Vec::new(),
            err: Some(err),
        }
    }

    /// 是否为失败事件
    pub fn is_err(&self) -> bool {
        self.err.is_some()
    }

    /// 规范化：实例排序并去重，便于比较
    pub(crate) fn normalize(mut self) -> Self {
        self.instances.sort();
        self.instances.dedup();
        self
    }

    /// 两个（已规范化的）事件是否等价
    pub(crate) fn same_as(&self, other: &Event) -> bool {
        self.instances == other.instances
            && self.err.as_ref().map(ToString::to_string)
                == other.err.as_ref().map(ToString::to_string)
    }
}
