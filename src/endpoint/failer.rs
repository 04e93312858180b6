//! 业务错误能力查询
//!
//! 响应值可以选择实现 [`Failer`]，在端点本身返回成功的情况下
//! 报告业务层面的失败。关心业务失败的使用方（日志、熔断、重试）
//! 必须显式地通过 [`MaybeFailer::as_failer`] 查询该能力；
//! 查询结果为 `None` 表示“没有业务错误信号”，而不是“没有错误”。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::Error;

/// 业务错误报告能力
pub trait Failer {
    /// 业务失败时返回错误
    fn failed(&self) -> Option<Error>;
}

/// 能力查询：尝试把响应视为 [`Failer`]
pub trait MaybeFailer {
    fn as_failer(&self) -> Option<&dyn Failer> {
        None
    }
}

macro_rules! impl_without_failure_detail {
    ($($ty:ty),* $(,)?) => {
        $(impl MaybeFailer for $ty {})*
    };
}

impl_without_failure_detail!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
    &'static str,
    serde_json::Value,
);

impl<T> MaybeFailer for Vec<T> {}

impl<K, V> MaybeFailer for HashMap<K, V> {}

impl<K, V> MaybeFailer for BTreeMap<K, V> {}

impl<T: MaybeFailer> MaybeFailer for Option<T> {
    fn as_failer(&self) -> Option<&dyn Failer> {
        self.as_ref().and_then(|inner| inner.as_failer())
    }
}

impl<T: MaybeFailer + ?Sized> MaybeFailer for Box<T> {
    fn as_failer(&self) -> Option<&dyn Failer> {
        (**self).as_failer()
    }
}

impl<T: MaybeFailer + ?Sized> MaybeFailer for Arc<T> {
    fn as_failer(&self) -> Option<&dyn Failer> {
        (**self).as_failer()
    }
}

/// 查询响应携带的业务错误
pub fn business_error<R>(response: &R) -> Option<Error>
where
    R: MaybeFailer + ?Sized,
{
    response.as_failer().and_then(|failer| failer.failed())
}

/// 携带可选业务错误的通用响应
#[derive(Debug, Clone, Default)]
pub struct Fallible<T> {
    pub value: T,
    pub failure: Option<Error>,
}

impl<T> Fallible<T> {
    /// 业务成功的响应
    pub fn ok(value: T) -> Self {
        Self {
            value,
            failure: None,
        }
    }

    /// 业务失败的响应
    pub fn failed(value: T, failure: Error) -> Self {
        Self {
            value,
            failure: Some(failure),
        }
    }
}

impl<T> Failer for Fallible<T> {
    fn failed(&self) -> Option<Error> {
        self.failure.clone()
    }
}

impl<T> MaybeFailer for Fallible<T> {
    fn as_failer(&self) -> Option<&dyn Failer> {
        Some(self)
    }
}
