//! 端点抽象
//!
//! [`Endpoint`] 是服务端和客户端的基本构建单元，代表一个 RPC 方法：
//! 输入上下文和请求，输出响应或错误。[`Middleware`] 对端点做可组合的包装，
//! [`Chain`] 按声明顺序组合多个中间件（第一个为最外层）。

pub mod failer;

pub use failer::{business_error, Fallible, Failer, MaybeFailer};

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use futures::future::BoxFuture;
use tower::ServiceExt;

use crate::context::Context;
use crate::error::{BoxError, Error, Result};

type EndpointFn<Req, Resp> =
    dyn Fn(Context, Req) -> BoxFuture<'static, Result<Resp>> + Send + Sync;

/// 端点：单个可调用的操作
///
/// 克隆开销很小（共享同一个底层闭包），可以被任意多个任务并发调用。
pub struct Endpoint<Req, Resp> {
    inner: Arc<EndpointFn<Req, Resp>>,
}

impl<Req, Resp> Clone for Endpoint<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<Req, Resp> fmt::Debug for Endpoint<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("ptr", &Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

impl<Req, Resp> Endpoint<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    /// 从异步闭包创建端点
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Context, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |ctx: Context, req: Req| -> BoxFuture<'static, Result<Resp>> {
                Box::pin(f(ctx, req))
            }),
        }
    }

    /// 调用端点
    pub fn call(&self, ctx: Context, req: Req) -> BoxFuture<'static, Result<Resp>> {
        (self.inner)(ctx, req)
    }

    /// 用中间件包装端点
    pub fn with<M>(self, middleware: M) -> Self
    where
        M: Middleware<Req, Resp>,
    {
        middleware.wrap(self)
    }

    /// 将可克隆的 tower 服务适配为端点
    ///
    /// 每次调用克隆一份服务并执行 `oneshot`，调用过程受上下文取消约束。
    pub fn from_service<S>(service: S) -> Self
    where
        S: tower::Service<Req, Response = Resp> + Clone + Send + Sync + 'static,
        S::Error: Into<BoxError>,
        S::Future: Send + 'static,
    {
        Self::new(move |ctx: Context, req| {
            let service = service.clone();
            async move {
                ctx.run(async move {
                    service.oneshot(req).await.map_err(|err| {
                        let err: BoxError = err.into();
                        Error::from(err)
                    })
                })
                .await?
            }
        })
    }
}

impl<Req, Resp> Endpoint<Req, Resp> {
    /// 两个端点是否共享同一个底层闭包
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<Req, Resp> Endpoint<Req, Resp>
where
    Req: Send + 'static,
    Resp: Default + Send + 'static,
{
    /// 什么也不做的端点：返回零值响应和空错误，用于测试
    pub fn nop() -> Self {
        Self::new(|_ctx, _req| async { Ok(Resp::default()) })
    }
}

/// 以后台上下文调用端点，便于接入 tower 生态
impl<Req, Resp> tower::Service<Req> for Endpoint<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    type Response = Resp;
    type Error = Error;
    type Future = BoxFuture<'static, Result<Resp>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        Endpoint::call(self, Context::background(), req)
    }
}

/// 中间件：端点的行为修饰器
pub trait Middleware<Req, Resp>: Send + Sync {
    /// 包装下一个端点，返回新的端点
    fn wrap(&self, next: Endpoint<Req, Resp>) -> Endpoint<Req, Resp>;
}

impl<F, Req, Resp> Middleware<Req, Resp> for F
where
    F: Fn(Endpoint<Req, Resp>) -> Endpoint<Req, Resp> + Send + Sync,
{
    fn wrap(&self, next: Endpoint<Req, Resp>) -> Endpoint<Req, Resp> {
        self(next)
    }
}

/// 中间件链
///
/// 请求按声明顺序穿过中间件：第一个中间件在最外层，
/// 它的前置逻辑最先执行，后置逻辑最后执行。
pub struct Chain<Req, Resp> {
    middlewares: Vec<Arc<dyn Middleware<Req, Resp>>>,
}

impl<Req, Resp> Clone for Chain<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            middlewares: self.middlewares.clone(),
        }
    }
}

impl<Req, Resp> Chain<Req, Resp>
where
    Req: 'static,
    Resp: 'static,
{
    /// 以最外层中间件创建链
    pub fn new<M>(outer: M) -> Self
    where
        M: Middleware<Req, Resp> + 'static,
    {
        Self {
            middlewares: vec![Arc::new(outer)],
        }
    }

    /// 追加一个内层中间件
    #[must_use]
    pub fn then<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<Req, Resp> + 'static,
    {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// 链中中间件数量
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl<Req, Resp> Middleware<Req, Resp> for Chain<Req, Resp> {
    fn wrap(&self, next: Endpoint<Req, Resp>) -> Endpoint<Req, Resp> {
        self.middlewares
            .iter()
            .rev()
            .fold(next, |next, middleware| middleware.wrap(next))
    }
}

/// 组合中间件：`outer` 为最外层，`others` 依次向内
pub fn chain<Req, Resp>(
    outer: Arc<dyn Middleware<Req, Resp>>,
    others: impl IntoIterator<Item = Arc<dyn Middleware<Req, Resp>>>,
) -> Chain<Req, Resp> {
    let mut middlewares = vec![outer];
    middlewares.extend(others);
    Chain { middlewares }
}
