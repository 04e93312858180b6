use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::context::Context;
use crate::endpoint::{business_error, Endpoint, MaybeFailer, Middleware};

/// 日志中间件
///
/// 记录调用耗时；传输错误记为 `warn`，通过 [`MaybeFailer`] 查询到的业务错误记为 `info`。
#[derive(Debug, Clone)]
pub struct LoggingMiddleware {
    name: Arc<str>,
}

impl LoggingMiddleware {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }
}

impl<Req, Resp> Middleware<Req, Resp> for LoggingMiddleware
where
    Req: Send + 'static,
    Resp: MaybeFailer + Send + 'static,
{
    fn wrap(&self, next: Endpoint<Req, Resp>) -> Endpoint<Req, Resp> {
        let name = self.name.clone();
        Endpoint::new(move |ctx: Context, req: Req| {
            let next = next.clone();
            let name = name.clone();
            async move {
                let start = Instant::now();
                debug!(endpoint = %name, "endpoint call started");

                let result = next.call(ctx, req).await;
                let elapsed_ms = start.elapsed().as_millis() as u64;
                match &result {
                    Ok(resp) => match business_error(resp) {
                        Some(err) => {
                            info!(endpoint = %name, elapsed_ms, error = %err, "endpoint returned business error")
                        }
                        None => debug!(endpoint = %name, elapsed_ms, "endpoint call finished"),
                    },
                    Err(err) if err.is_cancellation() => {
                        debug!(endpoint = %name, elapsed_ms, error = %err, "endpoint call canceled")
                    }
                    Err(err) => warn!(
                        endpoint = %name,
                        elapsed_ms,
                        code = err.code().as_str(),
                        error = %err,
                        "endpoint call failed"
                    ),
                }
                result
            }
        })
    }
}

pub fn logging(name: impl Into<Arc<str>>) -> LoggingMiddleware {
    LoggingMiddleware::new(name)
}
