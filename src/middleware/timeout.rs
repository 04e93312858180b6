use std::time::Duration;

use crate::context::Context;
use crate::endpoint::{Endpoint, Middleware};

/// 超时中间件
///
/// 为每次调用派生带超时的子上下文，并在超时后丢弃内层调用。
#[derive(Debug, Clone, Copy)]
pub struct TimeoutMiddleware {
    timeout: Duration,
}

impl TimeoutMiddleware {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl<Req, Resp> Middleware<Req, Resp> for TimeoutMiddleware
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    fn wrap(&self, next: Endpoint<Req, Resp>) -> Endpoint<Req, Resp> {
        let timeout = self.timeout;
        Endpoint::new(move |ctx: Context, req: Req| {
            let next = next.clone();
            async move {
                let ctx = ctx.with_timeout(timeout);
                ctx.run(next.call(ctx.clone(), req)).await?
            }
        })
    }
}

pub fn timeout(timeout: Duration) -> TimeoutMiddleware {
    TimeoutMiddleware::new(timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let slow = Endpoint::new(|_ctx, req: u32| async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(req)
        });
        let endpoint = slow.with(timeout(Duration::from_millis(100)));
        let result = endpoint.call(Context::background(), 1).await;
        assert!(matches!(result, Err(Error::DeadlineExceeded)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inner_sees_deadline() {
        let echo_deadline =
            Endpoint::new(|ctx: Context, _req: ()| async move { Ok(ctx.remaining()) });
        let endpoint = echo_deadline.with(timeout(Duration::from_secs(2)));
        let remaining = endpoint.call(Context::background(), ()).await.unwrap();
        assert_eq!(remaining, Some(Duration::from_secs(2)));
    }
}
