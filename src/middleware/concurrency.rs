use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::context::Context;
use crate::endpoint::{Endpoint, Middleware};
use crate::error::Error;

/// 并发限制中间件
///
/// 同一个中间件实例包装出的所有端点共享同一组许可；
/// 等待许可时遵守上下文取消。
#[derive(Debug, Clone)]
pub struct ConcurrencyLimitMiddleware {
    semaphore: Arc<Semaphore>,
}

impl ConcurrencyLimitMiddleware {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// 当前可用许可数
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl<Req, Resp> Middleware<Req, Resp> for ConcurrencyLimitMiddleware
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    fn wrap(&self, next: Endpoint<Req, Resp>) -> Endpoint<Req, Resp> {
        let semaphore = self.semaphore.clone();
        Endpoint::new(move |ctx: Context, req: Req| {
            let next = next.clone();
            let semaphore = semaphore.clone();
            async move {
                let _permit = ctx
                    .run(semaphore.acquire_owned())
                    .await?
                    .map_err(|err| Error::transport(err))?;
                next.call(ctx, req).await
            }
        })
    }
}

pub fn concurrency_limit(max_concurrent: usize) -> ConcurrencyLimitMiddleware {
    ConcurrencyLimitMiddleware::new(max_concurrent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_calls_are_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let work = {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            Endpoint::new(move |_ctx, _req: ()| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
        };
        let endpoint = work.with(concurrency_limit(2));

        let calls: Vec<_> = (0..6)
            .map(|_| endpoint.call(Context::background(), ()))
            .collect();
        for result in futures::future::join_all(calls).await {
            result.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_for_permit_honors_deadline() {
        let limit = concurrency_limit(1);
        let blocking = Endpoint::new(|_ctx, _req: ()| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .with(limit.clone());

        let holder = tokio::spawn(blocking.call(Context::background(), ()));
        tokio::task::yield_now().await;
        assert_eq!(limit.available_permits(), 0);

        let ctx = Context::background().with_timeout(Duration::from_millis(10));
        let result = blocking.call(ctx, ()).await;
        assert!(matches!(result, Err(Error::DeadlineExceeded)));
        holder.abort();
    }
}
