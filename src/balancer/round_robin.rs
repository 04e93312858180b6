//! 轮询负载均衡

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::Balancer;
use crate::discovery::Endpointer;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};

/// 轮询均衡器
///
/// 计数器在所有调用间共享，下标按选择时刻的快照长度取模。
pub struct RoundRobin<Req, Resp> {
    endpointer: Arc<dyn Endpointer<Req, Resp>>,
    counter: AtomicU64,
}

impl<Req, Resp> RoundRobin<Req, Resp> {
    pub fn new(endpointer: Arc<dyn Endpointer<Req, Resp>>) -> Self {
        Self {
            endpointer,
            counter: AtomicU64::new(0),
        }
    }
}

impl<Req, Resp> Balancer<Req, Resp> for RoundRobin<Req, Resp> {
    fn endpoint(&self) -> Result<Endpoint<Req, Resp>> {
        let endpoints = self.endpointer.endpoints()?;
        if endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % endpoints.len() as u64;
        Ok(endpoints[index as usize].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{Endpoints, FixedEndpointer};
    use std::sync::Mutex;

    fn endpoints(n: usize) -> Vec<Endpoint<(), ()>> {
        (0..n).map(|_| Endpoint::nop()).collect()
    }

    fn position(all: &[Endpoint<(), ()>], selected: &Endpoint<(), ()>) -> usize {
        all.iter()
            .position(|endpoint| endpoint.ptr_eq(selected))
            .expect("selected endpoint belongs to the snapshot")
    }

    #[test]
    fn test_round_robin_is_fair() {
        let all = endpoints(3);
        let balancer = RoundRobin::new(Arc::new(FixedEndpointer::new(all.clone())));

        let mut counts = [0usize; 3];
        for _ in 0..9 {
            let selected = balancer.endpoint().unwrap();
            counts[position(&all, &selected)] += 1;
        }
        assert_eq!(counts, [3, 3, 3]);
    }

    #[test]
    fn test_empty_snapshot_returns_no_endpoints() {
        let balancer = RoundRobin::<(), ()>::new(Arc::new(FixedEndpointer::new(Vec::new())));
        for _ in 0..3 {
            assert!(matches!(balancer.endpoint(), Err(Error::NoEndpoints)));
        }
    }

    /// 快照可以在两次选择之间被替换
    struct Swappable {
        current: Mutex<Endpoints<(), ()>>,
    }

    impl Endpointer<(), ()> for Swappable {
        fn endpoints(&self) -> Result<Endpoints<(), ()>> {
            Ok(self.current.lock().unwrap().clone())
        }
    }

    #[test]
    fn test_tolerates_shrinking_snapshot() {
        let source = Arc::new(Swappable {
            current: Mutex::new(Arc::new(endpoints(5))),
        });
        let balancer = RoundRobin::new(source.clone());
        for _ in 0..4 {
            balancer.endpoint().unwrap();
        }

        let remaining = endpoints(2);
        *source.current.lock().unwrap() = Arc::new(remaining.clone());
        for _ in 0..4 {
            let selected = balancer.endpoint().unwrap();
            position(&remaining, &selected);
        }

        *source.current.lock().unwrap() = Arc::new(Vec::new());
        assert!(matches!(balancer.endpoint(), Err(Error::NoEndpoints)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_counter() {
        let all = endpoints(4);
        let balancer = Arc::new(RoundRobin::new(Arc::new(FixedEndpointer::new(all.clone()))));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let balancer = balancer.clone();
                tokio::spawn(async move {
                    (0..100)
                        .map(|_| balancer.endpoint().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts = [0usize; 4];
        for task in tasks {
            for selected in task.await.unwrap() {
                counts[position(&all, &selected)] += 1;
            }
        }
        assert_eq!(counts, [200, 200, 200, 200]);
    }
}
