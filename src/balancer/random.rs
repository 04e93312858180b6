//! 随机负载均衡

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Balancer;
use crate::discovery::Endpointer;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};

/// 随机均衡器：每次调用在当前快照上均匀抽取下标
pub struct Random<Req, Resp> {
    endpointer: Arc<dyn Endpointer<Req, Resp>>,
    rng: Mutex<StdRng>,
}

impl<Req, Resp> Random<Req, Resp> {
    /// 使用固定种子创建，选择序列可复现
    pub fn new(endpointer: Arc<dyn Endpointer<Req, Resp>>, seed: u64) -> Self {
        Self {
            endpointer,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// 使用系统熵创建
    pub fn from_entropy(endpointer: Arc<dyn Endpointer<Req, Resp>>) -> Self {
        Self {
            endpointer,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

impl<Req, Resp> Balancer<Req, Resp> for Random<Req, Resp> {
    fn endpoint(&self) -> Result<Endpoint<Req, Resp>> {
        let endpoints = self.endpointer.endpoints()?;
        if endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }
        let index = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .gen_range(0..endpoints.len());
        Ok(endpoints[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::FixedEndpointer;

    #[test]
    fn test_random_covers_every_endpoint() {
        let all: Vec<Endpoint<(), ()>> = (0..4).map(|_| Endpoint::nop()).collect();
        let balancer = Random::new(Arc::new(FixedEndpointer::new(all.clone())), 42);

        let mut counts = [0usize; 4];
        for _ in 0..4000 {
            let selected = balancer.endpoint().unwrap();
            let index = all.iter().position(|e| e.ptr_eq(&selected)).unwrap();
            counts[index] += 1;
        }
        // 均匀分布下每个约 1000 次
        assert!(counts.iter().all(|&n| n > 800 && n < 1200), "{counts:?}");
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let all: Vec<Endpoint<(), ()>> = (0..8).map(|_| Endpoint::nop()).collect();
        let a = Random::new(Arc::new(FixedEndpointer::new(all.clone())), 7);
        let b = Random::new(Arc::new(FixedEndpointer::new(all)), 7);
        for _ in 0..32 {
            assert!(a.endpoint().unwrap().ptr_eq(&b.endpoint().unwrap()));
        }
    }

    #[test]
    fn test_empty_snapshot_returns_no_endpoints() {
        let balancer = Random::<(), ()>::from_entropy(Arc::new(FixedEndpointer::new(Vec::new())));
        assert!(matches!(balancer.endpoint(), Err(Error::NoEndpoints)));
    }
}
