//! Synthetic workload used by `parbatch run`

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure raised for items listed in `--fail`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("synthetic failure for item {0}")]
pub struct SyntheticFailure(pub usize);

/// Description of the simulated per-item work
#[derive(Debug, Clone)]
pub struct Workload {
    delay: Duration,
    jitter: Duration,
    failing: Arc<HashSet<usize>>,
}

impl Workload {
    pub fn new(delay: Duration, jitter: Duration, failing: impl IntoIterator<Item = usize>) -> Self {
        Self {
            delay,
            jitter,
            failing: Arc::new(failing.into_iter().collect()),
        }
    }

    /// Delay for one item; jitter cycles through seven evenly spaced steps
    pub fn delay_for(&self, index: usize) -> Duration {
        let step = (index * 3 % 7) as u32;
        self.delay + self.jitter * step / 6
    }

    /// Simulate processing item `index`, producing `index * index`
    pub async fn process(&self, index: usize) -> Result<usize, SyntheticFailure> {
        tokio::time::sleep(self.delay_for(index)).await;
        if self.failing.contains(&index) {
            return Err(SyntheticFailure(index));
        }
        Ok(index * index)
    }
}
