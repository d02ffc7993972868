//! Execution statistics

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Summary of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Wall time from scheduling to the final progress flush
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    /// Time units spent waiting for a permit, summed over all units
    #[serde(with = "humantime_serde")]
    pub total_wait_time: Duration,
    /// Time units spent running the item function, summed over all units
    #[serde(with = "humantime_serde")]
    pub total_execution_time: Duration,
    /// Highest number of units observed running at once
    pub peak_concurrency: usize,
}

impl BatchStats {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.succeeded as f64 / self.total as f64
        }
    }

    pub fn average_execution_time(&self) -> Duration {
        let ran = self.succeeded + self.failed;
        if ran == 0 {
            Duration::ZERO
        } else {
            match u32::try_from(ran) {
                Ok(ran) => self.total_execution_time / ran,
                Err(_) => {
                    Duration::from_secs_f64(self.total_execution_time.as_secs_f64() / ran as f64)
                }
            }
        }
    }
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} items: {} succeeded, {} failed in {:.2}s (peak concurrency {}, avg {:.1}ms/item)",
            self.total,
            self.succeeded,
            self.failed,
            self.elapsed.as_secs_f64(),
            self.peak_concurrency,
            self.average_execution_time().as_secs_f64() * 1000.0
        )
    }
}

/// Cumulative statistics across every run of an executor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorStats {
    pub batches: u64,
    pub failed_batches: u64,
    pub items: u64,
    pub failed_items: u64,
    pub reporter_failures: u64,
    #[serde(with = "humantime_serde")]
    pub total_elapsed: Duration,
}

impl ExecutorStats {
    pub(crate) fn record(&mut self, batch: &BatchStats, succeeded: bool, reporter_failed: bool) {
        self.batches += 1;
        self.items += batch.total as u64;
        self.failed_items += batch.failed as u64;
        self.total_elapsed += batch.elapsed;
        if !succeeded {
            self.failed_batches += 1;
        }
        if reporter_failed {
            self.reporter_failures += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let stats = BatchStats {
            total: 4,
            succeeded: 3,
            failed: 1,
            ..Default::default()
        };
        assert_eq!(stats.success_rate(), 0.75);
        assert_eq!(BatchStats::default().success_rate(), 1.0);
    }

    #[test]
    fn test_average_execution_time() {
        let stats = BatchStats {
            total: 4,
            succeeded: 2,
            failed: 2,
            total_execution_time: Duration::from_millis(400),
            ..Default::default()
        };
        assert_eq!(stats.average_execution_time(), Duration::from_millis(100));
        assert_eq!(BatchStats::default().average_execution_time(), Duration::ZERO);

        let huge = BatchStats {
            total: 1 << 32,
            succeeded: 1 << 32,
            total_execution_time: Duration::from_secs(1 << 33),
            ..Default::default()
        };
        assert_eq!(huge.average_execution_time(), Duration::from_secs(2));
    }

    #[test]
    fn test_executor_stats_accumulate() {
        let mut stats = ExecutorStats::default();
        let batch = BatchStats {
            total: 5,
            succeeded: 4,
            failed: 1,
            elapsed: Duration::from_secs(2),
            ..Default::default()
        };

        stats.record(&batch, false, false);
        stats.record(&batch, true, true);

        assert_eq!(stats.batches, 2);
        assert_eq!(stats.failed_batches, 1);
        assert_eq!(stats.items, 10);
        assert_eq!(stats.failed_items, 2);
        assert_eq!(stats.reporter_failures, 1);
        assert_eq!(stats.total_elapsed, Duration::from_secs(4));
    }
}
