//! Work units: one scheduled execution of the item function
//!
//! Each unit runs in its own task, waits for a permit, runs the item function,
//! and records its outcome. Accounting lives in RAII guards so that it happens
//! on every exit path, unwinding included:
//! - the running guard is dropped before the permit, so the in-flight gauge
//!   never overshoots the permit count
//! - the terminal guard is dropped last, so a unit counts as completed only
//!   after its permit is back in the pool

use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{trace, warn};

use crate::progress::ProgressSnapshot;

/// Terminal state of a unit
pub(crate) enum UnitOutcome<TOut, E> {
    Completed(TOut),
    Failed(E),
    /// The permit pool was closed before a permit could be acquired
    Abandoned,
}

#[derive(Debug, Default)]
struct UnitTimings {
    wait: Duration,
    execution: Duration,
}

/// Counters shared by every unit of one batch
#[derive(Debug, Default)]
pub(crate) struct UnitTracker {
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    timings: Mutex<UnitTimings>,
}

impl UnitTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    pub(crate) fn wait_time(&self) -> Duration {
        self.timings.lock().wait
    }

    pub(crate) fn execution_time(&self) -> Duration {
        self.timings.lock().execution
    }

    pub(crate) fn snapshot(&self, total: usize, started: Instant) -> ProgressSnapshot {
        ProgressSnapshot::new(self.completed(), total, started.elapsed())
    }

    fn terminal(&self) -> TerminalGuard<'_> {
        TerminalGuard { tracker: self }
    }

    fn enter(&self, waited: Duration) -> RunningGuard<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        self.timings.lock().wait += waited;
        RunningGuard {
            tracker: self,
            started: Instant::now(),
        }
    }
}

/// Marks the unit terminal when dropped
struct TerminalGuard<'a> {
    tracker: &'a UnitTracker,
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        self.tracker.completed.fetch_add(1, Ordering::AcqRel);
    }
}

/// Holds the in-flight slot while the item function runs
struct RunningGuard<'a> {
    tracker: &'a UnitTracker,
    started: Instant,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.tracker.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.tracker.timings.lock().execution += self.started.elapsed();
    }
}

/// Body of the task spawned for item `index`
pub(crate) async fn run_unit<T, F, Fut, TOut, E>(
    index: usize,
    item: T,
    semaphore: Arc<Semaphore>,
    tracker: Arc<UnitTracker>,
    f: Arc<F>,
) -> UnitOutcome<TOut, E>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<TOut, E>>,
    E: fmt::Display,
{
    let _terminal = tracker.terminal();

    let wait_start = Instant::now();
    let Ok(_permit) = semaphore.acquire_owned().await else {
        warn!(index, "permit pool closed before unit could run");
        return UnitOutcome::Abandoned;
    };
    let _running = tracker.enter(wait_start.elapsed());
    trace!(index, "unit acquired permit");

    match f(item).await {
        Ok(output) => {
            trace!(index, "unit completed");
            UnitOutcome::Completed(output)
        }
        Err(e) => {
            warn!(index, "unit failed: {}", e);
            UnitOutcome::Failed(e)
        }
    }
}
