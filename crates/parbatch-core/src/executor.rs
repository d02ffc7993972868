//! Bounded parallel executor
//!
//! Runs an async function over every item of a collection with at most
//! `max_concurrency` invocations in flight, and returns the outputs in input
//! order. While units are outstanding the executor races completion against a
//! polling interval and hands progress snapshots to the configured reporter;
//! once everything is terminal it reports one final snapshot.
//!
//! There is no cancellation: once scheduled, every unit runs to completion,
//! even after a sibling or the reporter has failed.

use futures::future::join_all;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::builder::ExecutorBuilder;
use crate::config::ExecutorConfig;
use crate::error::{BatchError, BatchResult, ConfigError};
use crate::progress::{ProgressReporter, ProgressSnapshot, SharedReporter};
use crate::stats::{BatchStats, ExecutorStats};
use crate::unit::{UnitOutcome, UnitTracker, run_unit};

type JoinResults<TOut, E> = Vec<Result<UnitOutcome<TOut, E>, JoinError>>;

/// Bounded-concurrency batch executor
///
/// # Example
///
/// ```rust
/// use parbatch_core::Executor;
///
/// #[tokio::main]
/// async fn main() {
///     let executor = Executor::builder().with_max_concurrency(2).build().unwrap();
///
///     let squares = executor
///         .run(vec![1u64, 2, 3, 4, 5], |x| async move { Ok::<_, std::io::Error>(x * x) })
///         .await
///         .unwrap();
///
///     assert_eq!(squares, vec![1, 4, 9, 16, 25]);
/// }
/// ```
pub struct Executor {
    config: ExecutorConfig,
    reporter: Option<SharedReporter>,
    stats: Mutex<ExecutorStats>,
    last_stats: Mutex<Option<BatchStats>>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .field("has_reporter", &self.reporter.is_some())
            .finish()
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    /// Create an executor with the default configuration and no reporter
    pub fn new() -> Self {
        Self {
            config: ExecutorConfig::default(),
            reporter: None,
            stats: Mutex::new(ExecutorStats::default()),
            last_stats: Mutex::new(None),
        }
    }

    /// Create an executor from a validated configuration
    pub fn with_config(config: ExecutorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::new()
    }

    pub(crate) fn from_parts(config: ExecutorConfig, reporter: Option<SharedReporter>) -> Self {
        Self {
            config,
            reporter,
            ..Self::new()
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn has_reporter(&self) -> bool {
        self.reporter.is_some()
    }

    /// Cumulative statistics over every run of this executor
    pub fn stats(&self) -> ExecutorStats {
        self.stats.lock().clone()
    }

    /// Statistics of the most recent run that scheduled work
    pub fn last_stats(&self) -> Option<BatchStats> {
        self.last_stats.lock().clone()
    }

    /// Run `f` over every item and collect the outputs in input order
    ///
    /// Fails with [`BatchError::Config`] before scheduling anything if the
    /// configuration is invalid. Otherwise waits for every unit to reach a
    /// terminal state, then fails if any unit or the reporter failed. When
    /// several units fail, the lowest input index is reported.
    pub async fn run<I, T, F, Fut, TOut, E>(&self, items: I, f: F) -> BatchResult<TOut, E>
    where
        I: IntoIterator<Item = T>,
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TOut, E>> + Send + 'static,
        TOut: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.config.validate()?;

        let items: Vec<T> = items.into_iter().collect();
        let total = items.len();
        let started = Instant::now();
        debug!(
            total,
            max_concurrency = self.config.max_concurrency,
            interval_ms = self.config.interval.as_millis() as u64,
            "starting batch"
        );

        let permits = self.config.max_concurrency.min(Semaphore::MAX_PERMITS);
        let semaphore = Arc::new(Semaphore::new(permits));
        let tracker = Arc::new(UnitTracker::new());
        let f = Arc::new(f);

        let handles: Vec<JoinHandle<UnitOutcome<TOut, E>>> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                tokio::spawn(run_unit(
                    index,
                    item,
                    semaphore.clone(),
                    tracker.clone(),
                    f.clone(),
                ))
            })
            .collect();

        let (results, reporter_error) = match &self.reporter {
            Some(reporter) => {
                self.drive_with_progress(reporter.as_ref(), handles, &tracker, total, started)
                    .await
            }
            None => (join_all(handles).await, None),
        };
        drop(semaphore);

        let elapsed = started.elapsed();
        let outcome = collect_outputs(results);

        let stats = BatchStats {
            total,
            succeeded: total - outcome.failed,
            failed: outcome.failed,
            elapsed,
            total_wait_time: tracker.wait_time(),
            total_execution_time: tracker.execution_time(),
            peak_concurrency: tracker.peak(),
        };

        let succeeded = reporter_error.is_none() && outcome.first_failure.is_none();
        self.stats
            .lock()
            .record(&stats, succeeded, reporter_error.is_some());
        *self.last_stats.lock() = Some(stats.clone());

        if let Some(e) = reporter_error {
            if outcome.failed > 0 {
                warn!(
                    failed = outcome.failed,
                    "batch also had failed units, reporting progress failure instead"
                );
            }
            return Err(BatchError::Progress(e));
        }

        if let Some(failure) = outcome.first_failure {
            warn!(
                total,
                failed = stats.failed,
                elapsed_ms = elapsed.as_millis() as u64,
                "batch failed: {}",
                failure
            );
            return Err(failure);
        }

        info!(
            total,
            elapsed_ms = elapsed.as_millis() as u64,
            peak_concurrency = stats.peak_concurrency,
            "batch completed"
        );
        Ok(outcome.outputs)
    }

    /// Poll progress until every unit is terminal, then flush once more
    ///
    /// Polling stops at the first reporter error; the remaining units are
    /// still awaited so no permit outlives the run.
    async fn drive_with_progress<TOut, E>(
        &self,
        reporter: &dyn ProgressReporter,
        handles: Vec<JoinHandle<UnitOutcome<TOut, E>>>,
        tracker: &UnitTracker,
        total: usize,
        started: Instant,
    ) -> (JoinResults<TOut, E>, Option<anyhow::Error>) {
        let interval = self.config.interval;
        let mut all_done = pin!(join_all(handles));
        let mut reporter_error = None;

        // An interval past the end of the clock never ticks
        let Some(first_tick) = started.checked_add(interval) else {
            debug!(?interval, "interval out of clock range, only the final snapshot is reported");
            let results = all_done.as_mut().await;
            let reporter_error = self.flush(reporter, total, started).await;
            return (results, reporter_error);
        };
        let mut ticker = tokio::time::interval_at(first_tick, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let results = loop {
            tokio::select! {
                biased;
                results = all_done.as_mut() => break results,
                _ = ticker.tick() => {
                    let snapshot = tracker.snapshot(total, started);
                    debug!(
                        completed = snapshot.completed,
                        total,
                        "progress tick"
                    );
                    if let Err(e) = reporter.report(snapshot).await {
                        warn!("progress reporter failed, waiting for outstanding units: {:#}", e);
                        reporter_error = Some(e);
                        break all_done.as_mut().await;
                    }
                }
            }
        };

        if reporter_error.is_none() {
            reporter_error = self.flush(reporter, total, started).await;
        }

        (results, reporter_error)
    }

    async fn flush(
        &self,
        reporter: &dyn ProgressReporter,
        total: usize,
        started: Instant,
    ) -> Option<anyhow::Error> {
        let last = ProgressSnapshot::new(total, total, started.elapsed());
        match reporter.report(last).await {
            Ok(()) => None,
            Err(e) => {
                warn!("progress reporter failed on final flush: {:#}", e);
                Some(e)
            }
        }
    }
}

struct CollectedOutputs<TOut, E> {
    outputs: Vec<TOut>,
    failed: usize,
    first_failure: Option<BatchError<E>>,
}

/// Place every output in its input slot, keeping the lowest-index failure
fn collect_outputs<TOut, E>(results: JoinResults<TOut, E>) -> CollectedOutputs<TOut, E> {
    let mut outputs = Vec::with_capacity(results.len());
    let mut failed = 0;
    let mut first_failure = None;

    for (index, result) in results.into_iter().enumerate() {
        let failure = match result {
            Ok(UnitOutcome::Completed(output)) => {
                outputs.push(output);
                continue;
            }
            Ok(UnitOutcome::Failed(source)) => BatchError::Item {
                index,
                source,
                failed: 0,
            },
            Ok(UnitOutcome::Abandoned) => BatchError::Abandoned { index },
            Err(join_error) => {
                let message = join_error_message(join_error);
                warn!(index, "unit panicked: {}", message);
                BatchError::Panicked {
                    index,
                    message,
                    failed: 0,
                }
            }
        };

        failed += 1;
        if first_failure.is_none() {
            first_failure = Some(failure);
        }
    }

    if let Some(
        BatchError::Item { failed: count, .. } | BatchError::Panicked { failed: count, .. },
    ) = &mut first_failure
    {
        *count = failed;
    }

    CollectedOutputs {
        outputs,
        failed,
        first_failure,
    }
}

fn join_error_message(error: JoinError) -> String {
    if error.is_cancelled() {
        return "task was cancelled".to_string();
    }
    match error.try_into_panic() {
        Ok(payload) => panic_message(payload.as_ref()),
        Err(error) => error.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run `f` over `items` with at most `max_concurrency` in flight, no progress
pub async fn run_bounded<I, T, F, Fut, TOut, E>(
    items: I,
    f: F,
    max_concurrency: usize,
) -> BatchResult<TOut, E>
where
    I: IntoIterator<Item = T>,
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TOut, E>> + Send + 'static,
    TOut: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let executor = ExecutorBuilder::new()
        .with_max_concurrency(max_concurrency)
        .build()?;
    executor.run(items, f).await
}

/// Run `f` over `items`, reporting progress every `interval`
pub async fn run_with_progress<I, T, F, Fut, TOut, E, R>(
    items: I,
    f: F,
    reporter: R,
    interval: std::time::Duration,
    max_concurrency: usize,
) -> BatchResult<TOut, E>
where
    I: IntoIterator<Item = T>,
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TOut, E>> + Send + 'static,
    TOut: Send + 'static,
    E: fmt::Display + Send + 'static,
    R: ProgressReporter + 'static,
{
    let executor = ExecutorBuilder::new()
        .with_max_concurrency(max_concurrency)
        .with_interval(interval)
        .with_reporter(reporter)
        .build()?;
    executor.run(items, f).await
}
