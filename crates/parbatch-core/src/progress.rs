//! Progress snapshots and reporters
//!
//! The executor polls its terminal-unit counter on a fixed interval and hands
//! each [`ProgressSnapshot`] to a [`ProgressReporter`]. Reporters are always
//! invoked sequentially from the coordinating future, never concurrently with
//! themselves, and receive one final snapshot once every unit is terminal.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Point-in-time view of a running batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Units that reached a terminal state (success or failure)
    pub completed: usize,
    /// Units in the batch
    pub total: usize,
    /// Wall time since the batch started
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    pub fn new(completed: usize, total: usize, elapsed: Duration) -> Self {
        Self {
            completed: completed.min(total),
            total,
            elapsed,
        }
    }

    /// Completed share in `0.0..=1.0`; an empty batch is fully complete
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    pub fn percent(&self) -> f64 {
        self.fraction() * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }

    pub fn remaining(&self) -> usize {
        self.total - self.completed
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.1}%) in {:.2}s",
            self.completed,
            self.total,
            self.percent(),
            self.elapsed.as_secs_f64()
        )
    }
}

/// Receives progress snapshots while a batch runs
///
/// An error returned from [`report`](Self::report) fails the whole batch
/// with [`BatchError::Progress`](crate::BatchError::Progress). Units already
/// scheduled still run to completion before the executor returns.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, progress: ProgressSnapshot) -> anyhow::Result<()>;
}

/// Shared handle to a reporter
pub type SharedReporter = Arc<dyn ProgressReporter>;

#[async_trait]
impl<R: ProgressReporter + ?Sized> ProgressReporter for Arc<R> {
    async fn report(&self, progress: ProgressSnapshot) -> anyhow::Result<()> {
        (**self).report(progress).await
    }
}

/// Adapts an async closure into a [`ProgressReporter`]
pub struct FnReporter<F> {
    f: F,
}

impl<F> FnReporter<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> ProgressReporter for FnReporter<F>
where
    F: Fn(ProgressSnapshot) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn report(&self, progress: ProgressSnapshot) -> anyhow::Result<()> {
        (self.f)(progress).await
    }
}

/// Build a reporter from an async closure
///
/// ```rust
/// use parbatch_core::progress::{reporter_fn, ProgressSnapshot};
///
/// let reporter = reporter_fn(|p: ProgressSnapshot| async move {
///     println!("{p}");
///     Ok(())
/// });
/// # let _ = reporter;
/// ```
pub fn reporter_fn<F, Fut>(f: F) -> FnReporter<F>
where
    F: Fn(ProgressSnapshot) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    FnReporter::new(f)
}

/// Emits each snapshot as a `tracing` event
///
/// Intermediate ticks are logged at `debug`, the final snapshot at `info`.
#[derive(Debug, Clone)]
pub struct LogReporter {
    label: String,
}

impl LogReporter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for LogReporter {
    fn default() -> Self {
        Self::new("batch")
    }
}

#[async_trait]
impl ProgressReporter for LogReporter {
    async fn report(&self, progress: ProgressSnapshot) -> anyhow::Result<()> {
        if progress.is_complete() {
            tracing::info!(
                label = %self.label,
                completed = progress.completed,
                total = progress.total,
                elapsed_ms = progress.elapsed.as_millis() as u64,
                "batch progress: {}",
                progress
            );
        } else {
            tracing::debug!(
                label = %self.label,
                completed = progress.completed,
                total = progress.total,
                elapsed_ms = progress.elapsed.as_millis() as u64,
                "batch progress: {}",
                progress
            );
        }
        Ok(())
    }
}

/// Keeps every snapshot it receives
#[derive(Debug, Default)]
pub struct RecordingReporter {
    snapshots: Mutex<Vec<ProgressSnapshot>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all snapshots received so far, in call order
    pub fn snapshots(&self) -> Vec<ProgressSnapshot> {
        self.snapshots.lock().clone()
    }

    pub fn last(&self) -> Option<ProgressSnapshot> {
        self.snapshots.lock().last().copied()
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.lock().is_empty()
    }
}

#[async_trait]
impl ProgressReporter for RecordingReporter {
    async fn report(&self, progress: ProgressSnapshot) -> anyhow::Result<()> {
        self.snapshots.lock().push(progress);
        Ok(())
    }
}
