//! Parbatch Core Library
//!
//! Bounded-concurrency batch execution: run an async function over a fixed
//! collection of items with at most `max_concurrency` invocations in flight,
//! collect the outputs in input order, and report progress on an interval.

pub mod builder;
pub mod config;
pub mod error;
pub mod executor;
pub mod progress;
pub mod stats;
mod unit;

// Re-export commonly used types
pub use builder::ExecutorBuilder;
pub use config::{ExecutorConfig, load_config, load_from_file};
pub use error::{BatchError, BatchResult, ConfigError};
pub use executor::{Executor, run_bounded, run_with_progress};
pub use progress::{
    FnReporter, LogReporter, ProgressReporter, ProgressSnapshot, RecordingReporter,
    SharedReporter, reporter_fn,
};
pub use stats::{BatchStats, ExecutorStats};
