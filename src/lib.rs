//! parbatch
//!
//! Run an async function over every item of a collection with a fixed cap on
//! concurrently running invocations. Outputs come back in input order and
//! progress can be reported on an interval while work is outstanding.
//!
//! ```rust
//! use parbatch::{RecordingReporter, run_with_progress};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let progress = Arc::new(RecordingReporter::new());
//!     let lengths = run_with_progress(
//!         vec!["alpha", "beta", "gamma"],
//!         |word| async move { Ok::<_, std::io::Error>(word.len()) },
//!         progress.clone(),
//!         Duration::from_millis(100),
//!         2,
//!     )
//!     .await?;
//!
//!     assert_eq!(lengths, vec![5, 4, 5]);
//!     assert!(progress.last().is_some_and(|p| p.is_complete()));
//!     Ok(())
//! }
//! ```

pub use parbatch_core::*;

/// Commonly used items for glob import
pub mod prelude {
    pub use parbatch_core::{
        BatchError, BatchResult, Executor, ExecutorBuilder, ExecutorConfig, ProgressReporter,
        ProgressSnapshot, reporter_fn, run_bounded, run_with_progress,
    };
}
