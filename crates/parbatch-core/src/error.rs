//! Error types for batch execution

use std::path::PathBuf;
use thiserror::Error;

/// Result of a batch run: the ordered outputs or the representative failure
pub type BatchResult<T, E> = Result<Vec<T>, BatchError<E>>;

/// Invalid or unloadable executor configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_concurrency` must allow at least one unit to run
    #[error("max concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    /// The progress polling interval must be non-zero
    #[error("progress interval must be greater than zero")]
    InvalidInterval,

    /// A configuration file could not be read or parsed
    #[error("failed to load config from '{}': {message}", .path.display())]
    Load { path: PathBuf, message: String },

    /// An environment override held an unusable value
    #[error("invalid value in {var}: {message}")]
    Env { var: String, message: String },
}

impl ConfigError {
    pub fn load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn env(var: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Env {
            var: var.into(),
            message: message.into(),
        }
    }
}

/// Failure of a whole batch run
///
/// `E` is the error type of the per-item function. Only one failure is
/// surfaced per run; when several units fail, the one with the lowest input
/// index is reported and `failed` carries the total count.
#[derive(Error, Debug)]
pub enum BatchError<E> {
    /// Rejected before any work was scheduled
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A per-item function returned an error
    #[error("item {index} failed ({failed} failed in total): {source}")]
    Item {
        index: usize,
        #[source]
        source: E,
        failed: usize,
    },

    /// The progress reporter returned an error
    #[error("progress reporter failed: {0}")]
    Progress(#[source] anyhow::Error),

    /// The task running a unit panicked
    #[error("unit for item {index} panicked ({failed} failed in total): {message}")]
    Panicked {
        index: usize,
        message: String,
        failed: usize,
    },

    /// A unit never obtained a permit because the pool was closed
    ///
    /// `Executor::run` keeps its pool open until every unit is terminal, so a
    /// run does not produce this today. It stands in for the acquire error
    /// instead of a panic.
    #[error("unit for item {index} was abandoned before it could run")]
    Abandoned { index: usize },
}

impl<E> BatchError<E> {
    /// Input index of the failing unit, if the failure belongs to one
    pub fn item_index(&self) -> Option<usize> {
        match self {
            Self::Item { index, .. } | Self::Panicked { index, .. } | Self::Abandoned { index } => {
                Some(*index)
            }
            Self::Config(_) | Self::Progress(_) => None,
        }
    }

    /// Total number of failed units, when the failure belongs to one
    pub fn failed_count(&self) -> Option<usize> {
        match self {
            Self::Item { failed, .. } | Self::Panicked { failed, .. } => Some(*failed),
            Self::Abandoned { .. } => Some(1),
            Self::Config(_) | Self::Progress(_) => None,
        }
    }

    /// Whether the per-item function itself returned the error
    pub fn is_item_failure(&self) -> bool {
        matches!(self, Self::Item { .. })
    }

    /// Extract the per-item error, discarding the batch context
    pub fn into_item_error(self) -> Option<E> {
        match self {
            Self::Item { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Error, Debug, PartialEq)]
    #[error("bad item {0}")]
    struct BadItem(u32);

    #[test]
    fn test_item_error_display_and_source() {
        let err: BatchError<BadItem> = BatchError::Item {
            index: 1,
            source: BadItem(2),
            failed: 3,
        };

        assert_eq!(
            err.to_string(),
            "item 1 failed (3 failed in total): bad item 2"
        );
        assert_eq!(err.source().map(|s| s.to_string()), Some("bad item 2".into()));
        assert_eq!(err.item_index(), Some(1));
        assert!(err.is_item_failure());
        assert_eq!(err.failed_count(), Some(3));
        assert_eq!(err.into_item_error(), Some(BadItem(2)));
    }

    #[test]
    fn test_config_error_converts() {
        let err: BatchError<BadItem> = ConfigError::InvalidConcurrency(0).into();

        assert!(matches!(
            err,
            BatchError::Config(ConfigError::InvalidConcurrency(0))
        ));
        assert_eq!(err.item_index(), None);
        assert!(!err.is_item_failure());
    }

    #[test]
    fn test_load_error_mentions_path() {
        let err = ConfigError::load("/tmp/parbatch.toml", "expected a table");
        assert_eq!(
            err.to_string(),
            "failed to load config from '/tmp/parbatch.toml': expected a table"
        );
    }

    #[test]
    fn test_panicked_error_carries_total() {
        let err: BatchError<BadItem> = BatchError::Panicked {
            index: 0,
            message: "boom".into(),
            failed: 2,
        };
        assert_eq!(
            err.to_string(),
            "unit for item 0 panicked (2 failed in total): boom"
        );
        assert_eq!(err.failed_count(), Some(2));
        assert!(!err.is_item_failure());
    }

    #[test]
    fn test_progress_error_keeps_cause() {
        let err: BatchError<BadItem> = BatchError::Progress(anyhow::anyhow!("sink closed"));
        assert_eq!(err.to_string(), "progress reporter failed: sink closed");
        assert!(err.into_item_error().is_none());
    }
}
