//! Builder pattern for Executor

use std::sync::Arc;
use std::time::Duration;

use crate::config::ExecutorConfig;
use crate::error::ConfigError;
use crate::executor::Executor;
use crate::progress::{ProgressReporter, SharedReporter};

/// Builder for [`Executor`]
#[derive(Default)]
pub struct ExecutorBuilder {
    config: ExecutorConfig,
    reporter: Option<SharedReporter>,
}

impl ExecutorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.config.max_concurrency = max;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn with_reporter<R: ProgressReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    pub fn with_shared_reporter(mut self, reporter: SharedReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Validate the configuration and build the executor
    pub fn build(self) -> Result<Executor, ConfigError> {
        self.config.validate()?;
        Ok(Executor::from_parts(self.config, self.reporter))
    }
}
