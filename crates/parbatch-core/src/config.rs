//! Executor configuration
//!
//! Configuration can be built in code, loaded from a TOML/YAML/JSON file, and
//! overridden from the environment:
//! - `PARBATCH_MAX_CONCURRENCY`: maximum number of units in flight
//! - `PARBATCH_INTERVAL`: progress polling interval (e.g. `250ms`, `2s`)

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default maximum number of units running at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Default progress polling interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Environment variable overriding `max_concurrency`
pub const ENV_MAX_CONCURRENCY: &str = "PARBATCH_MAX_CONCURRENCY";

/// Environment variable overriding `interval`
pub const ENV_INTERVAL: &str = "PARBATCH_INTERVAL";

/// Configuration for a batch executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum number of units running concurrently
    pub max_concurrency: usize,
    /// How often progress is reported while units are outstanding
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl ExecutorConfig {
    pub fn new(max_concurrency: usize, interval: Duration) -> Self {
        Self {
            max_concurrency,
            interval,
        }
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Check invariants that must hold before any work is scheduled
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency < 1 {
            return Err(ConfigError::InvalidConcurrency(self.max_concurrency));
        }
        if self.interval.is_zero() {
            return Err(ConfigError::InvalidInterval);
        }
        Ok(())
    }

    /// Apply `PARBATCH_*` environment overrides on top of this configuration
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides using an arbitrary variable lookup
    pub fn apply_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_CONCURRENCY) {
            self.max_concurrency = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::env(ENV_MAX_CONCURRENCY, format!("{raw:?}: {e}")))?;
        }

        if let Some(raw) = lookup(ENV_INTERVAL) {
            self.interval = humantime::parse_duration(raw.trim())
                .map_err(|e| ConfigError::env(ENV_INTERVAL, format!("{raw:?}: {e}")))?;
        }

        Ok(self)
    }

    /// Serialize as TOML, the format written by `parbatch config init`
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => PathBuf::from(shellexpand::tilde(raw).into_owned()),
        None => path.to_path_buf(),
    }
}

/// Load configuration from a file
///
/// Supports JSON, TOML, and YAML formats based on file extension.
/// Returns default config if file doesn't exist.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<ExecutorConfig, ConfigError> {
    let path = expand_path(path.as_ref());
    if !path.exists() {
        tracing::debug!("config file {} not found, using defaults", path.display());
        return Ok(ExecutorConfig::default());
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| ConfigError::load(&path, format!("Failed to read config file: {e}")))?;

    let config: ExecutorConfig = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content)
            .map_err(|e| ConfigError::load(&path, format!("Failed to parse TOML config: {e}")))?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::load(&path, format!("Failed to parse YAML config: {e}")))?,
        _ => serde_json::from_str(&content)
            .map_err(|e| ConfigError::load(&path, format!("Failed to parse JSON config: {e}")))?,
    };

    tracing::debug!(
        max_concurrency = config.max_concurrency,
        interval_ms = config.interval.as_millis() as u64,
        "loaded config from {}",
        path.display()
    );

    Ok(config)
}

/// Load a file, apply environment overrides, and validate the result
pub fn load_config(path: Option<&Path>) -> Result<ExecutorConfig, ConfigError> {
    let config = match path {
        Some(path) => load_from_file(path)?,
        None => ExecutorConfig::default(),
    };
    let config = config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_concurrency, 10);
        assert_eq!(config.interval, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = ExecutorConfig::default().with_max_concurrency(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidConcurrency(0)));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = ExecutorConfig::default().with_interval(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::InvalidInterval));
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("parbatch.toml");
        fs::write(&path, "max_concurrency = 4\ninterval = \"250ms\"\n").unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config, ExecutorConfig::new(4, Duration::from_millis(250)));
    }

    #[test]
    fn test_load_from_yaml_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("parbatch.yaml");
        fs::write(&path, "max_concurrency: 3\n").unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.max_concurrency, 3);
        assert_eq!(config.interval, DEFAULT_INTERVAL);
    }

    #[test]
    fn test_load_from_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("parbatch.json");
        fs::write(&path, r#"{"max_concurrency": 2, "interval": "2s"}"#).unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config, ExecutorConfig::new(2, Duration::from_secs(2)));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_from_file(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ExecutorConfig::default());
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "max_concurrency = \"many\"").unwrap();

        match load_from_file(&path) {
            Err(ConfigError::Load { path: p, message }) => {
                assert_eq!(p, path);
                assert!(message.contains("TOML"));
            }
            other => panic!("expected load error, got {other:?}"),
        }
    }

    #[test]
    fn test_toml_output_loads_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("roundtrip.toml");
        let config = ExecutorConfig::new(6, Duration::from_millis(1500));
        fs::write(&path, config.to_toml().unwrap()).unwrap();

        assert_eq!(load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_env_overrides() {
        let config = ExecutorConfig::default()
            .apply_overrides_from(lookup(&[
                (ENV_MAX_CONCURRENCY, " 3 "),
                (ENV_INTERVAL, "750ms"),
            ]))
            .unwrap();

        assert_eq!(config, ExecutorConfig::new(3, Duration::from_millis(750)));
    }

    #[test]
    fn test_env_override_invalid_value() {
        let err = ExecutorConfig::default()
            .apply_overrides_from(lookup(&[(ENV_MAX_CONCURRENCY, "lots")]))
            .unwrap_err();

        assert!(matches!(err, ConfigError::Env { ref var, .. } if var == ENV_MAX_CONCURRENCY));
    }

    #[test]
    fn test_env_override_invalid_interval() {
        let err = ExecutorConfig::default()
            .apply_overrides_from(lookup(&[(ENV_INTERVAL, "soon")]))
            .unwrap_err();

        assert!(matches!(err, ConfigError::Env { ref var, .. } if var == ENV_INTERVAL));
    }
}
