//! Configuration management commands

use anyhow::{Context, bail};
use parbatch_core::config::{ExecutorConfig, expand_path, load_config, load_from_file};
use std::fs;
use std::path::Path;

use crate::console::CliConsole;

/// Show the effective configuration
pub fn show(config_file: &Path) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration");

    if expand_path(config_file).exists() {
        console.success(&format!("Loaded configuration from: {}", config_file.display()));
    } else {
        console.warn(&format!(
            "Configuration file not found: {}",
            config_file.display()
        ));
        console.info("Using default configuration");
    }

    let config = load_config(Some(config_file))?;
    print_config(&console, &config);
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}

/// Validate a configuration file
pub fn validate(config_file: &Path) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration Validation");

    if !expand_path(config_file).exists() {
        bail!("Configuration file not found: {}", config_file.display());
    }

    let config = load_from_file(config_file)?;
    match config.validate() {
        Ok(()) => {
            console.success("Configuration is valid");
            print_config(&console, &config);
            Ok(())
        }
        Err(e) => {
            console.error(&format!("Configuration is invalid: {e}"));
            Err(e.into())
        }
    }
}

/// Write the default configuration to `path`
pub fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    let path = expand_path(path);

    if path.exists() && !force {
        bail!(
            "Configuration file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    let content = ExecutorConfig::default().to_toml()?;
    fs::write(&path, content)
        .with_context(|| format!("Failed to write configuration to {}", path.display()))?;

    console.success(&format!("Created configuration file: {}", path.display()));
    Ok(())
}

fn print_config(console: &CliConsole, config: &ExecutorConfig) {
    console.print_field("max_concurrency", config.max_concurrency);
    console.print_field("interval", humantime::format_duration(config.interval));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("parbatch.toml");

        init(&path, false).unwrap();
        assert_eq!(load_from_file(&path).unwrap(), ExecutorConfig::default());
    }

    #[test]
    fn test_init_refuses_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("parbatch.toml");
        fs::write(&path, "max_concurrency = 2\n").unwrap();

        assert!(init(&path, false).is_err());
        init(&path, true).unwrap();
        assert_eq!(load_from_file(&path).unwrap().max_concurrency, 10);
    }

    #[test]
    fn test_validate_reports_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("parbatch.toml");
        fs::write(&path, "max_concurrency = 0\n").unwrap();

        assert!(validate(&path).is_err());
        assert!(validate(&temp_dir.path().join("missing.toml")).is_err());
    }
}
