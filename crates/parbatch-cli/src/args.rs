//! CLI argument definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Default configuration file name used across all CLI commands.
pub const DEFAULT_CONFIG_FILE: &str = "parbatch.toml";

#[derive(Parser)]
#[command(name = "parbatch")]
#[command(about = "Run batches of async work with bounded concurrency")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a synthetic batch and report progress
    Run(RunArgs),

    /// Manage configuration files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Clone, Debug)]
pub struct RunArgs {
    /// Number of synthetic items to process
    #[arg(long, short = 'n', default_value_t = 50)]
    pub items: usize,

    /// Maximum items in flight (overrides config file and environment)
    #[arg(long, short = 'c')]
    pub concurrency: Option<usize>,

    /// Progress polling interval, e.g. 250ms (overrides config file and environment)
    #[arg(long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Simulated work per item
    #[arg(long, value_parser = parse_duration, default_value = "50ms")]
    pub delay: Duration,

    /// Extra per-item delay, spread deterministically across items
    #[arg(long, value_parser = parse_duration, default_value = "0ms")]
    pub jitter: Duration,

    /// Indices of items that should fail
    #[arg(long, value_delimiter = ',')]
    pub fail: Vec<usize>,

    /// Path to configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// How progress is displayed
    #[arg(long, value_enum)]
    pub output: Option<OutputMode>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// Interactive progress bar
    Bar,
    /// One colored line per tick
    Lines,
    /// One JSON object per tick
    Json,
    /// No progress output
    Quiet,
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Display the effective configuration (file, then environment)
    Show {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },

    /// Validate configuration file for errors
    Validate {
        /// Path to configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },

    /// Create a new configuration file with defaults
    Init {
        /// Path for the new configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_duration(raw: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(raw)
}
