//! parbatch CLI
//!
//! Drives the bounded parallel executor over a synthetic workload so its
//! scheduling, progress reporting and failure handling can be observed from a
//! terminal.
//!
//! ```bash
//! parbatch run --items 200 --concurrency 8 --delay 40ms --jitter 60ms
//! parbatch run --items 20 --fail 3,11 --output lines
//! parbatch config init --path parbatch.toml
//! ```
//!
//! Set `RUST_LOG=parbatch_core=debug` (or pass `--verbose`) to see executor logs.

mod args;
mod commands;
mod console;
mod reporters;
mod router;
mod workload;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub use args::{Cli, Commands, ConfigAction, OutputMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose when both are present
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    router::route(cli).await
}
