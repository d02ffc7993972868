//! `parbatch run`: execute a synthetic batch

use anyhow::Context;
use parbatch_core::{BatchError, Executor, ExecutorBuilder, ExecutorConfig, load_config};
use std::sync::Arc;

use crate::args::{OutputMode, RunArgs};
use crate::console::CliConsole;
use crate::reporters::{BarReporter, JsonReporter, LineReporter, default_output_mode};
use crate::workload::{SyntheticFailure, Workload};

/// Resolve the configuration: file, then environment, then command-line flags
pub fn resolve_config(args: &RunArgs) -> anyhow::Result<ExecutorConfig> {
    let mut config = load_config(Some(args.config.as_path())).with_context(|| {
        format!("Failed to load configuration from {}", args.config.display())
    })?;
    if let Some(max) = args.concurrency {
        config.max_concurrency = max;
    }
    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    config.validate()?;
    tracing::debug!(
        max_concurrency = config.max_concurrency,
        interval_ms = config.interval.as_millis() as u64,
        "resolved run configuration"
    );
    Ok(config)
}

fn build_executor(
    args: &RunArgs,
    config: ExecutorConfig,
    mode: OutputMode,
) -> anyhow::Result<Executor> {
    let builder = ExecutorBuilder::new().with_config(config);
    let builder = match mode {
        OutputMode::Bar => builder.with_reporter(BarReporter::new(args.items)?),
        OutputMode::Lines => builder.with_reporter(LineReporter),
        OutputMode::Json => builder.with_reporter(JsonReporter),
        OutputMode::Quiet => builder,
    };
    Ok(builder.build()?)
}

pub async fn execute(args: RunArgs, verbose: bool) -> anyhow::Result<()> {
    let console = CliConsole::new(verbose);
    let config = resolve_config(&args)?;
    let mode = args.output.unwrap_or_else(default_output_mode);

    console.info(&format!(
        "Running {} items with max concurrency {} (interval {})",
        args.items,
        config.max_concurrency,
        humantime::format_duration(config.interval)
    ));

    let executor = build_executor(&args, config, mode)?;
    let workload = Arc::new(Workload::new(args.delay, args.jitter, args.fail.iter().copied()));

    let result = executor
        .run(0..args.items, move |index| {
            let workload = workload.clone();
            async move { workload.process(index).await }
        })
        .await;

    let summary = executor.last_stats();
    let outputs = match result {
        Ok(outputs) => outputs,
        Err(e) => {
            if mode != OutputMode::Json {
                console.error(&describe_failure(&e));
                if let Some(stats) = &summary {
                    console.warn(&stats.to_string());
                }
            }
            return Err(e.into());
        }
    };

    if mode == OutputMode::Json {
        if let Some(stats) = &summary {
            println!("{}", serde_json::to_string(stats)?);
        }
    } else {
        if let Some(stats) = &summary {
            console.success(&stats.to_string());
        }
        let checksum: usize = outputs.iter().sum();
        console.info(&format!("Sum of outputs: {checksum}"));
    }

    Ok(())
}

fn describe_failure(error: &BatchError<SyntheticFailure>) -> String {
    match (error.item_index(), error.failed_count()) {
        (Some(index), Some(failed)) if failed > 1 => {
            format!("Batch failed: item {index} and {} more failed", failed - 1)
        }
        _ => format!("Batch failed: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn args(config: PathBuf) -> RunArgs {
        RunArgs {
            items: 6,
            concurrency: None,
            interval: None,
            delay: Duration::from_millis(5),
            jitter: Duration::ZERO,
            fail: Vec::new(),
            config,
            output: Some(OutputMode::Quiet),
        }
    }

    #[test]
    fn test_flags_override_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("parbatch.toml");
        std::fs::write(&path, "max_concurrency = 4\ninterval = \"2s\"\n").unwrap();

        let mut run_args = args(path);
        assert_eq!(resolve_config(&run_args).unwrap().max_concurrency, 4);

        run_args.concurrency = Some(2);
        run_args.interval = Some(Duration::from_millis(300));
        let config = resolve_config(&run_args).unwrap();
        assert_eq!(config, ExecutorConfig::new(2, Duration::from_millis(300)));
    }

    #[test]
    fn test_zero_concurrency_flag_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut run_args = args(temp_dir.path().join("absent.toml"));
        run_args.concurrency = Some(0);
        assert!(resolve_config(&run_args).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_reports_failure() {
        let temp_dir = TempDir::new().unwrap();
        let mut run_args = args(temp_dir.path().join("absent.toml"));
        run_args.fail = vec![1, 4];

        let err = execute(run_args, false).await.unwrap_err();
        let batch = err.downcast_ref::<BatchError<SyntheticFailure>>().unwrap();
        assert_eq!(batch.item_index(), Some(1));
        assert_eq!(
            describe_failure(batch),
            "Batch failed: item 1 and 1 more failed"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_succeeds_quietly() {
        let temp_dir = TempDir::new().unwrap();
        execute(args(temp_dir.path().join("absent.toml")), false)
            .await
            .unwrap();
    }
}
