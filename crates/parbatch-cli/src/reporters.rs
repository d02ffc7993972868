//! Terminal progress reporters

use async_trait::async_trait;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use parbatch_core::{ProgressReporter, ProgressSnapshot};
use std::io::Write;

use crate::args::OutputMode;

/// Pick the output mode when none was requested
pub fn default_output_mode() -> OutputMode {
    if console::Term::stdout().is_term() {
        OutputMode::Bar
    } else {
        OutputMode::Lines
    }
}

/// Renders snapshots on an indicatif progress bar
pub struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    pub fn new(total: usize) -> anyhow::Result<Self> {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.blue} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
                .progress_chars("█▓░"),
        );
        Ok(Self { bar })
    }
}

#[async_trait]
impl ProgressReporter for BarReporter {
    async fn report(&self, progress: ProgressSnapshot) -> anyhow::Result<()> {
        self.bar.set_position(progress.completed as u64);
        self.bar.set_message(format!("{:.0}%", progress.percent()));
        if progress.is_complete() {
            self.bar.finish_with_message("done");
        } else {
            self.bar.tick();
        }
        Ok(())
    }
}

/// Writes one colored line per snapshot to stdout
#[derive(Default)]
pub struct LineReporter;

pub(crate) fn format_line(progress: &ProgressSnapshot) -> String {
    let counts = format!("{}/{}", progress.completed, progress.total);
    let counts = if progress.is_complete() {
        counts.green().bold()
    } else {
        counts.yellow()
    };
    format!(
        "{} {} {} {}",
        "▸".blue(),
        counts,
        format!("({:.1}%)", progress.percent()).dimmed(),
        format!("{:.2}s", progress.elapsed.as_secs_f64()).dimmed()
    )
}

#[async_trait]
impl ProgressReporter for LineReporter {
    async fn report(&self, progress: ProgressSnapshot) -> anyhow::Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", format_line(&progress))?;
        Ok(())
    }
}

/// Writes one JSON object per snapshot to stdout
#[derive(Default)]
pub struct JsonReporter;

#[async_trait]
impl ProgressReporter for JsonReporter {
    async fn report(&self, progress: ProgressSnapshot) -> anyhow::Result<()> {
        let line = serde_json::to_string(&progress)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_line_contains_counts() {
        colored::control::set_override(false);
        let line = format_line(&ProgressSnapshot::new(2, 8, Duration::from_millis(1500)));
        assert_eq!(line, "▸ 2/8 (25.0%) 1.50s");
    }

    #[tokio::test]
    async fn test_bar_reporter_finishes() {
        let reporter = BarReporter::new(4).unwrap();
        reporter
            .report(ProgressSnapshot::new(4, 4, Duration::ZERO))
            .await
            .unwrap();
        assert!(reporter.bar.is_finished());
        assert_eq!(reporter.bar.position(), 4);
    }
}
