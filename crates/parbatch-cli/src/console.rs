//! CLI console utilities

use colored::*;

/// CLI console for formatted output
pub struct CliConsole {
    verbose: bool,
}

impl CliConsole {
    /// Create a new CLI console
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.verbose {
            println!("{} {}", "ℹ".blue().bold(), message);
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message.green());
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    }

    /// Print a header
    pub fn print_header(&self, title: &str) {
        println!();
        println!("{}", title.bold().underline());
        println!("{}", "=".repeat(title.len()).dimmed());
    }

    /// Print an aligned key/value line
    pub fn print_field(&self, key: &str, value: impl std::fmt::Display) {
        println!("  {:<18} {}", format!("{key}:").cyan(), value);
    }
}
