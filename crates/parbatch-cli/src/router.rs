//! Command routing logic for CLI

use crate::args::{Cli, Commands, ConfigAction};
use crate::commands;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => commands::run::execute(args, cli.verbose).await,
        Commands::Config { action } => match action {
            ConfigAction::Show { config } => commands::config::show(&config),
            ConfigAction::Validate { config } => commands::config::validate(&config),
            ConfigAction::Init { path, force } => commands::config::init(&path, force),
        },
    }
}
