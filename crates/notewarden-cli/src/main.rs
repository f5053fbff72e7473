mod cli;
mod commands;
mod output;
mod setup;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use notewarden_core::NotewardenConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => NotewardenConfig::load_from_path(path)?,
        None => NotewardenConfig::load()?,
    };

    // Logs go to a file so table and JSON output stay clean.
    let log_dir = config.data_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "notewarden.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .init();

    let core = setup::prepare_core(&config, cli.db_path.clone())?;
    match cli.command {
        Commands::Agent { command } => commands::agent::run(core, command, cli.format).await,
        Commands::Credential { command } => {
            commands::credential::run(core, command, cli.format).await
        }
        Commands::Session { command } => commands::session::run(core, command, cli.format).await,
    }
}
