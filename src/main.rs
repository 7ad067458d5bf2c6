use anyhow::Result;
use clap::{CommandFactory, Parser};
use nexdirect::{
    app::{config::Config, prompt::TerminalPrompter, state::AppState},
    cli::{self, Cli},
    file::manager::{FileManager, STALE_TEMP_AGE},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first to get verbose flag
    let cli = Cli::parse();

    // Set config directory override before anything resolves paths
    if let Some(ref config_dir) = cli.config {
        nexdirect::util::paths::set_config_dir_override(Some(config_dir.clone()));
    }

    let logs_dir = nexdirect::util::paths::get_logs_dir().unwrap_or_else(|_| PathBuf::from("."));
    std::fs::create_dir_all(&logs_dir).ok();

    // Daily rotating JSON log file
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "app.jsonl");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let log_level = if cli.verbose {
        tracing::Level::TRACE
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(tracing_subscriber::filter::LevelFilter::from_level(log_level)),
        )
        .init();

    tracing::info!("Starting NexDirect {}", env!("CARGO_PKG_VERSION"));
    if let Some(ref config_dir) = cli.config {
        tracing::info!("Using config directory override: {:?}", config_dir);
    }
    tracing::trace!("CLI arguments: {:?}", cli);

    let config = Config::load().unwrap_or_else(|e| {
        tracing::error!("Failed to load config, using defaults: {:#}", e);
        Config::default()
    });
    tracing::info!(backend = %config.general.backend, "Config loaded");

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let work_dir = config.work_dir();
    let file_manager = FileManager::new();
    if let Err(e) = file_manager.ensure_directory(&work_dir) {
        tracing::warn!("Could not create work directory {:?}: {}", work_dir, e);
    }
    // Leftovers from a run that was killed mid-transfer
    for dir in config.temp_dirs() {
        file_manager.sweep_stale_temps(&dir, STALE_TEMP_AGE);
    }

    let prompter = Arc::new(TerminalPrompter::new(cli.yes));
    let state = AppState::new(config, prompter)?;

    let exit_code = cli::handler::handle_command(command, state).await;
    tracing::info!(exit_code, "Exiting");
    drop(_guard);
    std::process::exit(exit_code);
}
