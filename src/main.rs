use anyhow::{Context, Result};
use clap::Parser;

use folder_sorter_lib::cli::{self, Cli, Command};
use folder_sorter_lib::commands::{self, AppState};
use folder_sorter_lib::logging;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir();
    logging::init(&data_dir).with_context(|| {
        format!(
            "Failed to open log file {}",
            logging::log_file_path(&data_dir).display()
        )
    })?;

    let state = AppState::open(&data_dir)?;

    let result = match &cli.command {
        Command::Watch { paths } => watch(&state, paths),
        other => cli::run_command(&state, other),
    };

    state.recorder.shutdown();
    result
}

fn watch(state: &AppState, paths: &[std::path::PathBuf]) -> Result<()> {
    let folders = commands::startup_folders(state, paths)?;
    if folders.is_empty() {
        log::warn!("No folders to watch; add one with `folder-sorter add <DIR>`");
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {}", e);
            }
            log::info!("Shutting down");
        };
        commands::run_watch_service(state, &folders, shutdown).await
    })?;
    Ok(())
}
