use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, AppState};
use crate::stats::format_mb;

/// Sort files dropped into watched folders into category subfolders.
#[derive(Parser, Debug)]
#[command(name = "folder-sorter", version, about)]
pub struct Cli {
    /// Directory holding config.json and the activity database
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Watch folders until interrupted (stored folders plus PATHS)
    Watch {
        paths: Vec<PathBuf>,
    },
    /// Organize the files currently in DIR once
    Organize {
        dir: PathBuf,
    },
    /// Add a folder to the watch list
    Add {
        dir: PathBuf,
    },
    /// Remove a folder from the watch list by id
    Remove {
        id: i64,
    },
    /// List watched folders
    Folders,
    /// Show recent activity, newest first
    Logs {
        #[arg(short, long, default_value_t = 100)]
        limit: u32,
    },
    /// Delete all activity records
    ClearLogs,
    /// Space used by each category across watched folders
    Stats,
    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the current settings as JSON
    Show,
    /// Set one setting, e.g. `config set settle_delay_ms 750`
    Set { key: String, value: String },
}

impl Cli {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(crate::config::app_data_dir)
    }
}

/// Run a non-watch command against an opened state.
pub fn run_command(state: &AppState, command: &Command) -> Result<()> {
    match command {
        Command::Watch { .. } => {
            anyhow::bail!("`watch` needs the async runtime; run it through main")
        }
        Command::Organize { dir } => {
            let report = commands::organize_now(state, dir)?;
            println!(
                "{}: {} moved, {} skipped, {} failed",
                dir.display(),
                report.moved,
                report.skipped,
                report.failed.len()
            );
            for failure in &report.failed {
                println!("  {}", failure);
            }
        }
        Command::Add { dir } => {
            let id = commands::add_watched_folder(state, dir)?;
            println!("[{}] {}", id, dir.display());
        }
        Command::Remove { id } => {
            let path = commands::remove_watched_folder(state, *id)?;
            println!("Removed [{}] {}", id, path.display());
        }
        Command::Folders => {
            for folder in commands::get_watched_folders(state)? {
                println!("[{}] {}", folder.id, folder.path);
            }
        }
        Command::Logs { limit } => {
            for entry in commands::get_activity_log(state, *limit)? {
                println!("{}  {}: {}", entry.timestamp, entry.action, entry.details);
            }
        }
        Command::ClearLogs => {
            let removed = commands::clear_activity_log(state)?;
            println!("Deleted {} log entries", removed);
        }
        Command::Stats => {
            let stats = commands::get_statistics(state)?;
            println!("Total: {}", format_mb(stats.total_bytes));
            for usage in &stats.categories {
                println!("  {}: {}", usage.folder_name, format_mb(usage.bytes));
            }
        }
        Command::Config { action } => match action {
            None | Some(ConfigAction::Show) => {
                let settings = commands::get_settings(state)?;
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
            Some(ConfigAction::Set { key, value }) => {
                commands::set_setting(state, key, value)?;
                println!("{} = {}", key, value);
            }
        },
    }
    Ok(())
}
