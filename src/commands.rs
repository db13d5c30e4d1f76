use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};

use crate::config::{self, Settings, SettingsStore};
use crate::db::{ActivityLogEntry, WatchedFolder};
use crate::organizer::{Organizer, SweepReport};
use crate::recorder::ActivityRecorder;
use crate::source::EventSource;
use crate::stats::{self, Statistics};
use crate::watcher::WatchRegistry;

/// Everything a front end needs, wired once at startup and passed around.
pub struct AppState {
    pub settings: Mutex<SettingsStore>,
    pub recorder: ActivityRecorder,
    pub registry: Arc<WatchRegistry>,
}

impl AppState {
    /// Open settings and database under `data_dir`, watching through the OS.
    pub fn open(data_dir: &Path) -> Result<Self> {
        Self::open_with_source(data_dir, None)
    }

    pub fn open_with_source(data_dir: &Path, source: Option<Arc<dyn EventSource>>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let settings = SettingsStore::load(data_dir.join(config::CONFIG_FILE));
        let recorder = ActivityRecorder::open(data_dir.join(config::DATABASE_FILE))
            .context("Failed to initialize database")?;

        let organizer = Organizer::new(recorder.clone());
        let options = settings.get().watch_options();
        let registry = match source {
            Some(source) => WatchRegistry::new(organizer, source, options),
            None => WatchRegistry::with_notify(organizer, options),
        };

        Ok(Self {
            settings: Mutex::new(settings),
            recorder,
            registry: Arc::new(registry),
        })
    }

    fn lock_settings(&self) -> Result<std::sync::MutexGuard<'_, SettingsStore>> {
        self.settings
            .lock()
            .map_err(|e| anyhow::anyhow!("Settings lock poisoned: {}", e))
    }
}

// ── Config Commands ─────────────────────────────────────────

pub fn get_settings(state: &AppState) -> Result<Settings> {
    Ok(state.lock_settings()?.get().clone())
}

pub fn set_setting(state: &AppState, key: &str, value: &str) -> Result<Settings> {
    let mut store = state.lock_settings()?;
    store.set(key, value)?;
    Ok(store.get().clone())
}

// ── Folder Commands ─────────────────────────────────────────

pub fn get_watched_folders(state: &AppState) -> Result<Vec<WatchedFolder>> {
    Ok(state.recorder.list_active_folders()?)
}

/// Persist a folder. Adding a folder twice returns the existing id.
pub fn add_watched_folder(state: &AppState, path: &Path) -> Result<i64> {
    if !path.is_dir() {
        bail!("Folder does not exist: {}", path.display());
    }
    let path_str = path.to_string_lossy();
    let id = state.recorder.add_folder(&path_str)?;
    state.recorder.info("Folder added", &path_str);
    Ok(id)
}

/// Delete a folder from the store. Returns its path so callers can stop
/// watching it.
pub fn remove_watched_folder(state: &AppState, folder_id: i64) -> Result<PathBuf> {
    let folder = get_watched_folders(state)?
        .into_iter()
        .find(|f| f.id == folder_id)
        .with_context(|| format!("No watched folder with id {}", folder_id))?;

    if !state.recorder.remove_folder(folder_id)? {
        bail!("No watched folder with id {}", folder_id);
    }
    state.recorder.info("Folder removed", &folder.path);
    Ok(PathBuf::from(folder.path))
}

// ── Organize / Log Commands ─────────────────────────────────

pub fn organize_now(state: &AppState, dir: &Path) -> Result<SweepReport> {
    Ok(state.registry.organizer().organize_directory(dir)?)
}

pub fn get_activity_log(state: &AppState, limit: u32) -> Result<Vec<ActivityLogEntry>> {
    Ok(state.recorder.query(limit)?)
}

pub fn clear_activity_log(state: &AppState) -> Result<usize> {
    Ok(state.recorder.clear()?)
}

pub fn get_statistics(state: &AppState) -> Result<Statistics> {
    let folders: Vec<PathBuf> = get_watched_folders(state)?
        .into_iter()
        .map(|f| PathBuf::from(f.path))
        .collect();
    Ok(stats::folder_statistics(&folders))
}

// ── Watcher Commands ────────────────────────────────────────

/// Folders the service should watch on startup: the stored active folders
/// when `auto_start` is set, then `extra` (which are added to the store).
pub fn startup_folders(state: &AppState, extra: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    if get_settings(state)?.auto_start {
        folders.extend(get_watched_folders(state)?.into_iter().map(|f| PathBuf::from(f.path)));
    }
    for path in extra {
        add_watched_folder(state, path)?;
        if !folders.contains(path) {
            folders.push(path.clone());
        }
    }
    Ok(folders)
}

/// Start the engine, watch `folders`, remember them as `last_folders`, and
/// keep going until `shutdown` resolves. Returns how many folders were watched.
pub async fn run_watch_service(
    state: &AppState,
    folders: &[PathBuf],
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<usize> {
    state.registry.start();

    for folder in folders {
        state.registry.start_watching(folder).await;
    }

    let watched = state.registry.watched_folders();
    state.lock_settings()?.update(|s| {
        s.last_folders = watched.iter().map(|p| p.to_string_lossy().into_owned()).collect();
    })?;
    log::info!("Watching {} folder(s)", watched.len());

    shutdown.await;
    state.registry.stop().await;
    Ok(watched.len())
}
