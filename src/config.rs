use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::debouncer::{DEFAULT_DEDUP_CAPACITY, DEFAULT_SETTLE_DELAY};
use crate::error::ConfigError;
use crate::watcher::WatchOptions;

/// Get the app data directory: <config dir>/folder-sorter/
pub fn app_data_dir() -> PathBuf {
    let dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("folder-sorter");
    fs::create_dir_all(&dir).ok();
    dir
}

pub const CONFIG_FILE: &str = "config.json";
pub const DATABASE_FILE: &str = "app_data.db";

// ── Data types ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Re-watch the stored folders when the service starts
    pub auto_start: bool,
    /// Desktop notifications on moves (read by the presentation layer)
    pub show_notifications: bool,
    /// Sweep pre-existing files when a folder starts being watched
    pub auto_organize_on_start: bool,
    /// Seconds between status refreshes of the presentation layer
    pub check_interval: f64,
    /// Folders watched when the service last ran
    pub last_folders: Vec<String>,
    /// Wait after a file is created before moving it
    pub settle_delay_ms: u64,
    /// Processed paths remembered before the dedup set is reset
    pub dedup_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_start: true,
            show_notifications: true,
            auto_organize_on_start: true,
            check_interval: 1.0,
            last_folders: Vec::new(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
        }
    }
}

impl Settings {
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            dedup_capacity: self.dedup_capacity,
            initial_sweep: self.auto_organize_on_start,
        }
    }

    /// Set one field from its textual form. Returns an error message naming
    /// the problem for unknown keys or unparsable values.
    pub fn set_from_str(&mut self, key: &str, value: &str) -> Result<(), String> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
            value
                .parse()
                .map_err(|_| format!("Invalid value '{}' for {}", value, key))
        }

        match key {
            "auto_start" => self.auto_start = parse(key, value)?,
            "show_notifications" => self.show_notifications = parse(key, value)?,
            "auto_organize_on_start" => self.auto_organize_on_start = parse(key, value)?,
            "check_interval" => {
                let secs: f64 = parse(key, value)?;
                if !secs.is_finite() || secs <= 0.0 {
                    return Err(format!("check_interval must be positive, got {}", value));
                }
                self.check_interval = secs;
            }
            "settle_delay_ms" => self.settle_delay_ms = parse(key, value)?,
            "dedup_capacity" => self.dedup_capacity = parse(key, value)?,
            "last_folders" => {
                self.last_folders = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
            }
            _ => return Err(format!("Unknown setting '{}'", key)),
        }
        Ok(())
    }
}

// ── Load / Save ─────────────────────────────────────────────

/// Parse the settings file. A leading UTF-8 BOM, as left by some Windows
/// editors, is ignored.
pub fn read_settings(path: &Path) -> Result<Settings, ConfigError> {
    let raw = fs::read_to_string(path)?;
    let text = raw.strip_prefix('\u{FEFF}').unwrap_or(&raw);
    Ok(serde_json::from_str(text)?)
}

/// Missing or unreadable file -> defaults. Never fails.
pub fn load_settings(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    read_settings(path).unwrap_or_else(|e| {
        log::debug!("Ignoring settings file {}: {}", path.display(), e);
        Settings::default()
    })
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}

/// Settings bound to their file; every mutation is written back.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = load_settings(&path);
        Self { path, settings }
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn update(&mut self, f: impl FnOnce(&mut Settings)) -> Result<(), ConfigError> {
        f(&mut self.settings);
        save_settings(&self.path, &self.settings)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut next = self.settings.clone();
        next.set_from_str(key, value).map_err(ConfigError::Invalid)?;
        self.update(|s| *s = next)
    }
}
