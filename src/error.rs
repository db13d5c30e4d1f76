use std::io;
use std::path::PathBuf;

/// Failure while organizing a single file or sweeping a directory.
#[derive(Debug, thiserror::Error)]
pub enum OrganizeError {
    #[error("{} no longer exists", path.display())]
    NotFound { path: PathBuf },

    #[error("permission denied for {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("no free name for {} after {attempts} attempts", path.display())]
    NameCollisionExhausted { path: PathBuf, attempts: u32 },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OrganizeError {
    /// Sort an `io::Error` into the taxonomy, keeping the offending path.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Failure of the durable store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database writer is not running")]
    WriterUnavailable,
}

/// Folder lifecycle misuse or notification failure.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("{} is already being watched", .0.display())]
    AlreadyWatched(PathBuf),

    #[error("{} is not being watched", .0.display())]
    NotWatched(PathBuf),

    #[error("{} does not exist or is not a directory", .0.display())]
    MissingFolder(PathBuf),

    #[error("the watcher has been stopped")]
    EngineStopped,

    #[error("failed to subscribe to {}: {source}", path.display())]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Failure loading, saving or changing the settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}")]
    Invalid(String),

    #[error("settings file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("settings JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
}
