//! Durable activity log and folder store behind a single writer thread.
//!
//! Every mutation of the SQLite file is sent as a [`Command`] to one
//! `activity-writer` thread that owns the only writing connection, so
//! concurrent callers can never interleave writes. `record` is fire-and-forget;
//! the folder operations wait for the writer's reply. Reads open their own
//! short-lived connection.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::db::{ActivityLogEntry, Database, WatchedFolder};
use crate::error::StorageError;

type Reply<T> = Sender<Result<T, StorageError>>;

enum Command {
    Log { action: String, details: String },
    AddFolder { path: String, reply: Reply<i64> },
    RemoveFolder { id: i64, reply: Reply<bool> },
    SetFolderActive { id: i64, active: bool, reply: Reply<bool> },
    ClearLogs { reply: Reply<usize> },
    Flush { reply: Reply<()> },
    Shutdown,
}

#[derive(Clone)]
pub struct ActivityRecorder {
    tx: Sender<Command>,
    db_path: Arc<PathBuf>,
    writer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for ActivityRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityRecorder")
            .field("db_path", &self.db_path)
            .finish()
    }
}

impl ActivityRecorder {
    /// Open (creating if needed) the database at `db_path` and start the writer.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let db_path = db_path.into();
        let db = Database::open(&db_path)?;

        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("activity-writer".to_string())
            .spawn(move || run_writer(db, rx))
            .map_err(|e| {
                log::error!("Failed to spawn database writer: {}", e);
                StorageError::WriterUnavailable
            })?;

        Ok(Self {
            tx,
            db_path: Arc::new(db_path),
            writer: Arc::new(Mutex::new(Some(handle))),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // ── Activity log ────────────────────────────────────────

    /// Queue a log row. Never blocks on the database.
    pub fn record(&self, action: &str, details: &str) {
        let cmd = Command::Log {
            action: action.to_string(),
            details: details.to_string(),
        };
        if self.tx.send(cmd).is_err() {
            log::error!("Activity record dropped (writer stopped): {}: {}", action, details);
        }
    }

    pub fn info(&self, action: &str, details: &str) {
        log::info!("{}: {}", action, details);
        self.record(action, details);
    }

    pub fn warning(&self, action: &str, details: &str) {
        log::warn!("{}: {}", action, details);
        self.record(&format!("WARNING - {}", action), details);
    }

    pub fn error(&self, action: &str, details: &str) {
        log::error!("{}: {}", action, details);
        self.record(&format!("ERROR - {}", action), details);
    }

    /// Most recent entries first, at most `limit`. Waits for previously
    /// queued records so callers read their own writes.
    pub fn query(&self, limit: u32) -> Result<Vec<ActivityLogEntry>, StorageError> {
        if let Err(e) = self.flush() {
            log::warn!("Reading activity log without flushing: {}", e);
        }
        let db = Database::open(&self.db_path)?;
        Ok(db.get_logs(limit)?)
    }

    pub fn clear(&self) -> Result<usize, StorageError> {
        self.request(|reply| Command::ClearLogs { reply })
    }

    /// Block until every command queued before this call has been applied.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.request(|reply| Command::Flush { reply })
    }

    // ── Folders ─────────────────────────────────────────────

    pub fn add_folder(&self, path: &str) -> Result<i64, StorageError> {
        let path = path.to_string();
        self.request(|reply| Command::AddFolder { path, reply })
    }

    pub fn remove_folder(&self, id: i64) -> Result<bool, StorageError> {
        self.request(|reply| Command::RemoveFolder { id, reply })
    }

    pub fn set_folder_active(&self, id: i64, active: bool) -> Result<bool, StorageError> {
        self.request(|reply| Command::SetFolderActive { id, active, reply })
    }

    pub fn list_active_folders(&self) -> Result<Vec<WatchedFolder>, StorageError> {
        let db = Database::open(&self.db_path)?;
        Ok(db.list_active_folders()?)
    }

    /// Apply everything queued so far, then stop the writer thread.
    /// Later records are reported on stderr and dropped.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
        let handle = match self.writer.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Database writer panicked");
            }
        }
    }

    fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, StorageError> {
        let (reply, rx) = mpsc::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| StorageError::WriterUnavailable)?;
        rx.recv().map_err(|_| StorageError::WriterUnavailable)?
    }
}

fn run_writer(db: Database, rx: Receiver<Command>) {
    while let Ok(cmd) = rx.recv() {
        match cmd {
            Command::Log { action, details } => {
                if let Err(e) = db.insert_log(&action, &details) {
                    log::error!("Failed to persist activity '{}': {}", action, e);
                }
            }
            Command::AddFolder { path, reply } => {
                let _ = reply.send(db.add_folder(&path).map_err(StorageError::from));
            }
            Command::RemoveFolder { id, reply } => {
                let _ = reply.send(db.remove_folder(id).map_err(StorageError::from));
            }
            Command::SetFolderActive { id, active, reply } => {
                let _ = reply.send(db.set_folder_active(id, active).map_err(StorageError::from));
            }
            Command::ClearLogs { reply } => {
                let _ = reply.send(db.clear_logs().map_err(StorageError::from));
            }
            Command::Flush { reply } => {
                let _ = reply.send(Ok(()));
            }
            Command::Shutdown => break,
        }
    }
    log::debug!("Database writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> (tempfile::TempDir, ActivityRecorder) {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ActivityRecorder::open(dir.path().join("app_data.db")).unwrap();
        (dir, recorder)
    }

    #[test]
    fn test_query_returns_newest_first() {
        let (_dir, recorder) = open();
        for i in 1..=5 {
            recorder.record(&format!("write {}", i), "");
        }

        let logs = recorder.query(2).unwrap();
        let actions: Vec<_> = logs.iter().map(|l| l.action.as_str()).collect();
        assert_eq!(actions, vec!["write 5", "write 4"]);
    }

    #[test]
    fn test_severity_prefixes() {
        let (_dir, recorder) = open();
        recorder.info("File moved", "a -> b");
        recorder.warning("Folder already watched", "/x");
        recorder.error("Failed to organize file", "/y");

        let logs = recorder.query(10).unwrap();
        assert_eq!(logs[0].action, "ERROR - Failed to organize file");
        assert_eq!(logs[1].action, "WARNING - Folder already watched");
        assert_eq!(logs[2].action, "File moved");
        assert_eq!(logs[2].details, "a -> b");
    }

    #[test]
    fn test_clear_and_folders() {
        let (_dir, recorder) = open();
        recorder.record("something", "");
        assert_eq!(recorder.clear().unwrap(), 1);
        assert!(recorder.query(10).unwrap().is_empty());

        let id = recorder.add_folder("/tmp/x").unwrap();
        assert_eq!(recorder.add_folder("/tmp/x").unwrap(), id);
        assert_eq!(recorder.list_active_folders().unwrap().len(), 1);
        assert!(recorder.remove_folder(id).unwrap());
        assert!(recorder.list_active_folders().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_writers_are_serialized() {
        let (_dir, recorder) = open();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let recorder = recorder.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        recorder.record("concurrent", &format!("{}-{}", t, i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(recorder.query(1000).unwrap().len(), 100);
    }

    #[test]
    fn test_shutdown_drains_and_rejects() {
        let (_dir, recorder) = open();
        recorder.record("before", "");
        recorder.shutdown();

        recorder.record("after", "");
        assert!(matches!(recorder.add_folder("/x"), Err(StorageError::WriterUnavailable)));

        let db = Database::open(recorder.db_path()).unwrap();
        let logs = db.get_logs(10).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, "before");
    }
}
