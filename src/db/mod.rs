use rusqlite::{Connection, Result};
use std::path::Path;
use std::time::Duration;

/// One SQLite connection plus the table operations.
///
/// The writer thread in `recorder` owns exactly one of these for all
/// mutations; readers open their own short-lived instance.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let db = Self { conn };
        db.init_tables()?;
        Ok(db)
    }

    fn init_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS monitored_folders (
                id      INTEGER PRIMARY KEY,
                path    TEXT UNIQUE,
                active  BOOLEAN
            );

            CREATE TABLE IF NOT EXISTS logs (
                id          INTEGER PRIMARY KEY,
                timestamp   TEXT,
                action      TEXT,
                details     TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs(timestamp);
            ",
        )?;
        Ok(())
    }
}

// ── Sub-modules ─────────────────────────────────────────────

mod activity;
mod folders;
mod models;

// ── Re-exports ──────────────────────────────────────────────

pub use activity::TIMESTAMP_FORMAT;
pub use models::{ActivityLogEntry, WatchedFolder};
