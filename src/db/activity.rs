use rusqlite::{params, Result};

use super::models::ActivityLogEntry;
use super::Database;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl Database {
    pub fn insert_log(&self, action: &str, details: &str) -> Result<i64> {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.conn.execute(
            "INSERT INTO logs (timestamp, action, details) VALUES (?1, ?2, ?3)",
            params![timestamp, action, details],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent entries first. Rows written within the same second are
    /// ordered by insertion.
    pub fn get_logs(&self, limit: u32) -> Result<Vec<ActivityLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, action, details
             FROM logs ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(ActivityLogEntry {
                id: row.get(0)?,
                timestamp: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                action: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                details: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    pub fn clear_logs(&self) -> Result<usize> {
        self.conn.execute("DELETE FROM logs", [])
    }

    pub fn count_logs(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
