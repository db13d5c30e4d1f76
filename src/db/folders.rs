use rusqlite::{params, Result};

use super::models::WatchedFolder;
use super::Database;

impl Database {
    /// Insert-or-ignore on the unique path. Returns the id of the row for
    /// `path`, whether it was just created or already present. A previously
    /// deactivated folder is reactivated.
    pub fn add_folder(&self, path: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO monitored_folders (path, active) VALUES (?1, 1)",
            params![path],
        )?;
        self.conn.execute(
            "UPDATE monitored_folders SET active = 1 WHERE path = ?1 AND active = 0",
            params![path],
        )?;
        self.conn.query_row(
            "SELECT id FROM monitored_folders WHERE path = ?1",
            params![path],
            |row| row.get(0),
        )
    }

    /// Hard delete. Returns false if no such folder existed.
    pub fn remove_folder(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM monitored_folders WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// Soft removal / reactivation. Returns false if no such folder existed.
    pub fn set_folder_active(&self, id: i64, active: bool) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE monitored_folders SET active = ?1 WHERE id = ?2",
            params![active, id],
        )?;
        Ok(affected > 0)
    }

    pub fn list_active_folders(&self) -> Result<Vec<WatchedFolder>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, path, active FROM monitored_folders WHERE active = 1 ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(WatchedFolder {
                id: row.get(0)?,
                path: row.get(1)?,
                active: row.get(2)?,
            })
        })?;

        let mut folders = Vec::new();
        for row in rows {
            folders.push(row?);
        }
        Ok(folders)
    }
}
