//! History of albums enqueued by `blue random`, stored in SQLite.
//!
//! The history keeps `random` from picking the same albums over and over: any
//! album recorded within the last [`history_window`] entries is skipped.

use anyhow::{Context, Result};
use log::trace;
use rusqlite::Connection;
use std::fs;
use std::path::Path;

/// Share of the library that must play before an album may repeat.
pub const HISTORY_PERCENT: usize = 65;

/// Labels of randomly enqueued albums, oldest first.
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// Open (and create, if needed) the history database at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the parent directory cannot be created, the file cannot be
    /// opened, or the schema cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create history directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Rusqlite DB connection refused. DB location: {}", path.display()))?;
        Self::init(conn)
    }

    /// A throwaway store, for tests and dry runs.
    ///
    /// # Errors
    ///
    /// Fails if SQLite cannot create the schema.
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("Failed to open in-memory history")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS random_history (
                id    INTEGER PRIMARY KEY AUTOINCREMENT,
                label TEXT    NOT NULL,
                added INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )",
            (),
        )
        .context("Invalid SQL command when CREATEing random_history TABLE.")?;
        Ok(Self { conn })
    }

    /// The newest `limit` labels, oldest first.
    ///
    /// # Errors
    ///
    /// Fails on SQL errors.
    pub fn recent(&self, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT label FROM random_history ORDER BY id DESC LIMIT (?1)")
            .context("Invalid SQL statement when SELECTing recent history.")?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map([limit], |row| row.get::<_, String>(0))
            .context("Cannot query history.")?;

        let mut labels = Vec::new();
        for label in rows {
            labels.push(label.context("Queried history row failed.")?);
        }
        labels.reverse();
        Ok(labels)
    }

    /// # Errors
    ///
    /// Fails on SQL errors.
    pub fn record(&self, label: &str) -> Result<()> {
        self.conn
            .execute("INSERT INTO random_history (label) VALUES (?1)", [label])
            .with_context(|| format!("Failed to INSERT `{label}` INTO history."))?;
        trace!("Recorded `{label}' in history.");
        Ok(())
    }

    /// Drop everything but the newest `keep` entries. Returns how many were
    /// removed.
    ///
    /// # Errors
    ///
    /// Fails on SQL errors.
    pub fn trim(&self, keep: usize) -> Result<usize> {
        let keep = i64::try_from(keep).unwrap_or(i64::MAX);
        let removed = self
            .conn
            .execute(
                "DELETE FROM random_history WHERE id NOT IN
                    (SELECT id FROM random_history ORDER BY id DESC LIMIT (?1))",
                [keep],
            )
            .context("Failed to trim history.")?;
        trace!("Trimmed {removed} history entries.");
        Ok(removed)
    }

    /// # Errors
    ///
    /// Fails on SQL errors.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM random_history", [], |row| row.get(0))
            .context("Could not count history entries.")?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// # Errors
    ///
    /// Fails on SQL errors.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// How many recent albums block a repeat, for a library of `albums` albums.
///
/// 65 % of the library, but at least one once there is anything to choose
/// between, and none for a library of one.
#[must_use]
pub fn history_window(albums: usize) -> usize {
    if albums <= 1 {
        return 0;
    }
    (albums * HISTORY_PERCENT / 100).max(1)
}
