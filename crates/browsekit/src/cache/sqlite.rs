//! SQLite cache store

use super::{CacheEntry, CacheKey, CacheStats, CacheStore, RECENT_URLS};
use crate::error::StoreError;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS web_cache (
    id                 TEXT PRIMARY KEY,
    url                TEXT NOT NULL,
    content            TEXT NOT NULL,
    markdown_content   TEXT NOT NULL,
    timestamp          INTEGER NOT NULL,
    prefer_raw         INTEGER NOT NULL DEFAULT 1,
    include_navigation INTEGER NOT NULL DEFAULT 0,
    content_priority   TEXT NOT NULL DEFAULT 'auto'
);
CREATE INDEX IF NOT EXISTS idx_web_cache_url ON web_cache (url);
";

/// Cache persisted in a single SQLite file
///
/// Opening an existing database keeps its contents.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create the database at `path`, creating parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// A private database that disappears with the store
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        debug!(path = ?path, "Opened cache database");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CacheEntry> {
    Ok(CacheEntry {
        url: row.get(0)?,
        raw: row.get(1)?,
        rendered: row.get(2)?,
        timestamp: row.get(3)?,
    })
}

impl CacheStore for SqliteStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                "SELECT url, content, markdown_content, timestamp FROM web_cache WHERE id = ?1",
                params![key.to_string()],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    fn put(
        &self,
        key: &CacheKey,
        raw: &str,
        rendered: &str,
        timestamp: i64,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO web_cache
                 (id, url, content, markdown_content, timestamp,
                  prefer_raw, include_navigation, content_priority)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                 content = excluded.content,
                 markdown_content = excluded.markdown_content,
                 timestamp = excluded.timestamp",
            params![
                key.to_string(),
                key.url,
                raw,
                rendered,
                timestamp,
                key.prefer_raw,
                key.include_navigation,
                key.priority.as_str(),
            ],
        )?;
        Ok(())
    }

    fn entries(&self) -> Result<Vec<CacheEntry>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT url, content, markdown_content, timestamp FROM web_cache
             ORDER BY timestamp DESC, url ASC",
        )?;
        let entries = stmt
            .query_map([], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM web_cache", [])?;
        debug!(removed, "Cleared cache database");
        Ok(removed)
    }

    fn stats(&self) -> Result<CacheStats, StoreError> {
        let conn = self.conn()?;
        let (count, total_size, oldest, newest): (i64, i64, Option<i64>, Option<i64>) = conn
            .query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(LENGTH(CAST(content AS BLOB))
                                   + LENGTH(CAST(markdown_content AS BLOB))), 0),
                        MIN(timestamp),
                        MAX(timestamp)
                 FROM web_cache",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

        let mut stmt =
            conn.prepare("SELECT url FROM web_cache ORDER BY timestamp DESC, url ASC LIMIT ?1")?;
        let recent_urls = stmt
            .query_map(params![RECENT_URLS as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(CacheStats {
            count: count as usize,
            total_size: total_size as u64,
            oldest,
            newest,
            recent_urls,
        })
    }

    fn location(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => ":memory:".to_string(),
        }
    }
}
