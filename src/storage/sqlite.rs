//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::PageRow;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

const PAGE_COLUMNS: &str = "id, url, status, encoding, headers, date, body";

/// SQLite storage backend; one value is one connection
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `busy_timeout` - How long to wait on a database locked by another
    ///   pooled connection before failing
    pub fn new(path: &Path, busy_timeout: Duration) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        conn.busy_timeout(busy_timeout)?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Opens an existing database for reading only
    ///
    /// Fails if nothing exists at `path`; the file and its schema are never
    /// created or changed.
    pub fn open_read_only(path: &Path, busy_timeout: Duration) -> StorageResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(busy_timeout)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl Storage for SqliteStorage {
    fn lookup(&self, url: &str) -> StorageResult<Option<PageRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM pages WHERE url = ?1 ORDER BY id DESC LIMIT 1",
            PAGE_COLUMNS
        ))?;

        let page = stmt.query_row(params![url], page_from_row).optional()?;
        Ok(page)
    }

    fn insert(&mut self, page: &PageRow) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let date = page.date.map(|d| d.to_rfc3339());

        // Dropping the transaction without commit rolls it back
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO pages (url, status, encoding, headers, date, body, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                page.url,
                page.status,
                page.encoding,
                page.headers,
                date,
                page.body,
                now
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(id)
    }

    fn get_page(&self, id: i64) -> StorageResult<PageRow> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM pages WHERE id = ?1", PAGE_COLUMNS))?;

        stmt.query_row(params![id], page_from_row)
            .optional()?
            .ok_or(StorageError::RecordNotFound(id))
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_distinct_urls(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT url) FROM pages", [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRow> {
    let date = row
        .get::<_, Option<String>>(5)?
        .map(|text| {
            DateTime::parse_from_rfc3339(&text)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))
        })
        .transpose()?;

    Ok(PageRow {
        id: Some(row.get(0)?),
        url: row.get(1)?,
        status: row.get(2)?,
        encoding: row.get(3)?,
        headers: row.get(4)?,
        date,
        body: row.get(6)?,
    })
}
