//! Database schema definitions
//!
//! This module contains the SQL schema for the response cache.

/// SQL schema for the database
///
/// `url` is indexed but deliberately not unique: lookups return the newest
/// row for a URL.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    encoding TEXT NOT NULL,
    headers TEXT NOT NULL,
    date TEXT,
    body TEXT NOT NULL,
    stored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_url ON pages(url);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
