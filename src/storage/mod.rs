//! Storage module for persisting fetched responses
//!
//! This module handles all database operations for the response cache:
//! - SQLite database initialization and schema management
//! - Lookup of the latest stored page for a URL
//! - Transactional inserts of newly fetched pages
//! - A fixed-capacity connection pool with scoped acquisition

mod pool;
mod schema;
mod sqlite;
mod traits;

pub use pool::{ConnectionPool, PooledConnection};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::config::DatabaseConfig;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;

/// Opens a pool of `capacity` SQLite connections to the configured database
///
/// Every connection is opened up front, so an unreachable or unwritable
/// database fails here at startup rather than on the first request.
pub fn open_pool(
    config: &DatabaseConfig,
    capacity: usize,
) -> StorageResult<ConnectionPool<SqliteStorage>> {
    let path = Path::new(&config.path);
    let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
    ConnectionPool::open(capacity, || SqliteStorage::new(path, busy_timeout))
}

/// A page as stored in the database
///
/// This is the textual form of a `ResponseRecord`: headers are kept as
/// JSON text. `id` is assigned by the store on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRow {
    pub id: Option<i64>,
    pub url: String,
    pub status: u16,
    pub encoding: String,
    pub headers: String,
    pub date: Option<DateTime<Utc>>,
    pub body: String,
}
