//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::PageRow;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record not found: {0}")]
    RecordNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error("Connection pool has no idle connection")]
    PoolEmpty,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// One value of an implementing type is one connection; the connection
/// pool hands them out to one caller at a time, so implementations need to
/// be `Send` but not `Sync`.
pub trait Storage: Send {
    /// Gets the most recently stored page for a URL
    ///
    /// The URL is matched exactly, case and scheme included.
    fn lookup(&self, url: &str) -> StorageResult<Option<PageRow>>;

    /// Inserts a new page
    ///
    /// The insert is atomic: on failure nothing is persisted and the error
    /// is returned.
    ///
    /// # Returns
    ///
    /// The ID assigned to the stored page
    fn insert(&mut self, page: &PageRow) -> StorageResult<i64>;

    /// Gets a page by ID
    fn get_page(&self, id: i64) -> StorageResult<PageRow>;

    /// Gets the total number of stored pages
    fn count_pages(&self) -> StorageResult<u64>;

    /// Gets the number of distinct URLs among stored pages
    fn count_distinct_urls(&self) -> StorageResult<u64>;
}
