//! Persisting pipeline
//!
//! Every record produced by the crawl ends here. Pages fetched over the
//! network are written to the store; pages replayed from the store are
//! skipped so a run never duplicates what it read.

use crate::crawler::replayed::ReplayedUrls;
use crate::record::ResponseRecord;
use crate::storage::{ConnectionPool, Storage};
use crate::CrawlError;
use std::sync::Arc;

/// What the pipeline did with a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The URL was replayed from the store this run
    Skipped,

    /// Inserted with the given row id
    Stored(i64),
}

pub struct PersistingPipeline<S> {
    pool: Arc<ConnectionPool<S>>,
    replayed: Arc<ReplayedUrls>,
}

impl<S: Storage> PersistingPipeline<S> {
    pub fn new(pool: Arc<ConnectionPool<S>>, replayed: Arc<ReplayedUrls>) -> Self {
        Self { pool, replayed }
    }

    /// Stores a record unless its URL was replayed
    ///
    /// # Arguments
    ///
    /// * `record` - The record to persist
    ///
    /// # Returns
    ///
    /// The outcome, or the store error. A failed insert leaves no partial row.
    pub async fn process_item(&self, record: &ResponseRecord) -> Result<PersistOutcome, CrawlError> {
        if self.replayed.contains(&record.url) {
            tracing::debug!("URL '{}' was replayed from the store; not storing", record.url);
            return Ok(PersistOutcome::Skipped);
        }

        let row = record.to_row()?;
        let mut conn = self.pool.acquire().await?;
        match conn.insert(&row) {
            Ok(id) => {
                tracing::debug!("Stored URL '{}' as page {}", record.url, id);
                Ok(PersistOutcome::Stored(id))
            }
            Err(e) => {
                tracing::warn!("Failed to store URL '{}': {}", record.url, e);
                Err(e.into())
            }
        }
    }
}
