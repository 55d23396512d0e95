//! Crawl statistics
//!
//! [`CrawlStats`] summarizes one run as seen by the driver;
//! [`StoreStatistics`] summarizes what the response store holds across runs.

use crate::storage::Storage;
use crate::CrawlError;
use serde::Serialize;

/// Per-run counters, returned by the crawl driver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    /// URLs served from the store
    pub replayed: u64,

    /// URLs fetched over the network
    pub fetched: u64,

    /// Records written to the store
    pub stored: u64,

    /// Records the pipeline skipped because they were replayed
    pub skipped: u64,

    /// URLs refused because credits ran out or the crawl was closing
    pub aborted: u64,

    /// URLs that failed (invalid URL, network, store or record errors)
    pub failed: u64,

    /// URLs never scheduled because shutdown had already begun
    pub not_scheduled: u64,

    pub credits_used: u64,
    pub credits_threshold: u64,

    /// Why the crawl shut down early, if it did
    pub shutdown_reason: Option<String>,
}

impl CrawlStats {
    /// Logs the summary at info level
    pub fn log_summary(&self) {
        tracing::info!(
            "Crawl finished: {} replayed, {} fetched, {} stored, {} skipped, {} aborted, {} failed, {} not scheduled",
            self.replayed,
            self.fetched,
            self.stored,
            self.skipped,
            self.aborted,
            self.failed,
            self.not_scheduled
        );
        tracing::info!(
            "Credits used: {}/{}",
            self.credits_used,
            self.credits_threshold
        );
        if let Some(reason) = &self.shutdown_reason {
            tracing::warn!("Crawl shut down early: {}", reason);
        }
    }
}

/// Summary of the response store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatistics {
    /// Total stored pages, including repeated fetches of a URL
    pub total_pages: u64,

    /// Number of distinct URLs stored
    pub distinct_urls: u64,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<StoreStatistics, CrawlError> {
    Ok(StoreStatistics {
        total_pages: storage.count_pages()?,
        distinct_urls: storage.count_distinct_urls()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");
    println!("  Stored pages: {}", stats.total_pages);
    println!("  Distinct URLs: {}", stats.distinct_urls);

    let repeats = stats.total_pages.saturating_sub(stats.distinct_urls);
    if repeats > 0 {
        println!("  Repeated fetches: {}", repeats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{PageRow, SqliteStorage};

    fn row(url: &str) -> PageRow {
        PageRow {
            id: None,
            url: url.to_string(),
            status: 200,
            encoding: "utf-8".to_string(),
            headers: "{}".to_string(),
            date: None,
            body: String::new(),
        }
    }

    #[test]
    fn test_load_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert(&row("https://example.com/a")).unwrap();
        storage.insert(&row("https://example.com/a")).unwrap();
        storage.insert(&row("https://example.com/b")).unwrap();

        let stats = load_statistics(&storage).unwrap();
        assert_eq!(
            stats,
            StoreStatistics {
                total_pages: 3,
                distinct_urls: 2
            }
        );
    }

    #[test]
    fn test_empty_store() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.total_pages, 0);
        assert_eq!(stats.distinct_urls, 0);
    }

    #[test]
    fn test_crawl_stats_serialize() {
        let stats = CrawlStats {
            fetched: 2,
            stored: 2,
            aborted: 1,
            credits_used: 2,
            credits_threshold: 2,
            shutdown_reason: Some("API credits exhausted: 2/2".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["aborted"], 1);
        assert_eq!(json["shutdown_reason"], "API credits exhausted: 2/2");
    }
}
