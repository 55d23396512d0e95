//! cached-crawl: a credit-budgeted crawler with a persistent response cache
//!
//! Pages are fetched through a paid scraping proxy, stored in SQLite keyed by
//! URL, and replayed from the store on later runs instead of being fetched
//! again. Every network fetch spends one credit; the crawl shuts itself down
//! once the configured credit threshold is reached.

pub mod config;
pub mod crawler;
pub mod export;
pub mod record;
pub mod storage;

use thiserror::Error;

/// Main error type for cached-crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Record error: {0}")]
    Record(#[from] record::RecordError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API credits exhausted: {used}/{threshold}")]
    CreditsExhausted { used: u64, threshold: u64 },

    #[error("Crawl is closing: {reason}")]
    Closing { reason: String },
}

impl CrawlError {
    /// Returns true for the errors that mean "this request was refused
    /// because the crawl is shutting down", as opposed to a real failure.
    pub fn is_shutdown(&self) -> bool {
        matches!(
            self,
            CrawlError::CreditsExhausted { .. } | CrawlError::Closing { .. }
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for cached-crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CachingMiddleware, Coordinator, CrawlStats, PersistingPipeline};
pub use record::{Headers, Request, Response, ResponseRecord};
pub use storage::{ConnectionPool, SqliteStorage, Storage};
