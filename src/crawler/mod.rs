//! Crawler module
//!
//! This module contains the crawl engine:
//! - Credit budget and shutdown signal shared by every request
//! - Caching middleware deciding replay vs. fetch per request
//! - HTTP fetching with the rendering-mode rate limiter
//! - Persisting pipeline writing fetched pages to the store
//! - The coordinator driving a run over a URL list

mod budget;
mod coordinator;
mod fetcher;
mod middleware;
mod pipeline;
mod rate_limiter;
mod replayed;
mod shutdown;
mod stats;

pub use budget::{CreditBudget, SpendDecision};
pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, charset_from_content_type, Fetcher, HttpFetcher, DEFAULT_ENCODING};
pub use middleware::{CachingMiddleware, RequestAction};
pub use pipeline::{PersistOutcome, PersistingPipeline};
pub use rate_limiter::{Clock, LocalClock, MinuteWindow, RenderingRateLimiter, RENDER_REQUESTS_PER_MINUTE};
pub use replayed::ReplayedUrls;
pub use shutdown::ShutdownSignal;
pub use stats::{load_statistics, print_statistics, CrawlStats, StoreStatistics};
