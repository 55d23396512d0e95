//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives one crawl run over a list of URLs:
//! - Bounding the number of URLs in flight
//! - Routing each request through the caching middleware
//! - Fetching cache misses (behind the rendering rate limiter)
//! - Handing every response to the persisting pipeline
//! - Stopping the schedule once shutdown is triggered

use crate::config::Config;
use crate::crawler::budget::CreditBudget;
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::middleware::{CachingMiddleware, RequestAction};
use crate::crawler::pipeline::{PersistOutcome, PersistingPipeline};
use crate::crawler::rate_limiter::RenderingRateLimiter;
use crate::crawler::replayed::ReplayedUrls;
use crate::crawler::shutdown::ShutdownSignal;
use crate::crawler::stats::CrawlStats;
use crate::record::{Request, ResponseRecord};
use crate::storage::{open_pool, ConnectionPool, SqliteStorage, Storage};
use crate::CrawlError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// What happened to one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UrlOutcome {
    Replayed(PersistOutcome),
    Fetched(PersistOutcome),
    Aborted,
    Failed,
}

impl CrawlStats {
    fn record(&mut self, outcome: UrlOutcome) {
        let persisted = match outcome {
            UrlOutcome::Replayed(persisted) => {
                self.replayed += 1;
                persisted
            }
            UrlOutcome::Fetched(persisted) => {
                self.fetched += 1;
                persisted
            }
            UrlOutcome::Aborted => {
                self.aborted += 1;
                return;
            }
            UrlOutcome::Failed => {
                self.failed += 1;
                return;
            }
        };

        match persisted {
            PersistOutcome::Stored(_) => self.stored += 1,
            PersistOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Everything a per-URL task needs, shared across tasks
struct UrlWorker<S, F> {
    middleware: Arc<CachingMiddleware<S>>,
    pipeline: Arc<PersistingPipeline<S>>,
    fetcher: Arc<F>,
    rate_limiter: Arc<RenderingRateLimiter>,
}

impl<S, F> Clone for UrlWorker<S, F> {
    fn clone(&self) -> Self {
        Self {
            middleware: Arc::clone(&self.middleware),
            pipeline: Arc::clone(&self.pipeline),
            fetcher: Arc::clone(&self.fetcher),
            rate_limiter: Arc::clone(&self.rate_limiter),
        }
    }
}

impl<S: Storage, F: Fetcher> UrlWorker<S, F> {
    async fn process(&self, request: Request) -> UrlOutcome {
        match self.try_process(&request).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_shutdown() => {
                tracing::debug!("Aborted URL '{}': {}", request.url, e);
                UrlOutcome::Aborted
            }
            Err(e) => {
                tracing::warn!("Error processing URL '{}': {}", request.url, e);
                UrlOutcome::Failed
            }
        }
    }

    async fn try_process(&self, request: &Request) -> Result<UrlOutcome, CrawlError> {
        let (response, replayed) = match self.middleware.process_request(request).await? {
            RequestAction::Replay(response) => (response, true),
            RequestAction::Fetch => {
                self.rate_limiter.acquire().await;
                (self.fetcher.fetch(request).await?, false)
            }
        };

        let record = ResponseRecord::from_response(&response)?;
        let persisted = self.pipeline.process_item(&record).await?;

        Ok(if replayed {
            UrlOutcome::Replayed(persisted)
        } else {
            UrlOutcome::Fetched(persisted)
        })
    }
}

/// Main crawler coordinator structure
pub struct Coordinator<S, F> {
    pool: Arc<ConnectionPool<S>>,
    worker: UrlWorker<S, F>,
    shutdown: ShutdownSignal,
    concurrency: usize,
}

impl Coordinator<SqliteStorage, HttpFetcher> {
    /// Creates a coordinator from configuration
    ///
    /// Opens one store connection per concurrent request, so a database
    /// that cannot be opened fails here rather than mid-crawl.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated crawl configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlError)` - The store or HTTP client failed to initialize
    pub fn from_config(config: &Config) -> Result<Self, CrawlError> {
        let concurrency = config.crawler.concurrent_requests as usize;
        let pool = open_pool(&config.database, concurrency)?;
        let fetcher = HttpFetcher::from_config(config)?;
        let budget = CreditBudget::new(
            config.crawler.credits_used,
            config.crawler.credits_threshold,
        );
        let rate_limiter = RenderingRateLimiter::new(config.proxy.renders());

        Ok(Self::new(pool, fetcher, budget, rate_limiter, concurrency))
    }
}

impl<S, F> Coordinator<S, F>
where
    S: Storage + 'static,
    F: Fetcher + 'static,
{
    /// Wires the middleware and pipeline around a pool and fetcher
    pub fn new(
        pool: ConnectionPool<S>,
        fetcher: F,
        budget: CreditBudget,
        rate_limiter: RenderingRateLimiter,
        concurrency: usize,
    ) -> Self {
        let pool = Arc::new(pool);
        let shutdown = ShutdownSignal::new();
        let replayed = Arc::new(ReplayedUrls::new());

        let middleware = CachingMiddleware::new(
            Arc::clone(&pool),
            Arc::new(budget),
            shutdown.clone(),
            Arc::clone(&replayed),
        );
        let pipeline = PersistingPipeline::new(Arc::clone(&pool), replayed);

        Self {
            pool,
            worker: UrlWorker {
                middleware: Arc::new(middleware),
                pipeline: Arc::new(pipeline),
                fetcher: Arc::new(fetcher),
                rate_limiter: Arc::new(rate_limiter),
            },
            shutdown,
            concurrency: concurrency.max(1),
        }
    }

    /// Handle to this crawl's shutdown signal
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Runs the crawl over `urls`
    ///
    /// URLs are scheduled in order, at most `concurrency` at a time. Once
    /// shutdown is triggered no further URL is scheduled; URLs already in
    /// flight finish. Per-URL failures are logged and counted, never fatal.
    ///
    /// The coordinator is spent afterwards: its middleware refuses new cache
    /// misses and its pool is closed.
    pub async fn run<I>(&self, urls: I) -> CrawlStats
    where
        I: IntoIterator<Item = String>,
    {
        let mut stats = CrawlStats::default();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        let listener = {
            let shutdown = self.shutdown.clone();
            let middleware = Arc::clone(&self.worker.middleware);
            tokio::spawn(async move {
                let reason = shutdown.triggered().await;
                tracing::info!("Shutdown triggered: {}", reason);
                middleware.close();
            })
        };

        tracing::info!("Starting crawl with concurrency {}", self.concurrency);

        let mut pending = urls.into_iter();
        while let Some(url) = pending.next() {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            if self.shutdown.is_triggered() {
                let remaining = 1 + pending.by_ref().count() as u64;
                tracing::info!("Shutdown underway; not scheduling {} remaining URLs", remaining);
                stats.not_scheduled += remaining;
                break;
            }

            let request = match Url::parse(url.trim()) {
                Ok(parsed) => Request::new(parsed),
                Err(e) => {
                    tracing::warn!("Skipping invalid URL '{}': {}", url, e);
                    stats.failed += 1;
                    continue;
                }
            };

            let worker = self.worker.clone();
            tasks.spawn(async move {
                let _permit = permit;
                worker.process(request).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => stats.record(outcome),
                Err(e) => {
                    tracing::error!("Crawl task failed: {}", e);
                    stats.failed += 1;
                }
            }
        }

        listener.abort();
        self.worker.middleware.close();
        self.pool.close();

        let budget = self.worker.middleware.budget();
        stats.credits_used = budget.credits_used();
        stats.credits_threshold = budget.credits_threshold();
        stats.shutdown_reason = self.shutdown.reason();
        stats.log_summary();
        stats
    }
}
