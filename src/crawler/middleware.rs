//! Caching middleware
//!
//! Every outbound request passes through [`CachingMiddleware::process_request`]
//! before it reaches the network. The middleware decides, per request, one of:
//!
//! | Store lookup | Budget / shutdown state            | Outcome                                  |
//! |--------------|------------------------------------|------------------------------------------|
//! | hit          | any                                | `Replay` a response built from the store |
//! | miss         | `credits_used >= credits_threshold` | trigger shutdown, `CreditsExhausted`     |
//! | miss         | shutdown already underway          | `Closing`                                |
//! | miss         | credits available                  | spend one credit, `Fetch`                |
//!
//! Store failures and malformed stored rows fail the single request; they are
//! never treated as a cache miss.

use crate::crawler::budget::{CreditBudget, SpendDecision};
use crate::crawler::replayed::ReplayedUrls;
use crate::crawler::shutdown::ShutdownSignal;
use crate::record::{Request, Response, ResponseRecord};
use crate::storage::{ConnectionPool, Storage};
use crate::CrawlError;
use std::sync::Arc;

/// What the driver should do with a request
#[derive(Debug)]
pub enum RequestAction {
    /// Served from the store; do not fetch
    Replay(Response),

    /// Not in the store and a credit was spent; fetch it
    Fetch,
}

/// Per-request cache/budget decision engine
pub struct CachingMiddleware<S> {
    pool: Arc<ConnectionPool<S>>,
    budget: Arc<CreditBudget>,
    shutdown: ShutdownSignal,
    replayed: Arc<ReplayedUrls>,
}

impl<S: Storage> CachingMiddleware<S> {
    pub fn new(
        pool: Arc<ConnectionPool<S>>,
        budget: Arc<CreditBudget>,
        shutdown: ShutdownSignal,
        replayed: Arc<ReplayedUrls>,
    ) -> Self {
        tracing::info!(
            "Caching middleware ready: credits_used={}, credits_threshold={}",
            budget.credits_used(),
            budget.credits_threshold()
        );
        Self {
            pool,
            budget,
            shutdown,
            replayed,
        }
    }

    /// Decides how a request is satisfied
    ///
    /// # Returns
    ///
    /// * `Ok(RequestAction::Replay)` - Stored response, URL marked replayed
    /// * `Ok(RequestAction::Fetch)` - Cache miss; one credit was spent
    /// * `Err(CrawlError::CreditsExhausted)` - Threshold reached; shutdown
    ///   has been triggered
    /// * `Err(CrawlError::Closing)` - Shutdown already underway
    /// * `Err(_)` - Store or stored-row failure for this request only
    pub async fn process_request(&self, request: &Request) -> Result<RequestAction, CrawlError> {
        let url = request.url.as_str();

        let stored = {
            let conn = self.pool.acquire().await?;
            conn.lookup(url)?
        };

        if let Some(row) = stored {
            tracing::info!("Loaded record from store for URL '{}'; replaying", url);
            let record = ResponseRecord::from_row(row)?;
            let response = Response::replayed(&record, request.clone())?;
            self.replayed.insert(url);
            return Ok(RequestAction::Replay(response));
        }

        // The shutdown listener may not have run close() yet
        if self.shutdown.is_triggered() {
            self.close();
        }

        match self.budget.try_spend() {
            SpendDecision::Granted { used, threshold } => {
                tracing::info!(
                    "Cache miss for URL '{}', fetching via network (credits used {}/{})",
                    url,
                    used,
                    threshold
                );
                Ok(RequestAction::Fetch)
            }
            SpendDecision::Exhausted { used, threshold } => {
                let reason = format!("API credits exhausted: {}/{}", used, threshold);
                if self.shutdown.trigger(reason.clone()) {
                    tracing::error!(
                        "Credits used {} meets or exceeds threshold {}; shutting down crawl",
                        used,
                        threshold
                    );
                }
                Err(CrawlError::CreditsExhausted { used, threshold })
            }
            SpendDecision::Closing => {
                let reason = self
                    .shutdown
                    .reason()
                    .unwrap_or_else(|| "crawl closed".to_string());
                tracing::debug!("Refusing URL '{}': crawl is closing", url);
                Err(CrawlError::Closing { reason })
            }
        }
    }

    /// Crawl-closed handler: refuses every later cache miss
    pub fn close(&self) {
        self.budget.stop();
    }

    pub fn budget(&self) -> &CreditBudget {
        &self.budget
    }
}
