//! URLs served from the store during the current run

use dashmap::DashSet;

/// Concurrent set of URLs replayed from the store in this run
///
/// Written by the caching middleware, read by the persisting pipeline so a
/// replayed page is never stored a second time.
#[derive(Debug, Default)]
pub struct ReplayedUrls {
    urls: DashSet<String>,
}

impl ReplayedUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: &str) {
        self.urls.insert(url.to_string());
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
