//! Crawl-wide shutdown notification
//!
//! The crawl driver creates one [`ShutdownSignal`] per run and hands clones to
//! every component that may stop the crawl or needs to react to it. The first
//! reason given wins; later triggers are no-ops.

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable handle to a run's shutdown state
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Initiates shutdown with a reason
    ///
    /// # Returns
    ///
    /// `true` if this call initiated the shutdown, `false` if it was already
    /// underway.
    pub fn trigger(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        })
    }

    pub fn is_triggered(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// The reason given by whoever initiated shutdown
    pub fn reason(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Waits until shutdown is triggered and returns its reason
    pub async fn triggered(&self) -> String {
        let mut rx = self.tx.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(reason) = current {
                return reason;
            }
            // The sender lives as long as `self`, so this cannot fail
            let _ = rx.changed().await;
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_reason_wins() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_triggered());

        assert!(signal.trigger("credits exhausted"));
        assert!(!signal.trigger("something else"));

        assert!(signal.is_triggered());
        assert_eq!(signal.reason().as_deref(), Some("credits exhausted"));
    }

    #[test]
    fn test_clones_share_state() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();
        clone.trigger("stop");
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn test_triggered_wakes_waiter() {
        let signal = ShutdownSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.triggered().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.trigger("done");

        let reason = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reason, "done");
    }

    #[tokio::test]
    async fn test_triggered_returns_immediately_when_already_set() {
        let signal = ShutdownSignal::new();
        signal.trigger("early");
        assert_eq!(signal.triggered().await, "early");
    }
}
