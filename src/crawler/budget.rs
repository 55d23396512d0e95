//! Credit budget shared by every request of a crawl run
//!
//! One credit is one paid fetch through the scraping proxy. The budget is
//! checked and spent under a single lock, so concurrent cache misses can
//! never push `credits_used` past `credits_threshold`.

use std::sync::{Mutex, PoisonError};

/// Outcome of asking the budget for one credit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendDecision {
    /// A credit was spent; `used` is the new total
    Granted { used: u64, threshold: u64 },

    /// The threshold has been reached; nothing was spent
    Exhausted { used: u64, threshold: u64 },

    /// The crawl is already closing; nothing was spent
    Closing,
}

#[derive(Debug)]
struct BudgetState {
    credits_used: u64,
    credits_threshold: u64,
    stop_triggered: bool,
}

/// Process-wide credit budget for one crawl run
#[derive(Debug)]
pub struct CreditBudget {
    state: Mutex<BudgetState>,
}

impl CreditBudget {
    /// Creates a budget starting at `credits_used` out of `credits_threshold`
    pub fn new(credits_used: u64, credits_threshold: u64) -> Self {
        Self {
            state: Mutex::new(BudgetState {
                credits_used,
                credits_threshold,
                stop_triggered: false,
            }),
        }
    }

    /// Tries to spend one credit
    ///
    /// The threshold is checked before the stop flag: a run that has used up
    /// its credits always reports `Exhausted`, even once it is closing.
    pub fn try_spend(&self) -> SpendDecision {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.credits_used >= state.credits_threshold {
            return SpendDecision::Exhausted {
                used: state.credits_used,
                threshold: state.credits_threshold,
            };
        }

        if state.stop_triggered {
            return SpendDecision::Closing;
        }

        state.credits_used += 1;
        SpendDecision::Granted {
            used: state.credits_used,
            threshold: state.credits_threshold,
        }
    }

    /// Marks the crawl as closing; later misses are refused
    pub fn stop(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stop_triggered = true;
    }

    pub fn credits_used(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .credits_used
    }

    pub fn credits_threshold(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .credits_threshold
    }

    pub fn is_stopped(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stop_triggered
    }
}
