//! Bounded retry accounting for probe attempts.
//!
//! Retries are immediate: there is no backoff, no jitter and no
//! classification. Every failed attempt, whether the network broke or the
//! registry answered negatively, consumes one slot.

use tracing::debug;

use crate::config::DEFAULT_RETRIES;

/// Counts consumed retries against a fixed maximum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryBudget {
    /// Retries allowed after the initial attempt.
    pub max_retries: u32,
    consumed: u32,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIES)
    }
}

impl RetryBudget {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            consumed: 0,
        }
    }

    /// A budget that allows the initial attempt only.
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    pub fn consumed(&self) -> u32 {
        self.consumed
    }

    pub fn remaining(&self) -> u32 {
        self.max_retries.saturating_sub(self.consumed)
    }

    /// Upper bound on attempts, including the initial one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Takes one retry slot if any is left. The counter only ever grows.
    pub fn try_consume(&mut self) -> bool {
        if self.consumed < self.max_retries {
            self.consumed += 1;
            debug!(
                consumed = self.consumed,
                max_retries = self.max_retries,
                "Retry slot consumed"
            );
            true
        } else {
            false
        }
    }
}
