use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::{DEFAULT_BACKOFF_MS, DEFAULT_LOAD_TIMEOUT_MS, DEFAULT_MAX_RETRIES};

/// Declarative retry policy for one interactive action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt, per failure kind.
    pub max_retries: u32,
    /// Fixed delay before each interaction retry.
    pub backoff_ms: u64,
    /// Explicit wait applied when the target is not yet present.
    pub load_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_ms: DEFAULT_BACKOFF_MS,
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, backoff_ms: u64) -> Self {
        Self {
            max_retries,
            backoff_ms,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_load_timeout_ms(mut self, ms: u64) -> Self {
        self.load_timeout_ms = ms;
        self
    }

    /// Policy for best-effort actions (closing a modal, resetting filters):
    /// one retry, same delays.
    #[must_use]
    pub fn best_effort(&self) -> Self {
        Self {
            max_retries: self.max_retries.min(1),
            ..*self
        }
    }

    #[must_use]
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    #[must_use]
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}
