//! Tuning knobs for the reconciler.

use std::time::Duration;

use tokio::sync::Semaphore;

/// Reconciler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Documents processed at once, between 1 and `Semaphore::MAX_PERMITS`.
    /// `1` processes them in arrival order.
    pub concurrency: usize,
    /// Attempts per droplet when the provider reports a transient error.
    pub termination_attempts: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub retry_backoff: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            termination_attempts: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

impl ReconcileConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    pub fn with_termination_attempts(mut self, attempts: u32) -> Self {
        self.termination_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}
