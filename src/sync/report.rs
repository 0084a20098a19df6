use crate::core::error::SyncFailure;
use std::time::Duration;

/// Outcome of one `refresh_all` cycle
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Records loaded at the start of the cycle
    pub total: usize,
    /// Symbols whose price, valuation and timestamp were refreshed
    pub updated: Vec<String>,
    /// Symbols that kept their previous values, with the reason
    pub failures: Vec<SyncFailure>,
    pub elapsed: Duration,
}

impl SyncReport {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn log_summary(&self) {
        tracing::info!(
            total = self.total,
            updated = self.updated.len(),
            failed = self.failures.len(),
            elapsed = ?self.elapsed,
            "Stock sync cycle completed"
        );
    }
}
