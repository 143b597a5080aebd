//! Recovery Statistics
//!
//! Counters owned by one engine instance (or shared between several through
//! an `Arc`), reset only through `reset`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Running recovery counters.
#[derive(Debug, Default)]
pub struct RecoveryStats {
    total_errors: AtomicU64,
    recovered: AtomicU64,
    failed: AtomicU64,
    rollbacks: AtomicU64,
    fixes: AtomicU64,
}

/// Point-in-time copy of `RecoveryStats`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryStatsSnapshot {
    pub total_errors: u64,
    pub recovered: u64,
    pub failed: u64,
    pub rollbacks: u64,
    pub fixes: u64,
    /// Percent of errors recovered; 100 when no error has occurred
    pub success_rate: f64,
}

impl RecoveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recovered(&self) {
        self.recovered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fix(&self) {
        self.fixes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        for counter in [
            &self.total_errors,
            &self.recovered,
            &self.failed,
            &self.rollbacks,
            &self.fixes,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> RecoveryStatsSnapshot {
        let total_errors = self.total_errors.load(Ordering::Relaxed);
        let recovered = self.recovered.load(Ordering::Relaxed);
        let success_rate = if total_errors == 0 {
            100.0
        } else {
            recovered as f64 * 100.0 / total_errors as f64
        };

        RecoveryStatsSnapshot {
            total_errors,
            recovered,
            failed: self.failed.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            fixes: self.fixes.load(Ordering::Relaxed),
            success_rate,
        }
    }
}
