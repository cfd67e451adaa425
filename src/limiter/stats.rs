//! Limiter Statistics Module
//!
//! Counts admission outcomes across all routes.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Limiter Counters ==
/// Lock-free counters shared by every clone of a limiter.
#[derive(Debug, Default)]
pub struct LimiterCounters {
    allowed: AtomicU64,
    rejected: AtomicU64,
    degraded: AtomicU64,
}

impl LimiterCounters {
    pub fn record_allowed(&self) {
        self.allowed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_degraded(&self) {
        self.degraded.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> LimiterStats {
        LimiterStats {
            allowed: self.allowed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
        }
    }
}

// == Limiter Stats ==
/// Admission outcome totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LimiterStats {
    /// Requests admitted under quota (or with no policy attached)
    pub allowed: u64,
    /// Requests rejected for exceeding quota
    pub rejected: u64,
    /// Requests let through because the store failed
    pub degraded: u64,
}

impl LimiterStats {
    /// Fraction of decided requests that were rejected.
    pub fn rejection_rate(&self) -> f64 {
        let total = self.allowed + self.rejected + self.degraded;
        if total == 0 {
            0.0
        } else {
            self.rejected as f64 / total as f64
        }
    }
}
