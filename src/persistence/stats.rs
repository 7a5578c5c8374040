//! Counters for best-effort persistence.
//!
//! History writes are fire-and-forget: a failure is logged and never
//! reaches a client. These counters let operators see the failure rate
//! anyway; they are reported on `GET /health`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use utoipa::ToSchema;

/// Lock-free persistence counters shared by all history writers.
#[derive(Debug, Default)]
pub struct PersistenceStats {
    writes_attempted: AtomicU64,
    writes_failed: AtomicU64,
    reads_failed: AtomicU64,
}

/// Point-in-time copy of [`PersistenceStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PersistenceStatsSnapshot {
    /// History writes handed to the store.
    pub writes_attempted: u64,
    /// History writes the store rejected.
    pub writes_failed: u64,
    /// History reads that failed while replaying to a joiner.
    pub reads_failed: u64,
}

impl PersistenceStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a write was handed to the store.
    pub fn record_write(&self) {
        self.writes_attempted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed write.
    pub fn record_write_failure(&self) {
        self.writes_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed read.
    pub fn record_read_failure(&self) {
        self.reads_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> PersistenceStatsSnapshot {
        PersistenceStatsSnapshot {
            writes_attempted: self.writes_attempted.load(Ordering::Relaxed),
            writes_failed: self.writes_failed.load(Ordering::Relaxed),
            reads_failed: self.reads_failed.load(Ordering::Relaxed),
        }
    }
}
