//! Regeneration Statistics Module
//!
//! Counters shared by every lifecycle served by one process.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::regen::DrainReport;

// == Regeneration Stats ==
/// Lock-free counters for reads and regeneration activity.
#[derive(Debug, Default)]
pub struct RegenerationStats {
    fresh_reads: AtomicU64,
    stale_reads: AtomicU64,
    enqueued: AtomicU64,
    deduplicated: AtomicU64,
    ran_inline: AtomicU64,
    ran_deferred: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    rejected: AtomicU64,
}

impl RegenerationStats {
    // == Constructor ==
    /// Creates counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a read that found a fresh value.
    pub fn record_fresh_read(&self) {
        self.fresh_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a read that found a stale or missing value.
    pub fn record_stale_read(&self) {
        self.stale_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a regeneration added to a queue.
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a regeneration collapsed into an already queued one.
    pub fn record_deduplicated(&self) {
        self.deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a regeneration run during the read that triggered it.
    pub fn record_inline(&self, succeeded: bool) {
        self.ran_inline.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a submission refused because the lifecycle is finishing.
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Drain ==
    /// Folds a drain report into the counters.
    pub fn record_drain(&self, report: &DrainReport) {
        self.ran_deferred
            .fetch_add(report.executed as u64, Ordering::Relaxed);
        self.failed
            .fetch_add(report.failures.len() as u64, Ordering::Relaxed);
        self.skipped
            .fetch_add(report.skipped as u64, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Returns a point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fresh_reads: self.fresh_reads.load(Ordering::Relaxed),
            stale_reads: self.stale_reads.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            deduplicated: self.deduplicated.load(Ordering::Relaxed),
            ran_inline: self.ran_inline.load(Ordering::Relaxed),
            ran_deferred: self.ran_deferred.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

// == Stats Snapshot ==
/// Serializable copy of `RegenerationStats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub fresh_reads: u64,
    pub stale_reads: u64,
    pub enqueued: u64,
    pub deduplicated: u64,
    pub ran_inline: u64,
    pub ran_deferred: u64,
    pub failed: u64,
    pub skipped: u64,
    pub rejected: u64,
}

impl StatsSnapshot {
    // == Fresh Rate ==
    /// Returns fresh / (fresh + stale), or 0.0 if nothing was read.
    pub fn fresh_rate(&self) -> f64 {
        let total = self.fresh_reads + self.stale_reads;
        if total == 0 {
            0.0
        } else {
            self.fresh_reads as f64 / total as f64
        }
    }
}
