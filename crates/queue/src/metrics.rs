//! Per-queue counters.
//!
//! Counters are plain atomics updated with relaxed ordering; they describe
//! activity, they do not synchronize anything. Read them through
//! [`QueueMetrics::snapshot`].

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};

/// Queue metrics for monitoring
#[derive(Debug, Default)]
pub struct QueueMetrics {
    pub total_added: AtomicU64,
    pub total_delivered: AtomicU64,
    pub rejected_after_destroy: AtomicU64,
    pub conflicts_reported: AtomicU64,
    pub asap_scheduled: AtomicU64,
    pub wakeups: AtomicU64,
    pub stale_wakeups: AtomicU64,
    pub current_size: AtomicUsize,
    pub queue_depth_max: AtomicUsize,
    pub destroyed: AtomicBool,
}

impl QueueMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted item and the resulting queue size
    pub fn record_add(&self, size: usize) {
        self.total_added.fetch_add(1, AtomicOrdering::Relaxed);
        self.update_size(size);
    }

    /// Record a delivered item and the resulting queue size
    pub fn record_delivery(&self, size: usize) {
        self.total_delivered.fetch_add(1, AtomicOrdering::Relaxed);
        self.update_size(size);
    }

    /// Record a mutation attempted on a destroyed queue
    pub fn record_rejection(&self) {
        self.rejected_after_destroy.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Record conflicts returned to a caller
    pub fn record_conflicts(&self, count: usize) {
        self.conflicts_reported.fetch_add(count as u64, AtomicOrdering::Relaxed);
    }

    /// Record an item placed by `schedule_asap`
    pub fn record_asap(&self) {
        self.asap_scheduled.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Record a waiter waking up; `stale` when the queue changed underneath it
    pub fn record_wakeup(&self, stale: bool) {
        self.wakeups.fetch_add(1, AtomicOrdering::Relaxed);
        if stale {
            self.stale_wakeups.fetch_add(1, AtomicOrdering::Relaxed);
        }
    }

    /// Record the terminal transition
    pub fn record_destroy(&self) {
        self.destroyed.store(true, AtomicOrdering::Relaxed);
        self.current_size.store(0, AtomicOrdering::Relaxed);
    }

    /// Update current size
    pub fn update_size(&self, size: usize) {
        self.current_size.store(size, AtomicOrdering::Relaxed);
        self.update_max_depth(size);
    }

    /// Update maximum depth if current exceeds it
    fn update_max_depth(&self, current: usize) {
        let mut max = self.queue_depth_max.load(AtomicOrdering::Relaxed);

        while current > max {
            match self.queue_depth_max.compare_exchange_weak(
                max,
                current,
                AtomicOrdering::Relaxed,
                AtomicOrdering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => max = actual,
            }
        }
    }

    /// Get a snapshot of metrics
    pub fn snapshot(&self) -> QueueMetricsSnapshot {
        QueueMetricsSnapshot {
            total_added: self.total_added.load(AtomicOrdering::Relaxed),
            total_delivered: self.total_delivered.load(AtomicOrdering::Relaxed),
            rejected_after_destroy: self.rejected_after_destroy.load(AtomicOrdering::Relaxed),
            conflicts_reported: self.conflicts_reported.load(AtomicOrdering::Relaxed),
            asap_scheduled: self.asap_scheduled.load(AtomicOrdering::Relaxed),
            wakeups: self.wakeups.load(AtomicOrdering::Relaxed),
            stale_wakeups: self.stale_wakeups.load(AtomicOrdering::Relaxed),
            current_size: self.current_size.load(AtomicOrdering::Relaxed),
            queue_depth_max: self.queue_depth_max.load(AtomicOrdering::Relaxed),
            destroyed: self.destroyed.load(AtomicOrdering::Relaxed),
        }
    }
}

/// Immutable metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMetricsSnapshot {
    pub total_added: u64,
    pub total_delivered: u64,
    pub rejected_after_destroy: u64,
    pub conflicts_reported: u64,
    pub asap_scheduled: u64,
    pub wakeups: u64,
    pub stale_wakeups: u64,
    pub current_size: usize,
    pub queue_depth_max: usize,
    pub destroyed: bool,
}

impl QueueMetricsSnapshot {
    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Queue Metrics:\n\
            - Current Size: {} (max {})\n\
            - Added / Delivered: {} / {}\n\
            - Rejected After Destroy: {}\n\
            - Conflicts Reported: {}\n\
            - ASAP Scheduled: {}\n\
            - Wakeups: {} ({} stale)\n\
            - Destroyed: {}",
            self.current_size,
            self.queue_depth_max,
            self.total_added,
            self.total_delivered,
            self.rejected_after_destroy,
            self.conflicts_reported,
            self.asap_scheduled,
            self.wakeups,
            self.stale_wakeups,
            self.destroyed
        )
    }
}
