use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueMetrics {
    pub admitted_blocking: u64,
    pub admitted_non_blocking: u64,
    pub promoted_from_cache: u64,
    pub drained: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
pub struct QueueMetricsCollector {
    admitted_blocking: AtomicU64,
    admitted_non_blocking: AtomicU64,
    promoted_from_cache: AtomicU64,
    drained: AtomicU64,
    dropped: AtomicU64,
}

impl QueueMetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_blocking(&self) {
        self.admitted_blocking.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_non_blocking(&self) {
        self.admitted_non_blocking.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_promoted(&self, count: usize) {
        if count > 0 {
            self.promoted_from_cache
                .fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_drained(&self, count: usize) {
        if count > 0 {
            self.drained.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_dropped(&self, count: usize) {
        if count > 0 {
            self.dropped.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> QueueMetrics {
        QueueMetrics {
            admitted_blocking: self.admitted_blocking.load(Ordering::Relaxed),
            admitted_non_blocking: self.admitted_non_blocking.load(Ordering::Relaxed),
            promoted_from_cache: self.promoted_from_cache.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
