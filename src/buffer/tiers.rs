use super::admission::ExecutionContext;
use super::cache::NonBlockingCache;
use super::metrics::{QueueMetrics, QueueMetricsCollector};
use super::queue::PassiveQueue;
use crate::domain::{Record, RecordList};

/// The two admission tiers plus the merge logic between them.
#[derive(Debug)]
pub struct TieredQueue {
    cache: NonBlockingCache,
    queue: PassiveQueue,
    metrics: QueueMetricsCollector,
}

impl TieredQueue {
    pub fn new(max_pending: Option<usize>) -> Self {
        Self {
            cache: NonBlockingCache::new(),
            queue: PassiveQueue::new(max_pending),
            metrics: QueueMetricsCollector::new(),
        }
    }

    /// Single admission entry point for every producer.
    ///
    /// A non-blocking caller only touches the cache. A blocking-capable caller
    /// first promotes the cache and then appends its own record, so everything
    /// cached before this call lands ahead of it in the queue.
    pub fn submit(&self, record: Record, context: ExecutionContext) {
        match context {
            ExecutionContext::NonBlocking => {
                self.cache.insert(record);
                self.metrics.record_non_blocking();
            }
            ExecutionContext::Blocking => {
                let cached = self.cache.detach();
                self.metrics.record_promoted(cached.len());
                let dropped = self.queue.admit(cached, record);
                self.metrics.record_blocking();
                self.note_dropped(dropped);
            }
        }
    }

    /// Moves cached records into the queue without draining it.
    pub fn promote_cache(&self) -> usize {
        let cached = self.cache.detach();
        let promoted = cached.len();
        self.metrics.record_promoted(promoted);
        let dropped = self.queue.merge(cached);
        self.note_dropped(dropped);
        promoted
    }

    /// Detaches the cache and takes the queue plus cached records as one batch.
    pub fn take_batch(&self) -> RecordList {
        let cached = self.cache.detach();
        self.metrics.record_promoted(cached.len());
        let batch = self.queue.drain(cached);
        self.metrics.record_drained(batch.len());
        batch
    }

    pub fn cache(&self) -> &NonBlockingCache {
        &self.cache
    }

    pub fn queue(&self) -> &PassiveQueue {
        &self.queue
    }

    /// Records waiting in either tier.
    pub fn pending(&self) -> usize {
        self.cache.len() + self.queue.len()
    }

    pub fn metrics(&self) -> QueueMetrics {
        self.metrics.snapshot()
    }

    fn note_dropped(&self, dropped: usize) {
        if dropped > 0 {
            self.metrics.record_dropped(dropped);
            tracing::warn!(
                dropped,
                max_pending = ?self.queue.max_pending(),
                "Pending record cap reached, dropped oldest records"
            );
        }
    }
}

impl Default for TieredQueue {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(tag: &str) -> Record {
        Record::new(tag.as_bytes().to_vec())
    }

    fn tags(list: &RecordList) -> Vec<String> {
        list.iter()
            .map(|r| String::from_utf8(r.payload().to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn test_blocking_admission_promotes_cache_first() {
        let tiers = TieredQueue::new(None);
        tiers.submit(rec("n1"), ExecutionContext::NonBlocking);
        tiers.submit(rec("n2"), ExecutionContext::NonBlocking);
        tiers.submit(rec("b1"), ExecutionContext::Blocking);

        assert!(tiers.cache().is_empty());
        assert_eq!(tags(&tiers.queue().lock()), vec!["n1", "n2", "b1"]);

        let metrics = tiers.metrics();
        assert_eq!(metrics.admitted_non_blocking, 2);
        assert_eq!(metrics.admitted_blocking, 1);
        assert_eq!(metrics.promoted_from_cache, 2);
    }

    #[test]
    fn test_non_blocking_admission_stays_in_cache() {
        let tiers = TieredQueue::new(None);
        tiers.submit(rec("b1"), ExecutionContext::Blocking);
        tiers.submit(rec("n1"), ExecutionContext::NonBlocking);

        assert_eq!(tiers.queue().len(), 1);
        assert_eq!(tiers.cache().len(), 1);
        assert_eq!(tiers.pending(), 2);
    }

    #[test]
    fn test_take_batch_orders_queue_before_cache() {
        let tiers = TieredQueue::new(None);
        tiers.submit(rec("A"), ExecutionContext::Blocking);
        tiers.submit(rec("B"), ExecutionContext::NonBlocking);

        let batch = tiers.take_batch();
        assert_eq!(tags(&batch), vec!["A", "B"]);
        assert_eq!(tiers.pending(), 0);
        assert_eq!(tiers.metrics().drained, 2);
    }

    #[test]
    fn test_promote_cache_honors_cap() {
        let tiers = TieredQueue::new(Some(3));
        for i in 0..5 {
            tiers.submit(rec(&format!("n{i}")), ExecutionContext::NonBlocking);
        }

        assert_eq!(tiers.promote_cache(), 5);
        assert_eq!(tags(&tiers.queue().lock()), vec!["n2", "n3", "n4"]);
        assert_eq!(tiers.metrics().dropped, 2);
    }
}
