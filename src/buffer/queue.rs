use crate::domain::{Record, RecordList};
use parking_lot::{Mutex, MutexGuard};

/// Durable admission tier, mutated only from contexts that may block.
///
/// Lock order: callers always detach the [`NonBlockingCache`](super::NonBlockingCache)
/// first and hand the detached list in, so the cache lock is never requested
/// while this lock is held. The lock is never held across file I/O.
#[derive(Debug, Default)]
pub struct PassiveQueue {
    list: Mutex<RecordList>,
    max_pending: Option<usize>,
}

impl PassiveQueue {
    pub fn new(max_pending: Option<usize>) -> Self {
        Self {
            list: Mutex::new(RecordList::new()),
            max_pending,
        }
    }

    /// Appends previously cached records and then `record`, under one lock
    /// acquisition. Returns the number of records dropped to honor the cap.
    pub fn admit(&self, mut cached: RecordList, record: Record) -> usize {
        let mut list = self.list.lock();
        list.append(&mut cached);
        list.push_back(record);
        self.enforce_cap(&mut list)
    }

    /// Appends previously cached records without admitting anything new.
    pub fn merge(&self, mut cached: RecordList) -> usize {
        let mut list = self.list.lock();
        list.append(&mut cached);
        self.enforce_cap(&mut list)
    }

    /// Takes the whole queue followed by `cached` as one consumption batch.
    pub fn drain(&self, mut cached: RecordList) -> RecordList {
        let mut list = self.list.lock();
        list.append(&mut cached);
        list.detach()
    }

    /// Exclusive access to the underlying list.
    pub fn lock(&self) -> MutexGuard<'_, RecordList> {
        self.list.lock()
    }

    pub fn len(&self) -> usize {
        self.list.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_pending(&self) -> Option<usize> {
        self.max_pending
    }

    fn enforce_cap(&self, list: &mut RecordList) -> usize {
        match self.max_pending {
            Some(max) => list.truncate_front(max),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(tag: &str) -> Record {
        Record::new(tag.as_bytes().to_vec())
    }

    fn cached(tags: &[&str]) -> RecordList {
        tags.iter().map(|t| rec(t)).collect()
    }

    fn tags(list: &RecordList) -> Vec<String> {
        list.iter()
            .map(|r| String::from_utf8(r.payload().to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn test_admit_places_cached_before_new_record() {
        let queue = PassiveQueue::new(None);
        queue.admit(RecordList::new(), rec("a"));
        queue.admit(cached(&["b", "c"]), rec("d"));

        assert_eq!(tags(&queue.lock()), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_drain_puts_queue_before_cache() {
        let queue = PassiveQueue::new(None);
        queue.admit(RecordList::new(), rec("a"));

        let batch = queue.drain(cached(&["b"]));
        assert_eq!(tags(&batch), vec!["a", "b"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cap_drops_oldest() {
        let queue = PassiveQueue::new(Some(2));
        assert_eq!(queue.admit(RecordList::new(), rec("a")), 0);
        assert_eq!(queue.admit(RecordList::new(), rec("b")), 0);
        assert_eq!(queue.admit(cached(&["c"]), rec("d")), 2);

        assert_eq!(tags(&queue.lock()), vec!["c", "d"]);
        assert_eq!(queue.merge(cached(&["e"])), 1);
        assert_eq!(tags(&queue.lock()), vec!["d", "e"]);
    }
}
