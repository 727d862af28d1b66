use crate::domain::{Record, RecordList};
use parking_lot::{Mutex, MutexGuard};

/// Admission tier for callers that must never be suspended.
///
/// The lock is only ever taken by spinning on `try_lock`, so a contended
/// insert burns a few cycles instead of parking the thread. Critical sections
/// are a single tail insert or a whole-list detach, both O(1).
#[derive(Debug, Default)]
pub struct NonBlockingCache {
    list: Mutex<RecordList>,
}

impl NonBlockingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: Record) {
        self.spin_lock().push_back(record);
    }

    /// Atomically takes everything cached since the last detach.
    pub fn detach(&self) -> RecordList {
        self.spin_lock().detach()
    }

    pub fn len(&self) -> usize {
        self.spin_lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn spin_lock(&self) -> MutexGuard<'_, RecordList> {
        loop {
            if let Some(guard) = self.list.try_lock() {
                return guard;
            }
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_detach_returns_insertion_order() {
        let cache = NonBlockingCache::new();
        for i in 0..5u8 {
            cache.insert(Record::new(vec![i]));
        }

        let detached = cache.detach();
        let order: Vec<u8> = detached.iter().map(|r| r.payload()[0]).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_detach_never_duplicates() {
        let cache = Arc::new(NonBlockingCache::new());
        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..1000u32 {
                        let id = p * 1000 + i;
                        cache.insert(Record::new(id.to_le_bytes().to_vec()));
                    }
                })
            })
            .collect();

        let detachers: Vec<_> = (0..3)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    for _ in 0..200 {
                        for record in cache.detach() {
                            let mut id = [0u8; 4];
                            id.copy_from_slice(record.payload());
                            seen.push(u32::from_le_bytes(id));
                        }
                        thread::yield_now();
                    }
                    seen
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }

        let mut all = Vec::new();
        for detacher in detachers {
            all.extend(detacher.join().unwrap());
        }
        for record in cache.detach() {
            let mut id = [0u8; 4];
            id.copy_from_slice(record.payload());
            all.push(u32::from_le_bytes(id));
        }

        let unique: HashSet<u32> = all.iter().copied().collect();
        assert_eq!(all.len(), 4000);
        assert_eq!(unique.len(), 4000);
    }
}
