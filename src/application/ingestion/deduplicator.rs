//! Idempotency guard keyed by click fingerprints.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};

use crate::domain::click_event::Fingerprint;

/// Remembers accepted fingerprints so each click is processed at most once.
///
/// The key set is bounded by `capacity`; once full, the oldest fingerprint is
/// forgotten to make room. Fingerprints are second-granular, so an evicted
/// key only matters if the same click is replayed long after the fact.
pub struct Deduplicator {
    capacity: usize,
    inner: Mutex<DedupInner>,
}

struct DedupInner {
    seen: HashSet<Fingerprint>,
    order: VecDeque<Fingerprint>,
}

impl Deduplicator {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(DedupInner {
                seen: HashSet::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Atomically records `fingerprint` if it is new.
    ///
    /// Returns `true` for exactly one caller per fingerprint; every other
    /// caller gets `false` and nothing changes.
    pub fn try_accept(&self, fingerprint: &Fingerprint) -> bool {
        let mut inner = self.inner.lock();

        if inner.seen.contains(fingerprint) {
            return false;
        }

        if inner.order.len() >= self.capacity
            && let Some(oldest) = inner.order.pop_front()
        {
            inner.seen.remove(&oldest);
        }

        inner.seen.insert(fingerprint.clone());
        inner.order.push_back(fingerprint.clone());
        true
    }

    /// Forgets a previously accepted fingerprint.
    ///
    /// Used when a click was accepted but could not be buffered, so a retry of
    /// the same click is not swallowed as a duplicate.
    pub fn release(&self, fingerprint: &Fingerprint) {
        let mut inner = self.inner.lock();

        if inner.seen.remove(fingerprint) {
            inner.order.retain(|f| f != fingerprint);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::click_event::ClickEvent;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn fingerprint(ad_id: &str, ip: &str, second: u32) -> Fingerprint {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, second).unwrap();
        ClickEvent::new(ad_id, ip, 0, at).fingerprint()
    }

    #[test]
    fn test_first_accept_wins() {
        let dedup = Deduplicator::new(10);
        let fp = fingerprint("tech-001", "203.0.113.5", 0);

        assert!(dedup.try_accept(&fp));
        assert!(!dedup.try_accept(&fp));
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn test_distinct_fingerprints_accepted() {
        let dedup = Deduplicator::new(10);

        assert!(dedup.try_accept(&fingerprint("tech-001", "203.0.113.5", 0)));
        assert!(dedup.try_accept(&fingerprint("tech-001", "203.0.113.5", 1)));
        assert!(dedup.try_accept(&fingerprint("tech-002", "203.0.113.5", 0)));
        assert_eq!(dedup.len(), 3);
    }

    #[test]
    fn test_oldest_evicted_at_capacity() {
        let dedup = Deduplicator::new(2);
        let first = fingerprint("a", "1.1.1.1", 0);
        let second = fingerprint("a", "1.1.1.1", 1);
        let third = fingerprint("a", "1.1.1.1", 2);

        assert!(dedup.try_accept(&first));
        assert!(dedup.try_accept(&second));
        assert!(dedup.try_accept(&third));

        assert_eq!(dedup.len(), 2);
        assert!(!dedup.try_accept(&second));
        assert!(dedup.try_accept(&first));
    }

    #[test]
    fn test_release_allows_retry() {
        let dedup = Deduplicator::new(10);
        let fp = fingerprint("tech-001", "203.0.113.5", 0);

        assert!(dedup.try_accept(&fp));
        dedup.release(&fp);

        assert!(dedup.is_empty());
        assert!(dedup.try_accept(&fp));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_identical_fingerprints_single_winner() {
        let dedup = Arc::new(Deduplicator::new(100));
        let fp = fingerprint("tech-001", "203.0.113.5", 0);

        let mut handles = Vec::new();
        for _ in 0..64 {
            let dedup = dedup.clone();
            let fp = fp.clone();
            handles.push(tokio::spawn(async move { dedup.try_accept(&fp) }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
    }
}
