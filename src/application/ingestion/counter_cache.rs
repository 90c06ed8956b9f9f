//! In-memory per-ad click counters for hot reads.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::clock::Clock;

/// Snapshot of one ad's in-memory tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterEntry {
    pub count: u64,
    pub last_update: DateTime<Utc>,
}

/// Process-lifetime click counters, one entry per ad.
///
/// Writers take the map lock exclusively for the duration of one increment;
/// readers share it. Entries are never decremented or removed.
pub struct CounterCache {
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CounterEntry>>,
}

impl CounterCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Adds one click for `ad_id`, creating the entry on first use.
    pub fn increment(&self, ad_id: &str) {
        let now = self.clock.now();
        let mut entries = self.entries.write();

        match entries.get_mut(ad_id) {
            Some(entry) => {
                entry.count = entry.count.saturating_add(1);
                entry.last_update = now;
            }
            None => {
                entries.insert(
                    ad_id.to_string(),
                    CounterEntry {
                        count: 1,
                        last_update: now,
                    },
                );
            }
        }
    }

    /// Returns the cached count, or `None` if this process has not seen the ad.
    pub fn get(&self, ad_id: &str) -> Option<u64> {
        self.entries.read().get(ad_id).map(|entry| entry.count)
    }

    pub fn entry(&self, ad_id: &str) -> Option<CounterEntry> {
        self.entries.read().get(ad_id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use std::time::Duration;

    #[test]
    fn test_miss_returns_none() {
        let cache = CounterCache::new(Arc::new(ManualClock::default()));

        assert_eq!(cache.get("tech-001"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_increment_creates_and_stamps_entry() {
        let clock = Arc::new(ManualClock::default());
        let cache = CounterCache::new(clock.clone());

        cache.increment("tech-001");
        let first = cache.entry("tech-001").unwrap();
        assert_eq!(first.count, 1);
        assert_eq!(first.last_update, clock.now());

        clock.advance(Duration::from_secs(3));
        cache.increment("tech-001");

        let second = cache.entry("tech-001").unwrap();
        assert_eq!(second.count, 2);
        assert!(second.last_update > first.last_update);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let cache = Arc::new(CounterCache::new(Arc::new(ManualClock::default())));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..250 {
                    cache.increment("tech-001");
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.get("tech-001"), Some(2_000));
    }
}
