//! Bounded caches for compiled formulas and execution results.

use std::collections::HashMap;
use std::hash::Hash;

/// A capacity-bounded map that evicts its least recently touched entry.
///
/// Both lookups and inserts advance a monotonic stamp; eviction scans for
/// the smallest stamp. Capacities are small enough that the linear scan
/// does not matter.
#[derive(Debug)]
pub(crate) struct BoundedCache<K, V> {
    entries: HashMap<K, (u64, V)>,
    capacity: usize,
    stamp: u64,
    hits: u64,
    misses: u64,
}

impl<K: Eq + Hash + Copy, V> BoundedCache<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
            stamp: 0,
            hits: 0,
            misses: 0,
        }
    }

    pub(crate) fn get(&mut self, key: &K) -> Option<&V> {
        self.stamp += 1;
        let stamp = self.stamp;
        match self.entries.get_mut(key) {
            Some((touched, value)) => {
                *touched = stamp;
                self.hits += 1;
                Some(value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub(crate) fn insert(&mut self, key: K, value: V) {
        self.stamp += 1;
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, (touched, _))| *touched)
                .map(|(k, _)| *k)
            {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(key, (self.stamp, value));
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) const fn hits(&self) -> u64 {
        self.hits
    }

    pub(crate) const fn misses(&self) -> u64 {
        self.misses
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

/// Cache occupancy and hit counters, per cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Compiled formulas currently cached.
    pub formula_entries: usize,
    /// Formula cache hits since the last clear.
    pub formula_hits: u64,
    /// Formula cache misses since the last clear.
    pub formula_misses: u64,
    /// Execution results currently cached.
    pub result_entries: usize,
    /// Result cache hits since the last clear.
    pub result_hits: u64,
    /// Result cache misses since the last clear.
    pub result_misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss_counters() {
        let mut cache: BoundedCache<u64, &str> = BoundedCache::new(4);
        assert!(cache.get(&1).is_none());
        cache.insert(1, "one");
        assert_eq!(cache.get(&1), Some(&"one"));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_eviction_prefers_least_recent() {
        let mut cache: BoundedCache<u64, u64> = BoundedCache::new(2);
        cache.insert(1, 10);
        cache.insert(2, 20);
        // Touch 1 so 2 becomes the eviction candidate.
        assert!(cache.get(&1).is_some());
        cache.insert(3, 30);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&1).is_some());
        assert!(cache.get(&2).is_none());
        assert!(cache.get(&3).is_some());
    }

    #[test]
    fn test_reinsert_does_not_evict() {
        let mut cache: BoundedCache<u64, u64> = BoundedCache::new(2);
        cache.insert(1, 10);
        cache.insert(2, 20);
        cache.insert(1, 11);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), Some(&11));
        assert_eq!(cache.get(&2), Some(&20));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut cache: BoundedCache<u64, u64> = BoundedCache::new(2);
        cache.insert(1, 10);
        let _ = cache.get(&1);
        cache.clear();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.hits(), 0);
        assert_eq!(cache.misses(), 0);
    }
}
