use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Per-stream state with last-activity timestamps and a capacity bound.
///
/// Entries are reclaimed three ways: explicitly by [`remove`](Self::remove),
/// by [`sweep`](Self::sweep) once idle past a timeout, or by eviction of the
/// least recently active entry when an insert would exceed the capacity.
#[derive(Debug)]
pub struct StreamTable<K, V> {
    entries: HashMap<K, Entry<V>>,
    capacity: usize,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    touched: Instant,
}

impl<K, V> StreamTable<K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Create a table holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key).map(|e| &mut e.value)
    }

    /// Time since the entry was last inserted or touched.
    pub fn idle_for(&self, key: &K, now: Instant) -> Option<Duration> {
        self.entries
            .get(key)
            .map(|e| now.saturating_duration_since(e.touched))
    }

    /// Insert or replace an entry, stamping it with `now`.
    ///
    /// Returns the evicted entry when a new key pushed the table past its
    /// capacity.
    pub fn insert(&mut self, key: K, value: V, now: Instant) -> Option<(K, V)> {
        let mut evicted = None;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            evicted = self.evict_oldest();
        }
        self.entries.insert(
            key,
            Entry {
                value,
                touched: now,
            },
        );
        evicted
    }

    /// Refresh an entry's activity timestamp.
    pub fn touch(&mut self, key: &K, now: Instant) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.touched = now;
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|e| e.value)
    }

    /// Drop entries idle for longer than `timeout`. Returns how many went.
    pub fn sweep(&mut self, now: Instant, timeout: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.touched) <= timeout);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "swept idle streams");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    fn evict_oldest(&mut self) -> Option<(K, V)> {
        let key = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.touched)
            .map(|(k, _)| k.clone())?;
        let entry = self.entries.remove(&key)?;
        warn!(?key, capacity = self.capacity, "stream table full; evicted oldest entry");
        Some((key, entry.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_replace() {
        let now = Instant::now();
        let mut table = StreamTable::new(4);
        assert!(table.insert(1u32, "a", now).is_none());
        assert!(table.insert(1u32, "b", now).is_none());
        assert_eq!(table.get(&1), Some(&"b"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn evicts_least_recently_active() {
        let t0 = Instant::now();
        let mut table = StreamTable::new(2);
        table.insert(1u32, (), t0);
        table.insert(2u32, (), t0 + Duration::from_millis(1));
        table.touch(&1, t0 + Duration::from_millis(2));

        let evicted = table.insert(3u32, (), t0 + Duration::from_millis(3));
        assert_eq!(evicted.map(|(k, _)| k), Some(2));
        assert_eq!(table.len(), 2);
        assert!(table.get(&1).is_some());
        assert!(table.get(&3).is_some());
    }

    #[test]
    fn sweep_drops_idle_entries() {
        let t0 = Instant::now();
        let timeout = Duration::from_millis(100);
        let mut table = StreamTable::new(8);
        table.insert("old", 1, t0);
        table.insert("new", 2, t0 + Duration::from_millis(90));

        assert_eq!(table.sweep(t0 + Duration::from_millis(100), timeout), 0);
        assert_eq!(table.sweep(t0 + Duration::from_millis(101), timeout), 1);
        assert_eq!(table.keys().copied().collect::<Vec<_>>(), vec!["new"]);
    }

    #[test]
    fn idle_time() {
        let t0 = Instant::now();
        let mut table = StreamTable::new(1);
        table.insert(7u8, (), t0);
        assert_eq!(
            table.idle_for(&7, t0 + Duration::from_millis(5)),
            Some(Duration::from_millis(5))
        );
        assert_eq!(table.idle_for(&8, t0), None);
        assert_eq!(table.remove(&7), Some(()));
        assert!(table.is_empty());
    }

    #[test]
    fn capacity_floor_is_one() {
        let table: StreamTable<u8, ()> = StreamTable::new(0);
        assert_eq!(table.capacity(), 1);
    }
}
