//! Bounded decoded-result cache with pin-aware eviction.
//!
//! Decode results are expensive and the rendering layer holds them across
//! frames, so a plain LRU would happily evict a texture mid-upload. Entries
//! here are handed out as [`Arc`]s; an entry is considered pinned while any
//! caller-held clone is alive, and eviction only ever removes unpinned
//! entries. The cache may therefore temporarily exceed its capacity when
//! everything is pinned.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// A bounded least-recently-used cache keyed by content identity.
#[derive(Debug)]
pub struct PinnedCache<K, V> {
    entries: HashMap<K, Entry<V>>,
    capacity: usize,
    clock: u64,
}

#[derive(Debug)]
struct Entry<V> {
    value: Arc<V>,
    last_use: u64,
}

impl<K: Eq + Hash + Clone, V> PinnedCache<K, V> {
    /// Creates a cache holding at most `capacity` unpinned entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
        }
    }

    /// Number of cached entries, pinned or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up an entry, refreshing its recency on a hit.
    pub fn get(&mut self, key: &K) -> Option<Arc<V>> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(key).map(|entry| {
            entry.last_use = clock;
            Arc::clone(&entry.value)
        })
    }

    /// Inserts a value, evicting the least recently used unpinned entries
    /// to stay within capacity, and returns a pinned handle to it.
    pub fn insert(&mut self, key: K, value: V) -> Arc<V> {
        self.clock += 1;
        let value = Arc::new(value);
        self.entries.insert(
            key,
            Entry {
                value: Arc::clone(&value),
                last_use: self.clock,
            },
        );
        self.evict_to_capacity();
        value
    }

    /// Drops unpinned entries, oldest first, until within capacity or only
    /// pinned entries remain.
    fn evict_to_capacity(&mut self) {
        while self.entries.len() > self.capacity {
            let victim = self
                .entries
                .iter()
                .filter(|(_, entry)| Arc::strong_count(&entry.value) == 1)
                .min_by_key(|(_, entry)| entry.last_use)
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}
