use std::{
    collections::{HashMap, VecDeque},
    hash::Hash,
};

/// A bounded associative cache with FIFO eviction: once the cache is
/// full, every insertion evicts the oldest entry, in insertion order.
/// Re-inserting an existing key replaces its value without refreshing
/// its position in the eviction queue.
///
/// # Examples:
///
/// ```
/// # use basalt_data_structures::cache::FifoMap;
/// let mut cache = FifoMap::with_capacity(2);
/// cache.insert("a", 1);
/// cache.insert("b", 2);
/// cache.insert("c", 3);
///
/// assert!(!cache.contains_key(&"a"));
/// assert_eq!(cache.get(&"c"), Some(&3));
/// ```
#[derive(Clone, Debug)]
pub struct FifoMap<K, V> {
    capacity: usize,
    order: VecDeque<K>,
    map: HashMap<K, V>,
}

impl<K, V> FifoMap<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Create a cache holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "FifoMap capacity must be greater than zero");

        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            map: HashMap::with_capacity(capacity),
        }
    }

    /// Insert an entry, evicting the oldest one if the cache is full.
    /// Returns the previous value for `key`, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(old) = self.map.insert(key.clone(), value) {
            return Some(old);
        }

        if self.order.len() == self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.map.remove(&evicted);
            }
        }
        self.order.push_back(key);

        None
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_follows_insertion_order() {
        let mut cache = FifoMap::with_capacity(3);
        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            cache.insert(*key, i);
        }

        cache.insert("d", 3);
        assert!(!cache.contains_key(&"a"));
        assert!(cache.contains_key(&"b"));

        cache.insert("e", 4);
        assert!(!cache.contains_key(&"b"));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn reinsert_replaces_value_without_reordering() {
        let mut cache = FifoMap::with_capacity(2);
        cache.insert("a", 1);
        cache.insert("b", 2);

        // "a" keeps its queue slot, so it is still the next to go
        assert_eq!(cache.insert("a", 10), Some(1));
        cache.insert("c", 3);

        assert!(!cache.contains_key(&"a"));
        assert!(cache.contains_key(&"b"));
        assert!(cache.contains_key(&"c"));
    }

    #[test]
    #[should_panic(expected = "capacity must be greater than zero")]
    fn zero_capacity_is_rejected() {
        let _cache: FifoMap<u8, u8> = FifoMap::with_capacity(0);
    }
}
