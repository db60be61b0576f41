//! A bounded, insertion-and-access-ordered map.
//!
//! Recency is tracked by reinsertion order: touching an entry moves it to
//! the back of the underlying [`IndexMap`], so the front is always the
//! least-recently-used entry. Lookups are by key rather than a walk by
//! age, since rollback points and operations are addressed by ID.

use indexmap::IndexMap;
use std::hash::Hash;

/// A map bounded to `max_items` entries, evicting the least-recently
/// touched entry on overflow.
#[derive(Debug, Clone)]
pub struct LruMap<K, V> {
    entries: IndexMap<K, V>,
    max_items: usize,
}

impl<K: Hash + Eq + Clone, V> LruMap<K, V> {
    /// Creates an empty map bounded to `max_items` entries.
    #[must_use]
    pub fn new(max_items: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            max_items: max_items.max(1),
        }
    }

    /// Inserts or replaces an entry, marking it most-recently-used.
    /// Returns the evicted entry's key and value, if insertion overflowed
    /// capacity.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.entries.shift_remove(&key);
        self.entries.insert(key, value);
        if self.entries.len() > self.max_items {
            self.entries.shift_remove_index(0)
        } else {
            None
        }
    }

    /// Looks up an entry, marking it most-recently-used on hit.
    pub fn get_touch(&mut self, key: &K) -> Option<&V> {
        let (_, value) = self.entries.shift_remove_entry(key)?;
        self.entries.insert(key.clone(), value);
        self.entries.get(key)
    }

    /// Looks up an entry without affecting recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Removes an entry regardless of recency.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.shift_remove(key)
    }

    /// Removes every entry matching `predicate`, returning the removed
    /// key/value pairs.
    pub fn retain_remove<F>(&mut self, mut predicate: F) -> Vec<(K, V)>
    where
        F: FnMut(&K, &V) -> bool,
    {
        let to_remove: Vec<K> = self
            .entries
            .iter()
            .filter(|(k, v)| predicate(k, v))
            .map(|(k, _)| k.clone())
            .collect();
        to_remove
            .into_iter()
            .filter_map(|k| self.remove(&k).map(|v| (k, v)))
            .collect()
    }

    /// The number of entries currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates entries in least-to-most-recently-used order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_evicts_least_recently_used_on_overflow() {
        let mut map: LruMap<&str, i32> = LruMap::new(2);
        assert!(map.insert("p1", 1).is_none());
        assert!(map.insert("p2", 2).is_none());
        map.get_touch(&"p1");
        let evicted = map.insert("p3", 3);
        assert_eq!(evicted, Some(("p2", 2)));
        assert!(map.peek(&"p1").is_some());
        assert!(map.peek(&"p3").is_some());
        assert!(map.peek(&"p2").is_none());
    }

    #[test]
    fn get_touch_refreshes_recency() {
        let mut map: LruMap<&str, i32> = LruMap::new(2);
        map.insert("a", 1);
        map.insert("b", 2);
        map.get_touch(&"a");
        let evicted = map.insert("c", 3);
        assert_eq!(evicted, Some(("b", 2)));
    }

    #[test]
    fn peek_does_not_affect_eviction_order() {
        let mut map: LruMap<&str, i32> = LruMap::new(2);
        map.insert("a", 1);
        map.insert("b", 2);
        map.peek(&"a");
        let evicted = map.insert("c", 3);
        assert_eq!(evicted, Some(("a", 1)));
    }

    #[test]
    fn retain_remove_filters_by_predicate() {
        let mut map: LruMap<&str, i32> = LruMap::new(10);
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("c", 3);
        let removed = map.retain_remove(|_, v| *v % 2 == 0);
        assert_eq!(removed.len(), 1);
        assert_eq!(map.len(), 2);
    }
}
