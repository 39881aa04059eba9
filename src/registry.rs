//! Weak identity-keyed association table
//!
//! The compositor needs two side tables keyed by object identity: redirected
//! source → cover track, and cover track → per-track render state. Neither
//! table may extend the lifetime of its key, otherwise superseded tracks and
//! streams would accumulate for the page's lifetime. Entries hold `Weak` keys
//! and are pruned opportunistically on access.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Weak, identity-keyed map. `V` is stored by value; callers read a copy,
/// mutate it, and write it back.
pub struct WeakKeyMap<K, V> {
    entries: Mutex<Vec<(Weak<K>, V)>>,
}

impl<K, V: Clone> WeakKeyMap<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self, key: &Arc<K>) -> Option<V> {
        let mut entries = self.entries.lock();
        Self::prune(&mut entries);
        entries
            .iter()
            .find(|(weak, _)| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(key)))
            .map(|(_, value)| value.clone())
    }

    pub fn set(&self, key: &Arc<K>, value: V) {
        let mut entries = self.entries.lock();
        Self::prune(&mut entries);
        if let Some(entry) = entries
            .iter_mut()
            .find(|(weak, _)| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(key)))
        {
            entry.1 = value;
        } else {
            entries.push((Arc::downgrade(key), value));
        }
    }

    pub fn remove(&self, key: &Arc<K>) -> Option<V> {
        let mut entries = self.entries.lock();
        Self::prune(&mut entries);
        let index = entries
            .iter()
            .position(|(weak, _)| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(key)))?;
        Some(entries.swap_remove(index).1)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let mut entries = self.entries.lock();
        Self::prune(&mut entries);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(entries: &mut Vec<(Weak<K>, V)>) {
        entries.retain(|(weak, _)| weak.strong_count() > 0);
    }
}

impl<K, V: Clone> Default for WeakKeyMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_remove() {
        let map: WeakKeyMap<u32, String> = WeakKeyMap::new();
        let key = Arc::new(7);
        assert!(map.get(&key).is_none());
        map.set(&key, "a".into());
        assert_eq!(map.get(&key).as_deref(), Some("a"));
        map.set(&key, "b".into());
        assert_eq!(map.get(&key).as_deref(), Some("b"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.remove(&key).as_deref(), Some("b"));
        assert!(map.get(&key).is_none());
    }

    #[test]
    fn test_identity_not_equality() {
        let map: WeakKeyMap<u32, u8> = WeakKeyMap::new();
        let a = Arc::new(1);
        let b = Arc::new(1);
        map.set(&a, 10);
        assert!(map.get(&b).is_none());
        map.set(&b, 20);
        assert_eq!(map.get(&a), Some(10));
        assert_eq!(map.get(&b), Some(20));
    }

    #[test]
    fn test_dropped_keys_are_reclaimed() {
        let map: WeakKeyMap<u32, u8> = WeakKeyMap::new();
        let keep = Arc::new(1);
        map.set(&keep, 1);
        {
            let gone = Arc::new(2);
            map.set(&gone, 2);
            assert_eq!(map.len(), 2);
        }
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&keep), Some(1));
    }
}
