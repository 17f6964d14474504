use std::collections::HashMap;
use std::hash::Hash;

/// Two-way map. Keys are unique; when several keys share a value, the reverse
/// lookup keeps the first key inserted for it.
#[derive(Debug, Clone)]
pub struct BiMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
{
    forward: HashMap<K, V>,
    reverse: HashMap<V, K>,
}

impl<K, V> Default for BiMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> BiMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    /// Insert a pair. Returns `false` (and leaves the map untouched) if `key` is
    /// already present.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        if self.forward.contains_key(&key) {
            return false;
        }
        self.reverse
            .entry(value.clone())
            .or_insert_with(|| key.clone());
        self.forward.insert(key, value);
        true
    }

    pub fn get_by_key(&self, key: &K) -> Option<&V> {
        self.forward.get(key)
    }

    pub fn get_by_value(&self, value: &V) -> Option<&K> {
        self.reverse.get(value)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod bimap_test {
    use super::*;

    #[test]
    fn test_first_key_wins_in_reverse() {
        let mut map: BiMap<String, u32> = BiMap::new();
        assert!(map.insert("R00_S00".into(), 0));
        assert!(map.insert("R03_S00".into(), 0));
        assert!(!map.insert("R00_S00".into(), 5));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get_by_key(&"R03_S00".to_string()), Some(&0));
        assert_eq!(map.get_by_key(&"R00_S00".to_string()), Some(&0));
        assert_eq!(map.get_by_value(&0).map(String::as_str), Some("R00_S00"));
        assert!(map.get_by_value(&5).is_none());
    }
}
