//! In-memory key-value store.
//!
//! Backed by a `BTreeMap`, so prefix scans are naturally ordered. Useful
//! for unit tests, simulations, and small devnets.

use std::collections::BTreeMap;

use super::KvStore;

/// In-memory implementation of [`KvStore`].
#[derive(Default)]
pub struct MemKvStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemKvStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemKvStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.entries.insert(key.to_vec(), value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete_roundtrip() {
        let mut store = MemKvStore::new();
        store.set(b"a", b"1".to_vec());

        assert_eq!(store.get(b"a"), Some(b"1".to_vec()));
        assert_eq!(store.len(), 1);

        store.delete(b"a");
        assert!(store.get(b"a").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn prefix_scan_is_ordered_and_bounded() {
        let mut store = MemKvStore::new();
        store.set(b"builder/b", b"2".to_vec());
        store.set(b"builder/a", b"1".to_vec());
        store.set(b"builder/c", b"3".to_vec());
        store.set(b"proposer/a", b"x".to_vec());

        let hits = store.prefix_scan(b"builder/");
        let keys: Vec<&[u8]> = hits.iter().map(|(k, _)| k.as_slice()).collect();
        assert_eq!(keys, vec![b"builder/a" as &[u8], b"builder/b", b"builder/c"]);
    }

    #[test]
    fn prefix_scan_with_empty_prefix_returns_everything() {
        let mut store = MemKvStore::new();
        store.set(b"x", b"1".to_vec());
        store.set(b"y", b"2".to_vec());
        assert_eq!(store.prefix_scan(b"").len(), 2);
    }
}
