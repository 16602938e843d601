//! In-memory [`OrderStore`] implementation backed by [`DashMap`].
//!
//! Records are kept as encoded `MsgPack` blobs, so loads exercise the same
//! decode path a real preferences backend would.

use dashmap::DashMap;
use zorder_core::OrderManagerConfig;

use crate::store::OrderStore;

/// Process-local `OrderStore` holding encoded records.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    records: DashMap<String, Vec<u8>>,
}

impl MemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw bytes under `key`, bypassing encoding.
    ///
    /// Lets callers seed records written by other tools, including malformed ones.
    pub fn insert_raw(&self, key: impl Into<String>, bytes: Vec<u8>) {
        self.records.insert(key.into(), bytes);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl OrderStore for MemoryOrderStore {
    fn load(&self, key: &str) -> anyhow::Result<Option<OrderManagerConfig>> {
        match self.records.get(key) {
            Some(bytes) => Ok(Some(OrderManagerConfig::from_msgpack(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn store(&self, key: &str, config: &OrderManagerConfig) -> anyhow::Result<()> {
        let bytes = config.to_msgpack()?;
        self.records.insert(key.to_string(), bytes);
        Ok(())
    }

    fn keys(&self) -> anyhow::Result<Vec<String>> {
        let mut keys: Vec<String> = self.records.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use zorder_core::{OrderCategory, ParticipantOrder};

    use super::*;

    fn config(ids: &[&str]) -> OrderManagerConfig {
        let participants = (0..)
            .zip(ids)
            .map(|(order, id)| ParticipantOrder {
                id: (*id).to_string(),
                order,
            })
            .collect();
        OrderManagerConfig::new("Test", OrderCategory::new("Cat", 0, 9), participants)
    }

    #[test]
    fn store_then_load_returns_record() {
        let store = MemoryOrderStore::new();
        store.store("Test::Cat", &config(&["a", "b"])).unwrap();
        assert_eq!(store.load("Test::Cat").unwrap(), Some(config(&["a", "b"])));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_replaces_previous_record() {
        let store = MemoryOrderStore::new();
        store.store("Test::Cat", &config(&["a", "b"])).unwrap();
        store.store("Test::Cat", &config(&["c"])).unwrap();
        assert_eq!(store.load("Test::Cat").unwrap(), Some(config(&["c"])));
    }

    #[test]
    fn missing_key_loads_none() {
        assert!(MemoryOrderStore::new().load("nope").unwrap().is_none());
    }

    #[test]
    fn malformed_blob_is_an_error() {
        let store = MemoryOrderStore::new();
        store.insert_raw("Test::Cat", vec![0xc1]);
        assert!(store.load("Test::Cat").is_err());
    }

    #[test]
    fn keys_are_sorted() {
        let store = MemoryOrderStore::new();
        store.store("b::x", &config(&[])).unwrap();
        store.store("a::y", &config(&[])).unwrap();
        assert_eq!(store.keys().unwrap(), ["a::y", "b::x"]);
        assert!(!store.is_null());
    }
}
