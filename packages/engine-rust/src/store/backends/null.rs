//! No-op [`OrderStore`] implementation.

use zorder_core::OrderManagerConfig;

use crate::store::OrderStore;

/// No-op `OrderStore` for headless and ephemeral orderings.
///
/// All writes succeed immediately without side effects and every load
/// misses, so each manager starts empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOrderStore;

impl OrderStore for NullOrderStore {
    fn load(&self, _key: &str) -> anyhow::Result<Option<OrderManagerConfig>> {
        Ok(None)
    }

    fn store(&self, _key: &str, _config: &OrderManagerConfig) -> anyhow::Result<()> {
        Ok(())
    }

    fn keys(&self) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn is_null(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use zorder_core::OrderCategory;

    use super::*;

    #[test]
    fn store_then_load_misses() {
        let store = NullOrderStore;
        let config = OrderManagerConfig::new("Test", OrderCategory::new("Cat", 0, 4), Vec::new());
        assert!(store.store("Test::Cat", &config).is_ok());
        assert!(store.load("Test::Cat").unwrap().is_none());
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn is_null_returns_true() {
        assert!(NullOrderStore.is_null());
    }
}
