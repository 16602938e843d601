//! Registry of order managers, keyed by `(family, category)`.
//!
//! [`OrderManagerRegistry`] lazily creates one [`OrderManager`] per family
//! and category, hydrates it from the configured [`OrderStore`], and writes
//! every durable mutation back through that store. The registry's cache is
//! guarded by its own lock, separate from each manager's state lock.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};
use zorder_core::{persistence_key, OrderCategory, OrderManagerConfig, OrderParticipantKey};

use crate::manager::OrderManager;
use crate::store::OrderStore;

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Behavior switches for an [`OrderManagerRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Warn when a new category's range overlaps another category in the
    /// same family.
    pub check_overlaps: bool,
    /// Write a manager's record as soon as it is created, establishing it
    /// in the store even before the first mutation.
    pub persist_on_create: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            check_overlaps: true,
            persist_on_create: true,
        }
    }
}

// ---------------------------------------------------------------------------
// RegistryShared
// ---------------------------------------------------------------------------

type ManagerCache = BTreeMap<String, BTreeMap<String, Arc<OrderManager>>>;

/// State shared between the registry handle and the managers it owns.
pub(crate) struct RegistryShared {
    store: Option<Arc<dyn OrderStore>>,
    config: RegistryConfig,
    /// family -> category id -> manager.
    managers: RwLock<ManagerCache>,
}

impl RegistryShared {
    /// Writes `config` through the store. Failures are logged, not returned.
    pub(crate) fn save_config(&self, config: &OrderManagerConfig) {
        let Some(store) = &self.store else {
            return;
        };
        let key = config.persistence_key();
        match store.store(&key, config) {
            Ok(()) => debug!(
                key = %key,
                participants = config.participants.len(),
                "order manager persisted"
            ),
            Err(err) => warn!(key = %key, error = %err, "failed to persist order manager"),
        }
    }

    fn load_participants(
        &self,
        family: &str,
        category: &OrderCategory,
    ) -> Option<OrderManagerConfig> {
        let store = self.store.as_ref()?;
        let key = persistence_key(family, category.id());
        match store.load(&key) {
            Ok(Some(config)) => {
                if !config.category.same_range(category) {
                    debug!(key = %key, persisted = %config.category, requested = %category,
                        "persisted category range differs from requested range");
                }
                Some(config)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(key = %key, error = %err,
                    "failed to load persisted order manager, starting empty");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// OrderManagerRegistry
// ---------------------------------------------------------------------------

/// Keyed cache of [`OrderManager`]s with write-through persistence.
///
/// Cloning the registry yields another handle to the same cache. Managers
/// keep only a weak link back, so once every handle is dropped their
/// mutations are no longer persisted.
#[derive(Clone)]
pub struct OrderManagerRegistry {
    shared: Arc<RegistryShared>,
}

impl fmt::Debug for OrderManagerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let managers = self.shared.managers.read();
        f.debug_struct("OrderManagerRegistry")
            .field("config", &self.shared.config)
            .field("has_store", &self.shared.store.is_some())
            .field("families", &managers.len())
            .finish_non_exhaustive()
    }
}

impl OrderManagerRegistry {
    /// Creates a registry persisting through `store` with default settings.
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self::with_config(Some(store), RegistryConfig::default())
    }

    /// Creates a registry without a persistence backend.
    ///
    /// Managers start empty and [`save_orders`](Self::save_orders) is a no-op.
    #[must_use]
    pub fn detached() -> Self {
        Self::with_config(None, RegistryConfig::default())
    }

    /// Creates a registry with explicit settings. A store that reports
    /// [`is_null`](OrderStore::is_null) is treated as no store at all.
    #[must_use]
    pub fn with_config(store: Option<Arc<dyn OrderStore>>, config: RegistryConfig) -> Self {
        let store = store.filter(|store| !store.is_null());
        Self {
            shared: Arc::new(RegistryShared {
                store,
                config,
                managers: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.shared.config
    }

    /// Returns the manager for `(family, category)`, creating it on first use.
    ///
    /// A cached manager is returned even if its range differs from
    /// `category`'s; the mismatch is logged. A new manager is hydrated from
    /// the store (starting empty if there is no usable record) and persisted
    /// once immediately.
    pub fn get_order_manager(&self, family: &str, category: &OrderCategory) -> Arc<OrderManager> {
        if let Some(existing) = self.cached(family, category) {
            return existing;
        }

        let mut managers = self.shared.managers.write();
        let categories = managers.entry(family.to_string()).or_default();
        if let Some(existing) = categories.get(category.id()) {
            warn_on_range_mismatch(existing, category);
            return Arc::clone(existing);
        }

        if self.shared.config.check_overlaps {
            for other in categories.values() {
                if other.category().overlaps(category) {
                    warn!(family, category = %category, other = %other.category(),
                        "order category ranges overlap within family");
                }
            }
        }

        let persisted = self.shared.load_participants(family, category);
        let participants = persisted.map(|config| config.participants).unwrap_or_default();
        let manager = Arc::new(OrderManager::hydrated(
            family,
            category.clone(),
            &participants,
            Some(Arc::downgrade(&self.shared)),
        ));
        categories.insert(category.id().to_string(), Arc::clone(&manager));
        drop(managers);

        debug!(family, category = %category, participants = manager.len(), "order manager created");
        if self.shared.config.persist_on_create {
            self.save_orders(&manager);
        }
        manager
    }

    /// Returns the manager for the ordering domain `key` belongs to.
    pub fn order_manager_for(&self, key: &OrderParticipantKey) -> Arc<OrderManager> {
        self.get_order_manager(key.family(), key.category())
    }

    /// Serializes `manager` and writes it through the store.
    ///
    /// No-op when the registry has no store.
    pub fn save_orders(&self, manager: &OrderManager) {
        if self.shared.store.is_none() {
            return;
        }
        manager.persist_with(|config| self.shared.save_config(config));
    }

    /// The record [`save_orders`](Self::save_orders) would write for `manager`.
    #[must_use]
    pub fn snapshot(&self, manager: &OrderManager) -> OrderManagerConfig {
        manager.to_config()
    }

    /// Families with at least one manager, sorted.
    #[must_use]
    pub fn get_families(&self) -> Vec<String> {
        self.shared.managers.read().keys().cloned().collect()
    }

    /// Categories with a manager in `family`, ascending by range.
    #[must_use]
    pub fn get_categories_for_family(&self, family: &str) -> Vec<OrderCategory> {
        let managers = self.shared.managers.read();
        let mut categories: Vec<OrderCategory> = managers
            .get(family)
            .map(|by_id| by_id.values().map(|m| m.category().clone()).collect())
            .unwrap_or_default();
        categories.sort_by(|a, b| (a.min(), a.id()).cmp(&(b.min(), b.id())));
        categories
    }

    /// Distinct categories across all families, ascending by range.
    #[must_use]
    pub fn get_all_categories(&self) -> Vec<OrderCategory> {
        let managers = self.shared.managers.read();
        let mut by_id: BTreeMap<&str, &OrderCategory> = BTreeMap::new();
        for manager in managers.values().flat_map(BTreeMap::values) {
            by_id.entry(manager.category().id()).or_insert(manager.category());
        }
        let mut categories: Vec<OrderCategory> = by_id.into_values().cloned().collect();
        categories.sort_by(|a, b| (a.min(), a.id()).cmp(&(b.min(), b.id())));
        categories
    }

    fn cached(&self, family: &str, category: &OrderCategory) -> Option<Arc<OrderManager>> {
        let managers = self.shared.managers.read();
        let existing = managers.get(family)?.get(category.id())?;
        warn_on_range_mismatch(existing, category);
        Some(Arc::clone(existing))
    }
}

fn warn_on_range_mismatch(existing: &OrderManager, requested: &OrderCategory) {
    if !existing.category().same_range(requested) {
        warn!(family = %existing.family(), stored = %existing.category(), requested = %requested,
            "requested category range differs from the cached manager's, keeping cached range");
    }
}
