//! Persistence backends for order manager state.
//!
//! Defines [`OrderStore`], the key-value abstraction the registry writes
//! through on every durable mutation, and its implementations:
//!
//! - [`NullOrderStore`]: discards writes, loads nothing
//! - [`MemoryOrderStore`]: in-process `MsgPack` blobs, for tests and headless use
//! - [`FileOrderStore`]: a single JSON preferences file on disk

pub mod backends;

use zorder_core::OrderManagerConfig;

pub use backends::{FileOrderStore, MemoryOrderStore, NullOrderStore};

/// Key-value store for persisted order manager records.
///
/// Keys have the form `family::categoryId` (see
/// [`persistence_key`](zorder_core::persistence_key)). Calls are synchronous
/// and expected to be fast; the registry logs failures and carries on.
///
/// Used as `Arc<dyn OrderStore>`.
pub trait OrderStore: Send + Sync {
    /// Load the record stored under `key`.
    ///
    /// Returns `None` if the key does not exist.
    fn load(&self, key: &str) -> anyhow::Result<Option<OrderManagerConfig>>;

    /// Persist `config` under `key`, replacing any previous record.
    fn store(&self, key: &str, config: &OrderManagerConfig) -> anyhow::Result<()>;

    /// All keys that currently hold a record, sorted.
    fn keys(&self) -> anyhow::Result<Vec<String>>;

    /// Whether this is a null (no-op) implementation.
    ///
    /// Returns `false` by default. Null implementations override to return `true`.
    fn is_null(&self) -> bool {
        false
    }
}
