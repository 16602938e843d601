//! `zorder` Engine — layer order managers, their registry, and persistence backends.

pub mod error;
pub mod index;
pub mod listener;
pub mod manager;
pub mod notifier;
pub mod registry;
pub mod store;

pub use error::OrderError;
pub use listener::{ListenerId, OrderChangeListener};
pub use manager::OrderManager;
pub use registry::{OrderManagerRegistry, RegistryConfig};
pub use store::{FileOrderStore, MemoryOrderStore, NullOrderStore, OrderStore};

pub use zorder_core::{
    OrderCategory, OrderChangeEvent, OrderChangeType, OrderManagerConfig, OrderParticipantKey,
};
