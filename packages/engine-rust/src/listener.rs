//! Order change listeners and their fan-out set.
//!
//! Defines [`OrderChangeListener`] for reacting to order changes within an
//! [`OrderManager`](crate::OrderManager), and [`ListenerSet`] which fans out
//! each event to every subscribed listener.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::error;
use zorder_core::OrderChangeEvent;

/// Observer for participant changes within an order manager.
///
/// Called on the manager's notification thread, never concurrently with
/// another callback from the same manager.
///
/// Used as `Arc<dyn OrderChangeListener>`; closures taking
/// `&OrderChangeEvent` implement it directly.
pub trait OrderChangeListener: Send + Sync {
    fn on_order_changed(&self, event: &OrderChangeEvent);
}

impl<F> OrderChangeListener for F
where
    F: Fn(&OrderChangeEvent) + Send + Sync,
{
    fn on_order_changed(&self, event: &OrderChangeEvent) {
        self(event);
    }
}

/// Handle returned on subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Entries = Vec<(ListenerId, Arc<dyn OrderChangeListener>)>;

/// Subscribed listeners, held strongly until explicitly removed.
///
/// Reads take a lock-free snapshot, so delivery never blocks subscription
/// changes made from other threads.
pub struct ListenerSet {
    listeners: ArcSwap<Entries>,
    next_id: AtomicU64,
}

impl ListenerSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Subscribes `listener` and returns its handle.
    pub fn add(&self, listener: Arc<dyn OrderChangeListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.rcu(|current| {
            let mut next: Entries = (**current).clone();
            next.push((id, Arc::clone(&listener)));
            next
        });
        id
    }

    /// Unsubscribes the listener registered under `id`.
    ///
    /// Returns `false` if no such listener was subscribed.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut removed = false;
        self.listeners.rcu(|current| {
            let next: Entries = current
                .iter()
                .filter(|(candidate, _)| *candidate != id)
                .cloned()
                .collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.load().is_empty()
    }

    /// Delivers `event` to every subscribed listener in subscription order.
    ///
    /// A panicking listener is logged and skipped; the remaining listeners
    /// still receive the event.
    pub fn notify(&self, event: &OrderChangeEvent) {
        let snapshot = self.listeners.load();
        for (id, listener) in snapshot.iter() {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
                listener.on_order_changed(event);
            }));
            if delivered.is_err() {
                error!(
                    listener = id.0,
                    change_type = ?event.change_type(),
                    "order change listener panicked"
                );
            }
        }
    }
}

impl Default for ListenerSet {
    fn default() -> Self {
        Self::new()
    }
}
