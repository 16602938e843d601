//! Asynchronous change delivery for a single order manager.
//!
//! [`ChangeNotifier`] owns a dedicated worker thread that drains an unbounded
//! channel of change events and hands each one to the manager's
//! [`ListenerSet`]. Mutating callers only enqueue, so they never wait on
//! listener code, and listeners observe events strictly in enqueue order.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};
use zorder_core::OrderChangeEvent;

use crate::listener::{ListenerId, ListenerSet, OrderChangeListener};

// ---------------------------------------------------------------------------
// NotifierTask
// ---------------------------------------------------------------------------

/// Work items for the notification worker.
#[derive(Debug)]
enum NotifierTask {
    /// Deliver an event to all listeners.
    Deliver(OrderChangeEvent),
    /// Acknowledge once every previously queued event has been delivered.
    Flush(oneshot::Sender<()>),
}

// ---------------------------------------------------------------------------
// ChangeNotifier
// ---------------------------------------------------------------------------

/// Single-threaded, FIFO dispatcher of [`OrderChangeEvent`]s.
///
/// The worker thread exits once the notifier is dropped and the queue has
/// drained.
pub struct ChangeNotifier {
    listeners: Arc<ListenerSet>,
    tx: mpsc::UnboundedSender<NotifierTask>,
    worker: Option<ThreadId>,
}

impl ChangeNotifier {
    /// Starts the worker thread. `name` labels the thread and its log lines.
    ///
    /// If the thread cannot be spawned the failure is logged and events are
    /// discarded; mutations themselves are unaffected.
    #[must_use]
    pub fn start(name: &str) -> Self {
        let listeners = Arc::new(ListenerSet::new());
        let (tx, mut rx) = mpsc::unbounded_channel::<NotifierTask>();

        let worker_listeners = Arc::clone(&listeners);
        let worker_name = name.to_string();
        let spawned = thread::Builder::new()
            .name(format!("zorder-notify {name}"))
            .spawn(move || {
                while let Some(task) = rx.blocking_recv() {
                    match task {
                        NotifierTask::Deliver(event) => worker_listeners.notify(&event),
                        NotifierTask::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
                debug!(manager = %worker_name, "notification worker stopped");
            });

        let worker = match spawned {
            Ok(handle) => Some(handle.thread().id()),
            Err(err) => {
                error!(manager = %name, error = %err, "failed to start notification worker");
                None
            }
        };

        Self {
            listeners,
            tx,
            worker,
        }
    }

    /// Subscribes a listener to all subsequently delivered events.
    pub fn add_listener(&self, listener: Arc<dyn OrderChangeListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Unsubscribes a listener. Returns `false` if it was not subscribed.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Queues `event` for delivery. Empty events are dropped.
    pub fn dispatch(&self, event: OrderChangeEvent) {
        if event.is_empty() {
            return;
        }
        if self.tx.send(NotifierTask::Deliver(event)).is_err() {
            warn!("notification worker is not running, change event dropped");
        }
    }

    /// Blocks until every event queued before this call has been delivered.
    ///
    /// Returns `false` without waiting when called from a listener (the
    /// worker thread itself) or when the worker is not running.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context, as
    /// the wait is a blocking receive.
    pub fn flush(&self) -> bool {
        if self.worker.is_none() || self.worker == Some(thread::current().id()) {
            return false;
        }
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(NotifierTask::Flush(done_tx)).is_err() {
            return false;
        }
        done_rx.blocking_recv().is_ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use parking_lot::Mutex;
    use zorder_core::{OrderCategory, OrderChangeType, OrderParticipantKey};

    use super::*;

    fn event(id: &str, order: i32) -> OrderChangeEvent {
        let key = OrderParticipantKey::new("Test", OrderCategory::new("Cat", 0, 99), id);
        OrderChangeEvent::new(OrderChangeType::OrderChanged, vec![(key, order)])
    }

    fn recording(notifier: &ChangeNotifier) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        notifier.add_listener(Arc::new(move |event: &OrderChangeEvent| {
            sink.lock()
                .extend(event.keys().map(|key| key.id().to_string()));
        }));
        seen
    }

    #[test]
    fn events_arrive_in_dispatch_order() {
        let notifier = ChangeNotifier::start("test");
        let seen = recording(&notifier);

        for i in 0..50 {
            notifier.dispatch(event(&format!("p{i}"), i));
        }
        assert!(notifier.flush());

        let expected: Vec<String> = (0..50).map(|i| format!("p{i}")).collect();
        assert_eq!(*seen.lock(), expected);
    }

    #[test]
    fn delivery_runs_off_the_calling_thread() {
        let notifier = ChangeNotifier::start("test");
        let caller = thread::current().id();
        let same_thread = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&same_thread);
        notifier.add_listener(Arc::new(move |_: &OrderChangeEvent| {
            flag.store(thread::current().id() == caller, Ordering::SeqCst);
        }));

        notifier.dispatch(event("a", 0));
        assert!(notifier.flush());
        assert!(!same_thread.load(Ordering::SeqCst));
    }

    #[test]
    fn empty_events_are_not_delivered() {
        let notifier = ChangeNotifier::start("test");
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        notifier.add_listener(Arc::new(move |_: &OrderChangeEvent| {
            *sink.lock() += 1;
        }));

        notifier.dispatch(OrderChangeEvent::new(OrderChangeType::Activated, Vec::new()));
        assert!(notifier.flush());
        assert_eq!(*seen.lock(), 0);
    }

    #[test]
    fn removed_listener_misses_later_events() {
        let notifier = ChangeNotifier::start("test");
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        let id = notifier.add_listener(Arc::new(move |_: &OrderChangeEvent| {
            *sink.lock() += 1;
        }));

        notifier.dispatch(event("a", 0));
        assert!(notifier.flush());
        assert!(notifier.remove_listener(id));
        notifier.dispatch(event("b", 1));
        assert!(notifier.flush());

        assert_eq!(*seen.lock(), 1);
        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn flush_from_listener_does_not_deadlock() {
        let notifier = Arc::new(ChangeNotifier::start("test"));
        let inner = Arc::clone(&notifier);
        let flushed = Arc::new(Mutex::new(None));
        let result = Arc::clone(&flushed);
        notifier.add_listener(Arc::new(move |_: &OrderChangeEvent| {
            *result.lock() = Some(inner.flush());
        }));

        notifier.dispatch(event("a", 0));
        assert!(notifier.flush());
        assert_eq!(*flushed.lock(), Some(false));
    }
}
