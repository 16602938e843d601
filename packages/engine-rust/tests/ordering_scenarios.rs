//! End-to-end ordering scenarios through the registry.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use zorder_engine::{
    FileOrderStore, MemoryOrderStore, OrderCategory, OrderChangeEvent, OrderChangeType,
    OrderManagerRegistry, OrderParticipantKey, OrderStore,
};

fn test_category() -> OrderCategory {
    OrderCategory::new("Layers", 0, 4)
}

fn key(id: &str) -> OrderParticipantKey {
    OrderParticipantKey::new("Test", test_category(), id)
}

fn ids_in_order(registry: &OrderManagerRegistry) -> Vec<(String, i32)> {
    registry
        .get_order_manager("Test", &test_category())
        .participant_orders()
        .into_iter()
        .map(|(key, order)| (key.id().to_string(), order))
        .collect()
}

#[test]
fn add_move_expunge_scenario() {
    let store = Arc::new(MemoryOrderStore::new());
    let registry = OrderManagerRegistry::new(Arc::clone(&store) as Arc<dyn OrderStore>);
    let manager = registry.get_order_manager("Test", &test_category());

    let events = Arc::new(Mutex::new(Vec::<OrderChangeEvent>::new()));
    let sink = Arc::clone(&events);
    manager.add_listener(Arc::new(move |event: &OrderChangeEvent| {
        sink.lock().push(event.clone());
    }));

    assert_eq!(manager.add_participant(&key("A")), Ok(0));
    assert_eq!(manager.add_participant(&key("B")), Ok(1));
    assert_eq!(manager.add_participant(&key("C")), Ok(2));

    // A takes C's old slot; B and C each drop by one.
    assert_eq!(manager.move_above(&key("A"), &key("C")), Ok(2));
    assert_eq!(
        ids_in_order(&registry),
        [("B".into(), 0), ("C".into(), 1), ("A".into(), 2)]
    );

    assert_eq!(manager.expunge_participant(&key("B")), Ok(0));
    assert_eq!(ids_in_order(&registry), [("C".into(), 0), ("A".into(), 1)]);

    assert!(manager.flush_notifications());
    let events = events.lock();
    assert!(events
        .iter()
        .all(|event| event.change_type() == OrderChangeType::OrderChanged));
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].changes(), &[(key("C"), 0), (key("A"), 1)]);

    let record = store.load("Test::Layers").unwrap().unwrap();
    let persisted: Vec<(String, i32)> = record
        .participants
        .into_iter()
        .map(|p| (p.id, p.order))
        .collect();
    assert_eq!(persisted, [("C".into(), 0), ("A".into(), 1)]);
}

#[test]
fn capacity_boundary() {
    let registry = OrderManagerRegistry::detached();
    let category = OrderCategory::new("Tiny", 10, 11);
    let manager = registry.get_order_manager("Test", &category);
    let make = |id: &str| OrderParticipantKey::new("Test", category.clone(), id);

    assert_eq!(manager.activate_participant(&make("a")), Ok(10));
    assert_eq!(manager.activate_participant(&make("b")), Ok(11));
    assert!(manager.activate_participant(&make("c")).is_err());
    assert_eq!(manager.get_order(&make("a")), Ok(10));
    assert_eq!(manager.get_order(&make("b")), Ok(11));
    assert_eq!(manager.get_active_participants(), vec![make("a"), make("b")]);
}

#[test]
fn file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.json");

    {
        let store = Arc::new(FileOrderStore::open(&path).unwrap());
        let registry = OrderManagerRegistry::new(store as Arc<dyn OrderStore>);
        let manager = registry.get_order_manager("Test", &test_category());
        manager.activate_participants(&[key("base"), key("roads"), key("labels")]);
        manager.move_to_bottom(&key("labels")).unwrap();
    }

    let store = Arc::new(FileOrderStore::open(&path).unwrap());
    let registry = OrderManagerRegistry::new(store as Arc<dyn OrderStore>);
    assert_eq!(
        ids_in_order(&registry),
        [("labels".into(), 0), ("base".into(), 1), ("roads".into(), 2)]
    );
    // Activation is session state and is not restored.
    let manager = registry.get_order_manager("Test", &test_category());
    assert!(manager.get_active_participants().is_empty());
}

#[test]
fn concurrent_mutations_keep_orders_unique() {
    let registry = OrderManagerRegistry::detached();
    let category = OrderCategory::new("Busy", 0, 63);
    let manager = registry.get_order_manager("Test", &category);

    let events = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&events);
    manager.add_listener(Arc::new(move |_: &OrderChangeEvent| {
        *sink.lock() += 1;
    }));

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let manager = Arc::clone(&manager);
            let category = category.clone();
            thread::spawn(move || {
                let keys: Vec<OrderParticipantKey> = (0..8)
                    .map(|i| {
                        OrderParticipantKey::new("Test", category.clone(), format!("w{worker}-{i}"))
                    })
                    .collect();
                for key in &keys {
                    manager.activate_participant(key).unwrap();
                }
                for pair in keys.windows(2) {
                    manager.move_below(&pair[1], &pair[0]).unwrap();
                }
                manager.move_to_top(&keys[0]).unwrap();
                manager.expunge_participant(&keys[7]).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let entries = manager.participant_orders();
    assert_eq!(entries.len(), 28);
    let orders: HashSet<i32> = entries.iter().map(|(_, order)| *order).collect();
    assert_eq!(orders, (0..28).collect::<HashSet<i32>>());
    assert_eq!(manager.get_active_participants().len(), 28);

    assert!(manager.flush_notifications());
    assert!(*events.lock() > 0);
}
