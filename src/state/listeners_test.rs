use super::*;

use std::sync::Mutex as StdMutex;

fn recording_registry() -> (ListenerRegistry<u32>, Arc<StdMutex<Vec<String>>>) {
    (ListenerRegistry::default(), Arc::new(StdMutex::new(Vec::new())))
}

fn record(log: &Arc<StdMutex<Vec<String>>>, label: &str) -> impl Fn(u32) + Send + Sync + use<> {
    let log = log.clone();
    let label = label.to_owned();
    move |value| log.lock().unwrap().push(format!("{label}:{value}"))
}

// =============================================================
// Ordering
// =============================================================

#[test]
fn listeners_fire_in_registration_order() {
    let (registry, log) = recording_registry();
    let _a = registry.add(record(&log, "a"));
    let _b = registry.add(record(&log, "b"));
    let _c = registry.add(record(&log, "c"));

    registry.emit(7);

    assert_eq!(*log.lock().unwrap(), vec!["a:7", "b:7", "c:7"]);
}

#[test]
fn emit_with_no_listeners_is_a_no_op() {
    let registry: ListenerRegistry<u32> = ListenerRegistry::default();
    registry.emit(1);
    assert!(registry.is_empty());
}

// =============================================================
// Removal
// =============================================================

#[test]
fn unsubscribed_listener_stops_firing() {
    let (registry, log) = recording_registry();
    let _a = registry.add(record(&log, "a"));
    let b = registry.add(record(&log, "b"));
    let _c = registry.add(record(&log, "c"));

    b.unsubscribe();
    registry.emit(1);

    assert_eq!(*log.lock().unwrap(), vec!["a:1", "c:1"]);
    assert_eq!(registry.len(), 2);
}

#[test]
fn dropping_the_handle_keeps_the_listener() {
    let (registry, log) = recording_registry();
    drop(registry.add(record(&log, "a")));

    registry.emit(2);

    assert_eq!(*log.lock().unwrap(), vec!["a:2"]);
}

#[test]
fn unsubscribe_after_registry_drop_does_not_panic() {
    let registry: ListenerRegistry<u32> = ListenerRegistry::default();
    let handle = registry.add(|_| {});
    drop(registry);
    handle.unsubscribe();
}

// =============================================================
// Panic isolation
// =============================================================

#[test]
fn panicking_listener_does_not_block_the_rest() {
    let (registry, log) = recording_registry();
    let _a = registry.add(record(&log, "a"));
    let _boom = registry.add(|_| panic!("listener bug"));
    let _c = registry.add(record(&log, "c"));

    registry.emit(3);

    assert_eq!(*log.lock().unwrap(), vec!["a:3", "c:3"]);
}

#[test]
fn registry_stays_usable_after_a_listener_panic() {
    let (registry, log) = recording_registry();
    let _boom = registry.add(|_| panic!("listener bug"));
    let _a = registry.add(record(&log, "a"));

    registry.emit(1);
    registry.emit(2);

    assert_eq!(*log.lock().unwrap(), vec!["a:1", "a:2"]);
}
