use super::*;
use serde_json::json;
use tokio::sync::oneshot::error::TryRecvError;

fn record(
    log: &Arc<Mutex<Vec<String>>>,
    label: &str,
) -> impl Fn(&Value) + Send + Sync + 'static + use<> {
    let log = log.clone();
    let label = label.to_owned();
    move |payload| log.lock().unwrap().push(format!("{label}:{payload}"))
}

// =============================================================
// Fan-out subscriptions
// =============================================================

#[test]
fn subscribers_fire_in_registration_order() {
    let router = EventRouter::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let _a = router.subscribe("grid", record(&log, "a"));
    let _b = router.subscribe("grid", record(&log, "b"));

    router.dispatch("grid", json!(1));

    assert_eq!(*log.lock().unwrap(), vec!["a:1", "b:1"]);
}

#[test]
fn dispatch_only_reaches_matching_key() {
    let router = EventRouter::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let _grid = router.subscribe("grid", record(&log, "grid"));
    let _other = router.subscribe("round", record(&log, "round"));

    router.dispatch("round", json!(2));

    assert_eq!(*log.lock().unwrap(), vec!["round:2"]);
}

#[test]
fn unsubscribe_removes_only_that_subscription() {
    let router = EventRouter::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let a = router.subscribe("grid", record(&log, "a"));
    let _b = router.subscribe("grid", record(&log, "b"));

    a.unsubscribe();
    router.dispatch("grid", json!(3));

    assert_eq!(*log.lock().unwrap(), vec!["b:3"]);
    assert_eq!(router.subscriber_count("grid"), 1);
}

#[test]
fn unsubscribing_last_subscriber_clears_the_key() {
    let router = EventRouter::default();
    let sub = router.subscribe("grid", |_| {});
    sub.unsubscribe();
    assert_eq!(router.subscriber_count("grid"), 0);
}

#[test]
fn panicking_subscriber_does_not_stop_the_rest() {
    let router = EventRouter::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let _boom = router.subscribe("grid", |_| panic!("subscriber bug"));
    let _b = router.subscribe("grid", record(&log, "b"));

    router.dispatch("grid", json!(4));

    assert_eq!(*log.lock().unwrap(), vec!["b:4"]);
}

// =============================================================
// Pending waiters
// =============================================================

#[test]
fn waiter_resolves_with_first_matching_payload() {
    let router = EventRouter::default();
    let mut rx = router.register_pending("getbalance");

    router.dispatch("getbalance", json!({"balance": 10.0}));

    assert_eq!(rx.try_recv().expect("resolved"), json!({"balance": 10.0}));
    assert!(!router.has_pending("getbalance"));
}

#[test]
fn waiter_is_cleared_after_first_resolution() {
    let router = EventRouter::default();
    let mut rx = router.register_pending("getbalance");

    router.dispatch("getbalance", json!({"balance": 10.0}));
    router.dispatch("getbalance", json!({"balance": 99.0}));

    // Only the first dispatch reached the waiter.
    assert_eq!(rx.try_recv().expect("resolved"), json!({"balance": 10.0}));
}

#[test]
fn newer_waiter_supersedes_older_one() {
    let router = EventRouter::default();
    let mut first = router.register_pending("minesweeper_load");
    let mut second = router.register_pending("minesweeper_load");

    router.dispatch("minesweeper_load", json!({"status": "400"}));

    assert!(matches!(first.try_recv(), Err(TryRecvError::Closed)));
    assert_eq!(second.try_recv().expect("resolved"), json!({"status": "400"}));
}

#[test]
fn waiter_and_subscribers_both_see_the_frame() {
    let router = EventRouter::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let _sub = router.subscribe("getbalance", record(&log, "sub"));
    let mut rx = router.register_pending("getbalance");

    router.dispatch("getbalance", json!(5));

    assert_eq!(rx.try_recv().expect("resolved"), json!(5));
    assert_eq!(*log.lock().unwrap(), vec!["sub:5"]);
}

#[test]
fn dropped_request_receiver_does_not_break_dispatch() {
    let router = EventRouter::default();
    let rx = router.register_pending("getbalance");
    drop(rx);

    router.dispatch("getbalance", json!(6));

    assert!(!router.has_pending("getbalance"));
}
