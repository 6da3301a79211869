use super::*;

use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;

use serde_json::json;

#[derive(Default)]
struct CountingBridge {
    expired: AtomicUsize,
    inactivity: AtomicUsize,
}

impl HostBridge for CountingBridge {
    fn notify_session_expired(&self) {
        self.expired.fetch_add(1, Ordering::SeqCst);
    }

    fn notify_inactivity_timeout(&self) {
        self.inactivity.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    router: EventRouter,
    state: Arc<SessionState>,
    bridge: Arc<CountingBridge>,
    seen: Arc<Mutex<Vec<Value>>>,
}

fn harness_on(key: &str) -> Harness {
    let router = EventRouter::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let _sub = {
        let seen = seen.clone();
        // Dropping the handle is fine; removal is explicit-only.
        router.subscribe(key, move |payload| seen.lock().unwrap().push(payload.clone()))
    };
    Harness {
        router,
        state: Arc::new(SessionState::default()),
        bridge: Arc::new(CountingBridge::default()),
        seen,
    }
}

impl Harness {
    fn feed(&self, raw: &str) {
        handle_frame(&self.router, &self.state, self.bridge.as_ref(), raw);
    }
}

// =============================================================
// Decode faults
// =============================================================

#[test]
fn malformed_frame_is_dropped_without_dispatch() {
    let harness = harness_on("grid");
    harness.feed("this is not json");
    harness.feed("{\"event\": 42}");

    assert!(harness.seen.lock().unwrap().is_empty());
    assert_eq!(harness.bridge.expired.load(Ordering::SeqCst), 0);
}

#[test]
fn unkeyed_frame_is_dropped() {
    let harness = harness_on("grid");
    harness.feed("{\"data\": {\"x\": 1}}");
    assert!(harness.seen.lock().unwrap().is_empty());
}

// =============================================================
// Expiry short-circuit
// =============================================================

#[test]
fn expiry_frame_reaches_only_the_host_bridge() {
    let harness = harness_on("getbalance");
    harness.feed(r#"{"operation":"getbalance","data":{"status":"401 Session Expired"}}"#);

    assert_eq!(harness.bridge.expired.load(Ordering::SeqCst), 1);
    assert!(harness.seen.lock().unwrap().is_empty());
}

#[test]
fn expiry_frame_never_resolves_a_pending_waiter() {
    let harness = harness_on("getbalance");
    let mut rx = harness.router.register_pending("getbalance");

    harness.feed(r#"{"operation":"getbalance","data":{"status":"401 Session Expired"}}"#);

    assert!(rx.try_recv().is_err());
    assert!(harness.router.has_pending("getbalance"));
}

// =============================================================
// Info interception
// =============================================================

#[test]
fn info_frame_updates_bet_steps_without_subscribers() {
    let harness = harness_on("unrelated");
    harness.feed(r#"{"operation":"info","data":{"mineSweeperAmounts":[0.1,0.5,1.0]}}"#);

    assert_eq!(harness.state.bet_steps(), vec![0.1, 0.5, 1.0]);
}

#[test]
fn info_frame_still_dispatches_to_its_subscribers() {
    let harness = harness_on("info");
    harness.feed(r#"{"operation":"info","data":{"mineSweeperAmounts":[2.0]}}"#);

    assert_eq!(harness.state.bet_steps(), vec![2.0]);
    assert_eq!(harness.seen.lock().unwrap().len(), 1);
}

// =============================================================
// Dispatch keying and payload selection
// =============================================================

#[test]
fn event_key_wins_over_operation_key() {
    let harness = harness_on("round:update");
    harness.feed(r#"{"event":"round:update","operation":"minesweeper_load","data":{"row":1}}"#);

    assert_eq!(*harness.seen.lock().unwrap(), vec![json!({"row": 1})]);
}

#[test]
fn handler_receives_whole_envelope_when_data_is_absent() {
    let harness = harness_on("round:finished");
    harness.feed(r#"{"event":"round:finished","status":"200 OK"}"#);

    let seen = harness.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].get("event"), Some(&json!("round:finished")));
    assert_eq!(seen[0].get("status"), Some(&json!("200 OK")));
}
