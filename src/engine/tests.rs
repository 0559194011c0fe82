//! Engine scenarios driven by a manual clock.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::identifiers::Key;
use crate::protocol::{Message, PushRates, ResponseKind};

use super::*;

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    engine: Engine,
    clock: ManualClock,
}

impl Harness {
    fn new(options: EngineOptions) -> Self {
        let clock = ManualClock::new();
        let engine = Engine::new(options).with_clock(Arc::new(clock.clone()));
        Self { engine, clock }
    }

    fn connected(options: EngineOptions) -> Self {
        let mut harness = Self::new(options);
        harness.engine.open();
        assert_eq!(harness.engine.take_actions(), vec![Action::Connect]);
        harness.engine.transport_opened();
        harness.engine.take_notifications();
        harness
    }

    fn advance(&mut self, by: Duration) {
        self.clock.advance(by);
        self.engine.handle_timers();
    }

    fn reply(&mut self, frame: &str) {
        self.engine.handle_data(&format!("{frame}\n"));
    }

    fn transmitted(&mut self) -> Vec<String> {
        self.engine
            .take_actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::Transmit(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

type Log = Arc<Mutex<Vec<String>>>;

fn recorder(label: &'static str, log: &Log) -> Listener {
    let log = Arc::clone(log);
    Arc::new(move |message: &Message| {
        log.lock().push(format!("{label}:{}", message.payload()));
    })
}

fn hook(f: impl Fn(&Event<'_>) + Send + Sync + 'static) -> Hook {
    Arc::new(f)
}

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

const SEND_DELAY: Duration = Duration::from_millis(50);
const VERIFY_DELAY: Duration = Duration::from_secs(1);

// ============================================================================
// Connection Lifecycle
// ============================================================================

#[test]
fn test_open_installs_builtins_once_and_connects_from_closed() {
    let mut h = Harness::new(EngineOptions::default());
    assert!(!h.engine.hooks().builtins_installed());

    h.engine.open();
    h.engine.open();
    assert!(h.engine.hooks().builtins_installed());
    assert_eq!(h.engine.take_actions(), vec![Action::Connect]);
    assert_eq!(h.engine.state(), ConnectionState::Connecting);

    h.engine.transport_opened();
    assert!(h.engine.is_open());
    assert_eq!(
        h.engine.take_notifications(),
        vec![Notification::ConnectionOpened]
    );
}

#[test]
fn test_reconnect_stops_after_max_attempts() {
    let options = EngineOptions::new().with_max_reconnect_attempts(2);
    let mut h = Harness::new(options);
    h.engine.open();

    for _ in 0..2 {
        h.engine.transport_closed(CloseInfo::default());
        assert!(h.engine.next_deadline().is_some());
        h.advance(Duration::from_secs(1));
    }
    h.engine.transport_closed(CloseInfo::default());

    let connects = h
        .engine
        .take_actions()
        .into_iter()
        .filter(|action| *action == Action::Connect)
        .count();
    assert_eq!(connects, 3);
    assert!(h.engine.next_deadline().is_none());
    assert_eq!(h.engine.state(), ConnectionState::Closed);

    let notifications = h.engine.take_notifications();
    assert!(notifications.contains(&Notification::Reconnecting { attempt: 1 }));
    assert!(notifications.contains(&Notification::Reconnecting { attempt: 2 }));
    assert_eq!(
        notifications.last(),
        Some(&Notification::ReconnectExhausted { attempts: 2 })
    );

    h.advance(Duration::from_secs(10));
    assert!(h.engine.take_actions().is_empty());
}

#[test]
fn test_successful_open_resets_close_count() {
    let options = EngineOptions::new().with_max_reconnect_attempts(1);
    let mut h = Harness::connected(options);

    h.engine.transport_closed(CloseInfo::new(Some(1006), "abnormal"));
    assert_eq!(h.engine.close_count(), 1);
    h.advance(Duration::from_secs(1));
    assert_eq!(h.engine.take_actions(), vec![Action::Connect]);

    h.engine.transport_opened();
    assert_eq!(h.engine.close_count(), 0);

    h.engine.transport_closed(CloseInfo::default());
    assert!(h.engine.next_deadline().is_some());
}

#[test]
fn test_intentional_close_does_not_reconnect() {
    let mut h = Harness::connected(EngineOptions::default());

    h.engine.close();
    assert_eq!(h.engine.take_actions(), vec![Action::Disconnect]);
    assert_eq!(h.engine.state(), ConnectionState::Closing);

    h.engine.transport_closed(CloseInfo::new(Some(1000), ""));
    assert!(h.engine.next_deadline().is_none());
    let notifications = h.engine.take_notifications();
    assert!(
        !notifications
            .iter()
            .any(|n| matches!(n, Notification::ReconnectExhausted { .. }))
    );
}

#[test]
fn test_close_cancels_pending_reconnect() {
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.transport_closed(CloseInfo::default());
    assert!(h.engine.next_deadline().is_some());

    h.engine.close();
    assert!(h.engine.next_deadline().is_none());
    h.advance(Duration::from_secs(5));
    assert!(h.engine.take_actions().is_empty());

    h.engine.open();
    assert_eq!(h.engine.take_actions(), vec![Action::Connect]);
}

#[test]
fn test_transport_error_keeps_state() {
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.transport_error("broken pipe");
    assert!(h.engine.is_open());
    assert_eq!(
        h.engine.take_notifications(),
        vec![Notification::ConnectionError("broken pipe".to_string())]
    );
}

#[test]
fn test_unacknowledged_request_replayed_after_reconnect() {
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.refresh(17u32);
    assert_eq!(h.transmitted(), vec![r#"{"WGP":17}"#]);

    h.engine.transport_closed(CloseInfo::default());
    h.advance(Duration::from_secs(1));
    assert_eq!(h.engine.take_actions(), vec![Action::Connect]);

    h.engine.transport_opened();
    assert_eq!(h.transmitted(), vec![r#"{"WGP":17}"#]);
    assert_eq!(h.engine.awaiting(), Some(ResponseKind::ParameterValue));
}

#[test]
fn test_no_replay_when_response_arrived() {
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.refresh(17u32);
    h.reply(r#"{"MGP":{"MGPID":17}}"#);
    h.transmitted();

    h.engine.transport_closed(CloseInfo::default());
    h.advance(Duration::from_secs(1));
    h.engine.transport_opened();
    assert!(h.transmitted().is_empty());
}

#[test]
fn test_request_queued_while_closed_sent_once_on_reopen() {
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.refresh(1u32);
    h.reply(r#"{"MGP":{"MGPID":1}}"#);
    h.transmitted();

    h.engine.transport_closed(CloseInfo::default());
    h.engine.refresh(2u32);
    h.advance(Duration::from_secs(1));
    assert_eq!(h.engine.take_actions(), vec![Action::Connect]);

    h.engine.transport_opened();
    assert_eq!(h.transmitted(), vec![r#"{"WGP":2}"#]);
    assert_eq!(h.engine.awaiting(), Some(ResponseKind::ParameterValue));
}

#[test]
fn test_replay_precedes_queued_requests_on_reopen() {
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.refresh(17u32);
    h.transmitted();

    h.engine.transport_closed(CloseInfo::default());
    h.engine.refresh(18u32);
    h.advance(Duration::from_secs(1));
    h.engine.take_actions();

    h.engine.transport_opened();
    assert_eq!(h.transmitted(), vec![r#"{"WGP":17}"#]);

    h.reply(r#"{"MGP":{"MGPID":17}}"#);
    h.advance(SEND_DELAY);
    assert_eq!(h.transmitted(), vec![r#"{"WGP":18}"#]);
}

// ============================================================================
// Framing
// ============================================================================

#[test]
fn test_chunked_frames_are_routed() {
    let log = new_log();
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.register_listener(17u32, recorder("a", &log));

    h.engine.handle_data(r#"{"MGP":{"MGPID":17,"Par"#);
    h.engine.handle_data("amVal\":\"1\"}}\n{\"MGP\":{\"MGPID\":17,");
    assert_eq!(log.lock().len(), 1);
    h.engine.handle_data("\"ParamVal\":\"2\"}}\n");

    assert_eq!(
        *log.lock(),
        vec![
            r#"a:{"MGPID":17,"ParamVal":"1"}"#,
            r#"a:{"MGPID":17,"ParamVal":"2"}"#,
        ]
    );
}

#[test]
fn test_decode_failure_is_skipped() {
    let log = new_log();
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.register_listener(1u32, recorder("a", &log));

    h.engine
        .handle_data("{\"MGP\":{\"MGPID\":1}}\nnot json\n{\"MGP\":{\"MGPID\":1}}\n");
    assert_eq!(log.lock().len(), 2);
    assert_eq!(h.engine.decode_failures(), 1);
}

#[test]
fn test_partial_frame_dropped_on_close() {
    let log = new_log();
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.register_listener(1u32, recorder("a", &log));

    h.engine.handle_data("{\"MGP\":{\"MG");
    h.engine.transport_closed(CloseInfo::default());
    h.advance(Duration::from_secs(1));
    h.engine.transport_opened();

    h.reply(r#"{"MGP":{"MGPID":1}}"#);
    assert_eq!(*log.lock(), vec![r#"a:{"MGPID":1}"#]);
    assert_eq!(h.engine.decode_failures(), 0);
}

// ============================================================================
// Outbound Scheduling
// ============================================================================

#[test]
fn test_single_request_in_flight_then_drain_in_order() {
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.refresh(1u32);
    h.engine.refresh(2u32);
    h.engine.refresh(3u32);

    assert_eq!(h.transmitted(), vec![r#"{"WGP":1}"#]);
    let queued: Vec<&str> = h.engine.queued().map(|r| r.as_text()).collect();
    assert_eq!(queued, vec![r#"{"WGP":2}"#, r#"{"WGP":3}"#]);

    h.reply(r#"{"MGP":{"MGPID":1}}"#);
    assert!(h.engine.awaiting().is_none());
    assert!(h.transmitted().is_empty());

    h.advance(SEND_DELAY);
    assert_eq!(h.transmitted(), vec![r#"{"WGP":2}"#]);

    h.reply(r#"{"MGP":{"MGPID":2}}"#);
    h.advance(SEND_DELAY);
    assert_eq!(h.transmitted(), vec![r#"{"WGP":3}"#]);
    assert_eq!(h.engine.queued().count(), 0);
}

#[test]
fn test_unrelated_response_keeps_gate() {
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.refresh(1u32);
    h.engine.refresh(2u32);
    h.transmitted();

    h.reply(r#"{"MLOG":"1"}"#);
    h.advance(SEND_DELAY);
    assert!(h.transmitted().is_empty());
    assert_eq!(h.engine.awaiting(), Some(ResponseKind::ParameterValue));
}

#[test]
fn test_requests_before_open_are_queued() {
    let mut h = Harness::new(EngineOptions::default());
    h.engine.refresh(1u32);
    h.engine.flush_log(None);
    assert!(h.engine.take_actions().is_empty());

    h.engine.open();
    h.engine.transport_opened();
    assert_eq!(
        h.engine.take_actions(),
        vec![
            Action::Connect,
            Action::Transmit(r#"{"WGP":1}"#.to_string())
        ]
    );
    assert_eq!(h.engine.queued().count(), 1);
}

#[test]
fn test_send_text_rejects_invalid_json() {
    let mut h = Harness::connected(EngineOptions::default());
    assert!(h.engine.send_text("{nope").is_err());
    assert!(h.engine.send_text("[1,2]").is_err());
    assert!(h.transmitted().is_empty());
    assert_eq!(h.engine.queued().count(), 0);
}

#[test]
fn test_custom_request_leaves_gate_clear() {
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.send_text(r#"{"XPING":1}"#).expect("object");
    h.engine.refresh(4u32);
    assert_eq!(h.transmitted(), vec![r#"{"XPING":1}"#, r#"{"WGP":4}"#]);
}

// ============================================================================
// Listener Routing
// ============================================================================

#[test]
fn test_refresh_scenario_invokes_listener_and_drains_queue() {
    let log = new_log();
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.register_listener(17u32, recorder("rpm", &log));

    h.engine.refresh(17u32);
    h.engine.refresh(18u32);
    assert_eq!(h.transmitted(), vec![r#"{"WGP":17}"#]);
    assert_eq!(h.engine.awaiting(), Some(ResponseKind::ParameterValue));

    h.reply(r#"{"MGP":{"MGPID":17,"ParamVal":"812"}}"#);
    assert_eq!(*log.lock(), vec![r#"rpm:{"MGPID":17,"ParamVal":"812"}"#]);
    assert!(h.engine.awaiting().is_none());

    h.advance(SEND_DELAY);
    assert_eq!(h.transmitted(), vec![r#"{"WGP":18}"#]);
}

#[test]
fn test_fan_out_in_registration_order() {
    let log = new_log();
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.register_listener(9u32, recorder("first", &log));
    h.engine.register_listener(9u32, recorder("second", &log));

    h.reply(r#"{"MGP":{"MGPID":9}}"#);
    assert_eq!(
        *log.lock(),
        vec![r#"first:{"MGPID":9}"#, r#"second:{"MGPID":9}"#]
    );
}

#[test]
fn test_key_matches_id_or_name_once_per_entry() {
    let log = new_log();
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.register_listener("rpm", recorder("name", &log));
    h.engine.register_listener(17u32, recorder("id", &log));

    h.reply(r#"{"MGP":{"MGPID":17,"MGPLabel":"rpm"}}"#);
    let entries = log.lock().clone();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].starts_with("name:"));
    assert!(entries[1].starts_with("id:"));
}

#[test]
fn test_deregister_listener() {
    let log = new_log();
    let mut h = Harness::connected(EngineOptions::default());
    let listener = recorder("a", &log);
    h.engine.register_listener(3u32, Arc::clone(&listener));
    let other = h.engine.register_listener(3u32, recorder("b", &log));

    assert_eq!(h.engine.deregister_listener(&Key::Id(3), &listener), 1);
    assert!(h.engine.remove_listener(other));
    assert!(!h.engine.remove_listener(other));

    h.reply(r#"{"MGP":{"MGPID":3}}"#);
    assert!(log.lock().is_empty());
}

#[test]
fn test_metadata_listeners_fire_once() {
    let log = new_log();
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.request_metadata(17u32, recorder("a", &log));
    h.engine.request_metadata(17u32, recorder("b", &log));
    h.engine.request_metadata(18u32, recorder("c", &log));

    h.reply(r#"{"MGPM":{"MGPMID":17,"UnitsStr":"1/min"}}"#);
    h.reply(r#"{"MGPM":{"MGPMID":17,"UnitsStr":"1/min"}}"#);
    let labels: Vec<String> = log.lock().iter().map(|e| e[..1].to_string()).collect();
    assert_eq!(labels, vec!["a", "b"]);

    h.reply(r#"{"MGPM":{"MGPMID":18}}"#);
    assert_eq!(log.lock().len(), 3);
}

#[test]
fn test_language_and_log_waiters_are_cleared() {
    let log = new_log();
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.request_languages(recorder("lang", &log));
    h.engine.flush_log(Some(recorder("log1", &log)));
    h.engine.flush_log(Some(recorder("log2", &log)));

    h.reply(r#"{"MGLAN":["en","de"]}"#);
    h.reply(r#"{"MGLAN":["en","de"]}"#);
    h.reply(r#"{"MLOG":"1"}"#);
    h.reply(r#"{"MLOG":"1"}"#);

    assert_eq!(
        *log.lock(),
        vec![
            r#"lang:["en","de"]"#.to_string(),
            r#"log1:"1""#.to_string(),
            r#"log2:"1""#.to_string(),
        ]
    );
}

#[test]
fn test_group_values_and_metadata_routing() {
    let values = new_log();
    let metadata = new_log();
    let mut h = Harness::connected(EngineOptions::default());
    h.engine.register_group_listener("dash", recorder("values", &values));
    h.engine.request_group_metadata("dash", recorder("meta", &metadata));

    h.reply(r#"{"MGPG":"dash","Values":[{"MGP":{"MGPID":1}}]}"#);
    assert_eq!(values.lock().len(), 1);
    assert!(metadata.lock().is_empty());

    h.reply(r#"{"MGPG":"dash","Values":[{"MGPM":{"MGPMID":1}}]}"#);
    assert_eq!(values.lock().len(), 1);
    assert_eq!(metadata.lock().len(), 1);

    h.reply(r#"{"MGPMG":"dash","Values":[]}"#);
    assert_eq!(metadata.lock().len(), 1);
}

#[test]
fn test_group_push_attaches_member_parameters() {
    let log = new_log();
    let mut h = Harness::connected(EngineOptions::default());
    let listener = recorder("dash", &log);
    h.engine.register_group_listener("dash", listener);
    h.engine.request_group_push("dash", PushRates::default());
    assert_eq!(
        h.transmitted(),
        vec![r#"{"WPUSHG":{"WPUSHGID":"dash","Minrate":"50","Maxrate":"100"}}"#]
    );

    let ack = r#"{"MPUSHG":"dash","Values":[{"MPUSHP":{"MPUSHPID":"5"}},{"MPUSHP":{"MPUSHPID":"6"}}]}"#;
    h.reply(ack);
    h.reply(ack);

    h.reply(r#"{"MGP":{"MGPID":5}}"#);
    h.reply(r#"{"MGP":{"MGPID":6}}"#);
    h.reply(r#"{"MGP":{"MGPID":7}}"#);
    assert_eq!(log.lock().len(), 2);
}

// ============================================================================
// Push Subscriptions
// ============================================================================

fn push_attempts(h: &mut Harness, sent: &mut Vec<String>) -> usize {
    sent.extend(h.transmitted());
    let queued = h
        .engine
        .queued()
        .filter(|r| r.tag() == "WPUSHP")
        .count();
    sent.iter().filter(|t| t.contains("WPUSHP")).count() + queued
}

#[test]
fn test_push_fails_after_retry_budget() {
    let options = EngineOptions::new().with_push_retry_budget(2);
    let mut h = Harness::connected(options);
    let mut sent = Vec::new();
    let log = new_log();

    let id = h
        .engine
        .request_push(5u32, PushRates::default(), recorder("a", &log));
    assert_eq!(push_attempts(&mut h, &mut sent), 1);
    assert_eq!(
        sent[0],
        r#"{"WPUSHP":{"WPUSHPID":"5","Minrate":"50","Maxrate":"100"}}"#
    );

    h.advance(VERIFY_DELAY);
    assert_eq!(push_attempts(&mut h, &mut sent), 2);
    h.advance(VERIFY_DELAY);
    assert_eq!(push_attempts(&mut h, &mut sent), 3);
    assert_eq!(h.engine.push_subscriptions(), 1);

    h.advance(VERIFY_DELAY);
    assert_eq!(push_attempts(&mut h, &mut sent), 3);
    assert_eq!(h.engine.push_subscriptions(), 0);
    assert!(h.engine.take_notifications().contains(&Notification::PushFailed {
        subscription: id,
        key: Key::Id(5),
    }));

    h.advance(VERIFY_DELAY * 5);
    assert_eq!(push_attempts(&mut h, &mut sent), 3);
    assert!(h.engine.next_deadline().is_none());
}

#[test]
fn test_confirmation_halts_retries() {
    let mut h = Harness::connected(EngineOptions::default());
    h.engine
        .request_push(5u32, PushRates::new(10, 20), Arc::new(|_: &Message| {}));
    h.transmitted();

    h.reply(r#"{"MPUSHP":{"MPUSHPID":"5"}}"#);
    assert!(h.engine.awaiting().is_none());

    h.advance(VERIFY_DELAY * 3);
    assert!(h.transmitted().is_empty());
    assert_eq!(h.engine.push_subscriptions(), 1);
    assert!(h.engine.take_notifications().is_empty());
}

#[test]
fn test_confirmation_after_exhaustion_is_noop() {
    let options = EngineOptions::new().with_push_retry_budget(0);
    let mut h = Harness::connected(options);
    h.engine
        .request_push(5u32, PushRates::default(), Arc::new(|_: &Message| {}));

    h.advance(VERIFY_DELAY);
    assert_eq!(h.engine.push_subscriptions(), 0);

    h.reply(r#"{"MPUSHP":{"MPUSHPID":"5"}}"#);
    assert_eq!(h.engine.push_subscriptions(), 0);
}

#[test]
fn test_pushed_values_reach_subscriber() {
    let log = new_log();
    let mut h = Harness::connected(EngineOptions::default());
    h.engine
        .request_push(5u32, PushRates::default(), recorder("push", &log));
    h.reply(r#"{"MPUSHP":{"MPUSHPID":"5"}}"#);

    h.reply(r#"{"MGP":{"MGPID":5,"ParamVal":"3"}}"#);
    h.reply(r#"{"MGP":{"MGPID":4,"ParamVal":"3"}}"#);
    assert_eq!(*log.lock(), vec![r#"push:{"MGPID":5,"ParamVal":"3"}"#]);
}

#[test]
fn test_unsubscribe_removes_subscription_and_listener() {
    let log = new_log();
    let mut h = Harness::connected(EngineOptions::default());
    let listener = recorder("a", &log);
    h.engine.register_listener(5u32, Arc::clone(&listener));
    h.engine
        .request_push(5u32, PushRates::default(), Arc::clone(&listener));

    assert_eq!(h.engine.unsubscribe(&Key::Id(5), &listener), 1);
    assert_eq!(h.engine.push_subscriptions(), 0);

    h.reply(r#"{"MGP":{"MGPID":5}}"#);
    assert!(log.lock().is_empty());

    h.transmitted();
    h.advance(VERIFY_DELAY * 2);
    assert!(h.transmitted().is_empty());
}

#[test]
fn test_refresh_push_is_debounced() {
    let options = EngineOptions::new().with_push_retry_budget(1);
    let mut h = Harness::connected(options);
    let synced = Arc::new(Mutex::new(0u32));
    let counter = Arc::clone(&synced);
    h.engine
        .register_push_synchronizer(Arc::new(move || *counter.lock() += 1));

    h.engine
        .request_push(5u32, PushRates::default(), Arc::new(|_: &Message| {}));
    h.reply(r#"{"MPUSHP":{"MPUSHPID":"5"}}"#);
    h.advance(SEND_DELAY);
    h.transmitted();

    h.engine.refresh_push_requests(false);
    h.clock.advance(Duration::from_millis(600));
    h.engine.refresh_push_requests(false);
    h.advance(Duration::from_millis(600));
    assert!(h.transmitted().is_empty());
    assert_eq!(*synced.lock(), 0);

    h.advance(Duration::from_millis(400));
    assert_eq!(h.transmitted(), vec![r#"{"WPUSHC":""}"#]);
    assert_eq!(*synced.lock(), 1);
    let queued: Vec<&str> = h.engine.queued().map(|r| r.tag()).collect();
    assert_eq!(queued, vec!["WPUSHP"]);

    h.reply(r#"{"MPUSHC":""}"#);
    h.advance(SEND_DELAY);
    assert_eq!(h.transmitted().len(), 1);
}

#[test]
fn test_refresh_push_immediate_resets_budget() {
    let options = EngineOptions::new().with_push_retry_budget(1);
    let mut h = Harness::connected(options);
    h.engine
        .request_push(5u32, PushRates::default(), Arc::new(|_: &Message| {}));

    h.advance(VERIFY_DELAY);
    h.engine.refresh_push_requests(true);

    h.advance(VERIFY_DELAY);
    assert_eq!(h.engine.push_subscriptions(), 1);
    h.advance(VERIFY_DELAY);
    assert_eq!(h.engine.push_subscriptions(), 0);
}

// ============================================================================
// Hooks
// ============================================================================

#[test]
fn test_hooks_fire_in_order_and_isolate_panics() {
    let log = new_log();
    let mut h = Harness::connected(EngineOptions::default());

    h.engine
        .add_named_hook("MGP", hook(|_| panic!("hook failure")))
        .expect("known kind");
    let sink = Arc::clone(&log);
    h.engine
        .add_named_hook(
            "MGP",
            hook(move |event| {
                if let Event::Message(message) = event {
                    sink.lock().push(format!("hook:{}", message.tag()));
                }
            }),
        )
        .expect("known kind");
    h.engine.register_listener(1u32, recorder("listener", &log));

    h.reply(r#"{"MGP":{"MGPID":1}}"#);
    assert_eq!(
        *log.lock(),
        vec![r#"listener:{"MGPID":1}"#.to_string(), "hook:MGP".to_string()]
    );
}

#[test]
fn test_lifecycle_hooks_and_removal() {
    let log = new_log();
    let mut h = Harness::new(EngineOptions::default());

    let sink = Arc::clone(&log);
    let open_hook = h.engine.add_hook(
        HookEvent::Open.into(),
        hook(move |_| sink.lock().push("open".to_string())),
    );
    let sink = Arc::clone(&log);
    h.engine
        .add_named_hook(
            "onMessage",
            hook(move |event| {
                if let Event::Raw(text) = event {
                    sink.lock().push(format!("raw:{}", text.len()));
                }
            }),
        )
        .expect("known event");

    h.engine.open();
    h.engine.transport_opened();
    h.engine.handle_data("{\"MLOG\"");

    assert!(h.engine.remove_hook(open_hook));
    h.engine.transport_closed(CloseInfo::default());
    h.advance(Duration::from_secs(1));
    h.engine.transport_opened();

    assert_eq!(*log.lock(), vec!["open".to_string(), "raw:7".to_string()]);
}

#[test]
fn test_unknown_hook_name_is_rejected() {
    let mut h = Harness::new(EngineOptions::default());
    let result = h
        .engine
        .add_named_hook("onExplode", hook(|_| {}));
    assert!(result.is_err());
    assert_eq!(
        h.engine
            .hooks()
            .user_hooks(HookTarget::Kind(ResponseKind::ParameterValue)),
        0
    );
}
