mod common;

use std::sync::{Arc, Mutex};

use nav_telemetry::kernel::lifecycle::LifecyclePhase;
use nav_telemetry::kernel::observer::NavigationObserver;
use nav_telemetry::kernel::scheduler::{FlushReport, FlushTrigger};
use nav_telemetry::kernel::state::SessionState;
use nav_telemetry::kernel::telemetry::event::{EndOfRouteFeedback, EventName, FeedbackType};
use serde_json::json;
use uuid::Uuid;

use common::{route, Harness};

const DEPART: &str = "navigation.depart";
const ARRIVE: &str = "navigation.arrive";
const CANCEL: &str = "navigation.cancel";

#[test]
fn test_depart_fires_once_across_many_updates() {
    let mut h = Harness::new();
    for i in 0..1000 {
        h.clock.advance_secs(1);
        h.tick(i as f64, false);
    }
    assert_eq!(h.transport.count(DEPART), 1);
    assert_eq!(h.reactor.state.phase(), LifecyclePhase::Departed);
    assert_eq!(h.reactor.snapshot().departs, 1);
}

#[test]
fn test_arrive_requires_final_waypoint() {
    let mut h = Harness::new();
    h.tick(100.0, false);
    assert_eq!(h.transport.count(ARRIVE), 0);

    h.clock.advance_secs(30);
    h.tick(1000.0, true);
    h.tick(1000.0, true);
    h.tick(1000.0, true);

    assert_eq!(h.transport.count(ARRIVE), 1);
    assert_eq!(h.transport.names(), vec![DEPART.to_string(), ARRIVE.to_string()]);

    let arrive = &h.transport.payloads(ARRIVE)[0];
    assert!(arrive["arrivalTimestamp"].is_string());
    assert_eq!(arrive["event"], json!(ARRIVE));
}

#[test]
fn test_intermediate_waypoint_is_not_arrival() {
    let mut h = Harness::new();
    let multi_leg = route("legs").with_legs(2);
    let mut p = common::progress(&multi_leg, 500.0, true, common::t0());
    p.leg_index = 0;
    h.reactor.on_progress_update(p);

    assert_eq!(h.transport.count(ARRIVE), 0);
    assert_eq!(h.reactor.state.phase(), LifecyclePhase::Departed);
}

#[test]
fn test_first_update_at_destination_departs_then_arrives() {
    let mut h = Harness::new();
    h.tick(1000.0, true);
    assert_eq!(h.transport.names(), vec![DEPART.to_string(), ARRIVE.to_string()]);
}

#[test]
fn test_terminate_after_arrival_sends_no_cancel() {
    let mut h = Harness::new();
    h.tick(1000.0, true);
    h.reactor.on_terminate();
    assert_eq!(h.transport.count(CANCEL), 0);
}

#[test]
fn test_terminate_cancels_once_and_flushes_everything() {
    let mut h = Harness::new();
    h.tick(10.0, false);
    let id = h.reactor.record_feedback(FeedbackType::RoadClosed, None);
    h.reactor.on_reroute(route("r1"), false);

    let report = h.reactor.on_terminate();
    assert_eq!(report.trigger, FlushTrigger::Termination);
    assert_eq!(report.sent, 2);
    assert_eq!(report.retained, 0);
    assert!(h.reactor.queue.is_empty());
    assert!(h.transport.flush_count() >= 1);

    h.reactor.on_terminate();
    assert_eq!(h.transport.count(CANCEL), 1);
    assert_eq!(h.transport.count("navigation.feedback"), 1);
    assert_eq!(h.transport.payloads("navigation.feedback")[0]["feedbackId"], json!(id.to_string()));
    assert_eq!(h.reactor.state.phase(), LifecyclePhase::Cancelled);
}

#[test]
fn test_cancel_before_departure_is_still_sent() {
    let mut h = Harness::new();
    h.reactor.on_terminate();
    assert_eq!(h.transport.names(), vec![CANCEL.to_string()]);
}

#[test]
fn test_explicit_cancel_carries_valid_rating_only() {
    let mut h = Harness::new();
    h.tick(10.0, false);
    h.reactor.on_cancel(Some(EndOfRouteFeedback::new(140, "too slow")));

    let cancel = &h.transport.payloads(CANCEL)[0];
    assert!(cancel.get("rating").is_none());
    assert_eq!(cancel["comment"], json!("too slow"));

    let mut h = Harness::new();
    h.reactor.on_cancel(Some(EndOfRouteFeedback::new(80, "fine")));
    assert_eq!(h.transport.payloads(CANCEL)[0]["rating"], json!(80));
}

#[test]
fn test_progress_after_cancel_is_ignored() {
    let mut h = Harness::new();
    h.reactor.on_terminate();
    h.tick(10.0, false);
    h.tick(1000.0, true);
    assert_eq!(h.transport.names(), vec![CANCEL.to_string()]);
}

#[test]
fn test_reroute_counters() {
    let mut h = Harness::new();
    h.tick(100.0, false);
    h.reactor.on_reroute(route("faster"), true);
    assert_eq!(h.reactor.state.number_of_reroutes, 0);
    assert_eq!(h.reactor.state.number_of_faster_routes, 1);

    h.reactor.on_reroute(route("detour"), false);
    assert_eq!(h.reactor.state.number_of_reroutes, 1);
    assert_eq!(h.reactor.state.current_route.request_id, "detour");
    assert_eq!(h.reactor.state.original_route.request_id, "r0");
    assert!(h.reactor.state.last_reroute_date.is_some());
}

#[test]
fn test_new_route_after_arrival_starts_new_session() {
    let mut h = Harness::new();
    h.tick(1000.0, true);
    let first_session = h.reactor.state.identifier;

    h.clock.advance_secs(60);
    h.reactor.on_reroute(route("next-trip"), false);

    assert_ne!(h.reactor.state.identifier, first_session);
    assert_eq!(h.reactor.state.phase(), LifecyclePhase::NotDeparted);
    assert_eq!(h.reactor.state.number_of_reroutes, 0);
    assert!(h.reactor.queue.is_empty(), "a session boundary queues no reroute");

    h.tick(5.0, false);
    assert_eq!(
        h.transport.names(),
        vec![DEPART.to_string(), ARRIVE.to_string(), DEPART.to_string()]
    );
    let second_depart = &h.transport.payloads(DEPART)[1];
    assert_eq!(second_depart["sessionIdentifier"], json!(h.reactor.state.identifier.to_string()));
}

#[test]
fn test_session_boundary_flushes_under_the_old_session() {
    let mut h = Harness::new();
    h.tick(1000.0, true);
    let first_session = h.reactor.state.identifier;

    h.clock.advance_secs(2);
    let id = h.reactor.record_feedback(FeedbackType::General, Some("after arrival".to_string()));
    assert_eq!(h.transport.count("navigation.feedback"), 0);

    h.reactor.on_reroute(route("next-trip"), false);
    assert!(h.reactor.queue.is_empty());
    assert_ne!(h.reactor.state.identifier, first_session);

    let sent = h.transport.payloads("navigation.feedback");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["feedbackId"], json!(id.to_string()));
    assert_eq!(sent[0]["sessionIdentifier"], json!(first_session.to_string()));

    h.reactor.on_terminate();
    assert_eq!(h.transport.count("navigation.feedback"), 1);
}

#[test]
fn test_session_ids_come_from_the_identity_source() {
    let mut h = Harness::new();
    assert_eq!(h.reactor.state.identifier, Uuid::from_u128(1));

    h.tick(1000.0, true);
    let feedback = h.reactor.record_feedback(FeedbackType::General, None);
    assert_eq!(feedback.0, Uuid::from_u128(2));

    h.reactor.on_reroute(route("next-trip"), false);
    assert_eq!(h.reactor.state.identifier, Uuid::from_u128(3));
}

#[derive(Default)]
struct Counts {
    departs: usize,
    arrives: usize,
    cancels: usize,
    reroutes: Vec<bool>,
    resets: usize,
    forced_flushes: usize,
}

struct Recording(Arc<Mutex<Counts>>);

impl NavigationObserver for Recording {
    fn on_depart(&mut self, _state: &SessionState) {
        self.0.lock().unwrap().departs += 1;
    }

    fn on_arrive(&mut self, _state: &SessionState) {
        self.0.lock().unwrap().arrives += 1;
    }

    fn on_cancel(&mut self, _state: &SessionState) {
        self.0.lock().unwrap().cancels += 1;
    }

    fn on_reroute(&mut self, _state: &SessionState, proactive: bool) {
        self.0.lock().unwrap().reroutes.push(proactive);
    }

    fn on_session_reset(&mut self, _state: &SessionState) {
        self.0.lock().unwrap().resets += 1;
    }

    fn on_flush(&mut self, report: &FlushReport) {
        if report.trigger.is_forced() {
            self.0.lock().unwrap().forced_flushes += 1;
        }
    }
}

#[test]
fn test_observer_hooks_follow_the_session() {
    let counts = Arc::new(Mutex::new(Counts::default()));
    let h = Harness::new();
    let mut reactor = h.reactor.with_observer(Box::new(Recording(counts.clone())));
    let r0 = reactor.state.current_route.clone();

    reactor.on_progress_update(common::progress(&r0, 1.0, false, common::t0()));
    reactor.on_reroute(route("faster"), true);
    let r1 = reactor.state.current_route.clone();
    reactor.on_progress_update(common::progress(&r1, 1000.0, true, common::t0()));
    reactor.on_reroute(route("next"), false);
    reactor.on_terminate();

    let c = counts.lock().unwrap();
    assert_eq!(c.departs, 1);
    assert_eq!(c.arrives, 1);
    // The fresh session had not departed, so termination cancels it.
    assert_eq!(c.cancels, 1);
    assert_eq!(c.reroutes, vec![true]);
    assert_eq!(c.resets, 1);
    // arrive, session reset, terminate
    assert_eq!(c.forced_flushes, 3);
    assert_eq!(reactor.snapshot().sent(EventName::FasterRoute), 1);
}
