use tracing::{info, warn};

use super::lifecycle::{LifecycleGraph, LifecycleRequest};
use super::state::{SessionState, StateDelta};
use super::telemetry::event::{lifecycle_payload, EndOfRouteFeedback, EventName, SessionAttributes};
use super::telemetry::recorder::{DispatchOutcome, DispatchRecord, DispatchRecorder};
use super::time::Timestamp;
use super::transport::Transport;

/// One-shot depart/arrive/cancel events. Never queued, never deduplicated:
/// the session's phase is the only guard.
pub struct LifecycleEmitter;

impl LifecycleEmitter {
    /// Moves the session forward if `request` is legal from its current phase and
    /// returns the event that transition owes. A second call for the same
    /// transition returns None.
    pub fn advance(state: &mut SessionState, request: LifecycleRequest, now: Timestamp) -> Option<EventName> {
        let next = LifecycleGraph::transition(state.phase(), request)?;
        let (delta, name) = match request {
            LifecycleRequest::Depart => (StateDelta::Departed(now), EventName::Depart),
            LifecycleRequest::Arrive => (StateDelta::Arrived(now), EventName::Arrive),
            LifecycleRequest::Cancel => (StateDelta::Terminated, EventName::Cancel),
        };
        state.reduce(delta);
        info!("Session {} -> {:?}", state.identifier, next);
        Some(name)
    }

    /// Builds and sends the payload. Returns false if construction failed and
    /// the event was skipped.
    pub fn dispatch(
        name: EventName,
        session: &SessionAttributes,
        feedback: Option<&EndOfRouteFeedback>,
        transport: &dyn Transport,
        recorder: &mut DispatchRecorder,
    ) -> bool {
        let (outcome, sent) = match lifecycle_payload(name, session, feedback) {
            Ok(payload) => {
                transport.send(name.as_str(), payload);
                (DispatchOutcome::Sent, true)
            }
            Err(e) => {
                warn!("Skipping {}: {}", name.as_str(), e);
                (DispatchOutcome::Dropped, false)
            }
        };

        recorder.record(DispatchRecord {
            name,
            event_id: None,
            at: session.created,
            outcome,
            queued_ms: None,
        });
        sent
    }
}
