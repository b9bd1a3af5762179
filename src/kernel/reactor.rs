use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{interval, Duration, MissedTickBehavior}; // Only for the loop driver
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::capture::{encode_screenshot, ScreenCapture};
use super::emitter::LifecycleEmitter;
use super::event::Event;
use super::identity::{EventId, IdentityGenerator, UuidGenerator};
use super::lifecycle::{LifecyclePhase, LifecycleRequest};
use super::observer::{NavigationObserver, NoopObserver};
use super::route::{LocationSample, Route, RouteProgress};
use super::scheduler::{FlushReport, FlushScheduler, FlushTrigger};
use super::state::{AppState, DeviceChange, DeviceOrientation, SessionState};
use super::telemetry::event::{EndOfRouteFeedback, EventName, FeedbackSource, FeedbackType, SessionAttributes};
use super::telemetry::metrics::DispatchSnapshot;
use super::telemetry::pending::{EventPatch, FeedbackDetails, PendingEvent, RerouteDetails};
use super::telemetry::queue::OutstandingQueue;
use super::telemetry::recorder::DispatchRecorder;
use super::time::{Clock, SystemClock, Timestamp, CADENCE_MS};
use super::transport::Transport;
use crate::config::TelemetryConfig;

/// Owns one navigation session's telemetry: the session state, the outstanding
/// queue and the flush policy. Every mutation goes through `&mut self`, so a
/// single owner serializes updates, patches and drains.
pub struct TelemetryReactor {
    pub config: TelemetryConfig,
    pub state: SessionState,
    pub queue: OutstandingQueue,
    pub scheduler: FlushScheduler,
    pub recorder: DispatchRecorder,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdentityGenerator>,
    capture: Option<Box<dyn ScreenCapture>>,
    observer: Box<dyn NavigationObserver>,
    last_progress: Option<RouteProgress>,
}

impl TelemetryReactor {
    pub fn new(config: TelemetryConfig, route: Route, transport: Arc<dyn Transport>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ids: Arc<dyn IdentityGenerator> = Arc::new(UuidGenerator);
        let state = SessionState::new(ids.next_id().0, route, clock.now(), config.location_history_capacity);
        Self {
            scheduler: FlushScheduler::from_config(&config),
            config,
            state,
            queue: OutstandingQueue::new(),
            recorder: DispatchRecorder::new(),
            transport,
            clock,
            ids,
            capture: None,
            observer: Box::new(NoopObserver),
            last_progress: None,
        }
    }

    /// Swaps the clock. The session restarts at the new clock's "now".
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self.restart_session();
        self
    }

    /// Swaps the id source. The session restarts under an id from `ids`.
    pub fn with_identity(mut self, ids: Arc<dyn IdentityGenerator>) -> Self {
        self.ids = ids;
        self.restart_session();
        self
    }

    fn restart_session(&mut self) {
        let route = self.state.original_route.clone();
        self.state = SessionState::new(
            self.ids.next_id().0,
            route,
            self.clock.now(),
            self.config.location_history_capacity,
        );
    }

    pub fn with_screen_capture(mut self, capture: Box<dyn ScreenCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn NavigationObserver>) -> Self {
        self.observer = observer;
        self
    }

    // === Feedback ===

    /// Queues a user feedback entry and returns its id. The entry waits for the
    /// configured delay so the user can still edit it.
    pub fn record_feedback(&mut self, feedback_type: FeedbackType, description: Option<String>) -> EventId {
        let id = self.ids.next_id();
        self.record_feedback_with_id(id, feedback_type, description)
    }

    /// Like [`record_feedback`](Self::record_feedback) with an id minted by the
    /// caller, so a host feeding the driver channel can edit or cancel it later.
    /// An id that is already queued is rejected and the existing entry kept.
    pub fn record_feedback_with_id(
        &mut self,
        id: EventId,
        feedback_type: FeedbackType,
        description: Option<String>,
    ) -> EventId {
        let now = self.clock.now();
        let details = FeedbackDetails {
            feedback_type,
            source: FeedbackSource::User,
            description,
            screenshot: self.screenshot(),
        };
        let event = PendingEvent::feedback(
            id,
            now,
            self.attributes(now),
            details,
            self.past_locations(),
            self.config.location_history_capacity,
        );

        match self.queue.enqueue(event) {
            Ok(()) => info!("Feedback {} recorded ({:?})", id, feedback_type),
            Err(e) => warn!("Feedback not queued: {}", e),
        }
        id
    }

    /// No-op if `id` was already flushed or cancelled.
    pub fn update_feedback(
        &mut self,
        id: EventId,
        feedback_type: FeedbackType,
        source: FeedbackSource,
        description: Option<String>,
    ) {
        let patch = EventPatch::Feedback {
            feedback_type,
            source,
            description,
        };
        self.queue.update_by_id(id, &patch);
    }

    /// No-op if `id` was already flushed or cancelled.
    pub fn cancel_feedback(&mut self, id: EventId) {
        if self.queue.remove_by_id(id).is_some() {
            info!("Feedback {} cancelled", id);
        } else {
            debug!("Cancel for unknown feedback {}; ignored", id);
        }
    }

    // === Progress & Lifecycle ===

    /// Drives depart/arrive detection and the opportunistic flush.
    pub fn on_progress_update(&mut self, progress: RouteProgress) {
        let now = self.clock.now();
        if self.state.phase() == LifecyclePhase::Cancelled {
            debug!("Progress after cancel ignored");
            return;
        }

        self.state.record_location(progress.location);
        self.queue.record_location(progress.location);
        let arrived = progress.has_arrived_at_destination();
        self.last_progress = Some(progress);

        if let Some(name) = LifecycleEmitter::advance(&mut self.state, LifecycleRequest::Depart, now) {
            self.emit(name, None, now);
            self.observer.on_depart(&self.state);
        }

        if arrived {
            if let Some(name) = LifecycleEmitter::advance(&mut self.state, LifecycleRequest::Arrive, now) {
                self.emit(name, None, now);
                self.observer.on_arrive(&self.state);
                self.flush(now, FlushTrigger::Lifecycle);
                return;
            }
        }

        self.flush(now, FlushTrigger::ProgressUpdate);
    }

    /// Records a reroute and queues its event. The queued entry is then patched
    /// with the route it resolved to.
    ///
    /// A new route after arrival (or after cancel) is a session boundary instead:
    /// the old session is flushed and a fresh one starts.
    pub fn on_reroute(&mut self, new_route: Route, proactive: bool) {
        let now = self.clock.now();

        if matches!(self.state.phase(), LifecyclePhase::Arrived | LifecyclePhase::Cancelled) {
            self.flush(now, FlushTrigger::Lifecycle);
            self.state.reset_session(self.ids.next_id().0, new_route, now);
            self.last_progress = None;
            info!("New session {} started", self.state.identifier);
            self.observer.on_session_reset(&self.state);
            return;
        }

        let id = self.ids.next_id();
        let details = RerouteDetails {
            screenshot: self.screenshot(),
            ..RerouteDetails::default()
        };
        // Attributes describe the route being abandoned.
        let event = PendingEvent::reroute(
            id,
            now,
            proactive,
            self.attributes(now),
            details,
            self.past_locations(),
            self.config.location_history_capacity,
        );
        if let Err(e) = self.queue.enqueue(event) {
            warn!("Reroute not queued: {}", e);
        }

        let traveled = self.last_progress.as_ref().map_or(0.0, |p| p.distance_traveled);
        self.state.record_reroute(new_route.clone(), proactive, now, traveled);
        self.last_progress = None;

        self.queue.update_by_id(id, &EventPatch::resulting_route(&new_route));

        info!(
            "{} onto {} (reroutes: {}, faster routes: {})",
            if proactive { "Faster route" } else { "Reroute" },
            new_route.request_id,
            self.state.number_of_reroutes,
            self.state.number_of_faster_routes
        );
        self.observer.on_reroute(&self.state, proactive);
    }

    /// Explicit user cancel, optionally rated. Flushes everything.
    pub fn on_cancel(&mut self, feedback: Option<EndOfRouteFeedback>) -> FlushReport {
        self.cancel(feedback, FlushTrigger::Lifecycle)
    }

    /// Application termination: cancel if the session never arrived, then flush
    /// the whole queue regardless of age.
    pub fn on_terminate(&mut self) -> FlushReport {
        self.cancel(None, FlushTrigger::Termination)
    }

    pub fn on_orientation_change(&mut self, orientation: DeviceOrientation) {
        let now = self.clock.now();
        self.state.report_change(DeviceChange::Orientation(orientation), now);
    }

    pub fn on_app_state_change(&mut self, app_state: AppState) {
        let now = self.clock.now();
        self.state.report_change(DeviceChange::AppState(app_state), now);
    }

    /// On-demand evaluation with the normal delay policy.
    pub fn flush_pending(&mut self) -> FlushReport {
        let now = self.clock.now();
        self.flush(now, FlushTrigger::Cadence)
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        self.recorder.snapshot()
    }

    /// Applies one driver event. Returns false once the session has terminated.
    pub fn apply(&mut self, event: Event) -> bool {
        match event {
            Event::Progress(progress) => self.on_progress_update(progress),
            Event::Reroute { route, proactive } => self.on_reroute(route, proactive),
            Event::Feedback {
                id,
                feedback_type,
                description,
            } => {
                let id = id.unwrap_or_else(|| self.ids.next_id());
                self.record_feedback_with_id(id, feedback_type, description);
            }
            Event::UpdateFeedback {
                id,
                feedback_type,
                source,
                description,
            } => self.update_feedback(id, feedback_type, source, description),
            Event::CancelFeedback { id } => self.cancel_feedback(id),
            Event::Orientation(o) => self.on_orientation_change(o),
            Event::AppState(s) => self.on_app_state_change(s),
            Event::Cancel { feedback } => {
                self.on_cancel(feedback);
            }
            Event::Terminate => {
                self.on_terminate();
                return false;
            }
        }
        true
    }

    fn cancel(&mut self, feedback: Option<EndOfRouteFeedback>, trigger: FlushTrigger) -> FlushReport {
        let now = self.clock.now();
        if let Some(name) = LifecycleEmitter::advance(&mut self.state, LifecycleRequest::Cancel, now) {
            self.emit(name, feedback.as_ref(), now);
            self.observer.on_cancel(&self.state);
        } else {
            debug!("No cancel owed in phase {:?}", self.state.phase());
        }
        self.flush(now, trigger)
    }

    fn emit(&mut self, name: EventName, feedback: Option<&EndOfRouteFeedback>, now: Timestamp) {
        let session = self.attributes(now);
        LifecycleEmitter::dispatch(name, &session, feedback, self.transport.as_ref(), &mut self.recorder);
    }

    fn flush(&mut self, now: Timestamp, trigger: FlushTrigger) -> FlushReport {
        let report = self
            .scheduler
            .run(&mut self.queue, now, trigger, self.transport.as_ref(), &mut self.recorder);
        if report.sent + report.dropped > 0 || trigger.is_forced() {
            self.observer.on_flush(&report);
        }
        report
    }

    fn attributes(&self, now: Timestamp) -> SessionAttributes {
        SessionAttributes::capture(&self.state, self.last_progress.as_ref(), now)
    }

    fn past_locations(&self) -> Vec<LocationSample> {
        self.state.past_locations.iter().copied().collect()
    }

    fn screenshot(&self) -> Option<String> {
        let capture = self.capture.as_ref()?;
        capture
            .capture(self.config.screenshot_max_dimension)
            .map(|bytes| encode_screenshot(&bytes))
    }

    /// Async Driver Loop
    ///
    /// Drains `receiver` on every cadence tick, then runs a delayed-policy flush.
    /// Stops on a `Terminate` event, on `shutdown`, or once every sender is gone;
    /// each path terminates the session exactly once.
    pub async fn run(&mut self, mut receiver: mpsc::Receiver<Event>, shutdown: CancellationToken) -> DispatchSnapshot {
        let period = match self.config.cadence_ms {
            0 => {
                warn!("cadence_ms is 0; using {}ms", CADENCE_MS);
                CADENCE_MS
            }
            ms => ms,
        };
        info!("Telemetry driver started. Cadence: {}ms", period);
        let mut cadence = interval(Duration::from_millis(period));
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = cadence.tick() => {}
            }

            let mut events = Vec::new();
            let mut disconnected = false;
            loop {
                match receiver.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }

            for event in events {
                if !self.apply(event) {
                    info!("Session terminated");
                    return self.snapshot();
                }
            }

            if disconnected {
                info!("All event sources closed");
                break;
            }

            self.flush_pending();
        }

        self.on_terminate();
        self.snapshot()
    }
}
