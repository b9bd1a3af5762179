use chrono::Duration;
use serde::Serialize;
use tracing::{debug, warn};

use super::identity::EventId;
use super::telemetry::queue::OutstandingQueue;
use super::telemetry::recorder::{DispatchOutcome, DispatchRecord, DispatchRecorder};
use super::time::{delay_from_secs, Timestamp};
use super::transport::Transport;
use crate::config::TelemetryConfig;

/// Why a flush evaluation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlushTrigger {
    ProgressUpdate,
    /// Periodic tick from the async driver.
    Cadence,
    /// Arrive or explicit cancel.
    Lifecycle,
    /// Application shutdown. Last chance to send anything.
    Termination,
}

impl FlushTrigger {
    pub fn is_forced(&self) -> bool {
        matches!(self, FlushTrigger::Lifecycle | FlushTrigger::Termination)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub trigger: FlushTrigger,
    pub sent: usize,
    pub dropped: usize,
    /// Entries still waiting after this run.
    pub retained: usize,
}

#[derive(Debug, Clone)]
pub struct FlushScheduler {
    delays_event_flushing: bool,
    delay: Duration,
}

impl FlushScheduler {
    pub fn new(delays_event_flushing: bool, delay: Duration) -> Self {
        Self {
            delays_event_flushing,
            delay: delay.max(Duration::zero()),
        }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.delays_event_flushing, delay_from_secs(config.flush_delay_seconds))
    }

    pub fn flush_all(&self, trigger: FlushTrigger) -> bool {
        trigger.is_forced() || !self.delays_event_flushing
    }

    /// Pure Projection: Queue + Now -> ids due for transmission, oldest first.
    pub fn plan(&self, queue: &OutstandingQueue, now: Timestamp, trigger: FlushTrigger) -> Vec<EventId> {
        queue
            .select_eligible(now, self.delay, self.flush_all(trigger))
            .into_iter()
            .map(|e| e.id)
            .collect()
    }

    /// Sends every due entry and drains it right after its send, so a later
    /// evaluation can never select it again.
    pub fn run(
        &self,
        queue: &mut OutstandingQueue,
        now: Timestamp,
        trigger: FlushTrigger,
        transport: &dyn Transport,
        recorder: &mut DispatchRecorder,
    ) -> FlushReport {
        let mut report = FlushReport {
            trigger,
            sent: 0,
            dropped: 0,
            retained: 0,
        };

        for id in self.plan(queue, now, trigger) {
            let Some(entry) = queue.get(id) else {
                continue;
            };
            let name = entry.event_name();
            let queued_ms = (now - entry.created_at).num_milliseconds().max(0);

            let outcome = match entry.to_payload() {
                Ok(payload) => {
                    transport.send(name.as_str(), payload);
                    report.sent += 1;
                    DispatchOutcome::Sent
                }
                Err(e) => {
                    warn!("Dropping {} {}: {}", name.as_str(), id, e);
                    report.dropped += 1;
                    DispatchOutcome::Dropped
                }
            };
            queue.drain(&[id]);

            recorder.record(DispatchRecord {
                name,
                event_id: Some(id),
                at: now,
                outcome,
                queued_ms: Some(queued_ms),
            });
        }

        if trigger.is_forced() {
            transport.flush();
        }

        report.retained = queue.len();
        if report.sent + report.dropped > 0 {
            debug!(
                "Flush ({:?}): sent {}, dropped {}, retained {}",
                trigger, report.sent, report.dropped, report.retained
            );
        }
        report
    }
}
