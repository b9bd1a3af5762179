use std::collections::VecDeque;

use super::event::EventName;
use super::metrics::{compute_snapshot, DispatchSnapshot};
use crate::kernel::identity::EventId;
use crate::kernel::time::Timestamp;

const MAX_RECORDS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    /// Payload could not be built; the event was skipped.
    Dropped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    pub name: EventName,
    pub event_id: Option<EventId>,
    pub at: Timestamp,
    pub outcome: DispatchOutcome,
    /// How long a delayed event waited in the queue. None for lifecycle events.
    pub queued_ms: Option<i64>,
}

#[derive(Debug, Default)]
pub struct DispatchRecorder {
    buffer: VecDeque<DispatchRecord>,
}

impl DispatchRecorder {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(1024),
        }
    }

    pub fn record(&mut self, record: DispatchRecord) {
        if self.buffer.len() >= MAX_RECORDS {
            self.buffer.pop_front();
        }
        self.buffer.push_back(record);
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        compute_snapshot(&self.buffer)
    }
}
