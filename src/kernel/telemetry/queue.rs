use chrono::Duration;
use std::collections::VecDeque;
use tracing::{debug, warn};

use super::pending::{EventPatch, PendingEvent};
use crate::error::{Result, TelemetryError};
use crate::kernel::identity::EventId;
use crate::kernel::route::LocationSample;
use crate::kernel::time::Timestamp;

/// Pending events in insertion order, keyed by id.
///
/// Expected to hold tens of entries at most, so lookups by id are linear scans.
#[derive(Debug, Default)]
pub struct OutstandingQueue {
    entries: VecDeque<PendingEvent>,
}

impl OutstandingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, event: PendingEvent) -> Result<()> {
        if self.contains(event.id) {
            return Err(TelemetryError::DuplicateEvent(event.id));
        }
        debug!("Queued {} {}", event.event_name().as_str(), event.id);
        self.entries.push_back(event);
        Ok(())
    }

    /// Returns false when the id is unknown (already flushed or cancelled) or the
    /// patch does not fit the entry's kind. Neither case is an error.
    pub fn update_by_id(&mut self, id: EventId, patch: &EventPatch) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                let applied = entry.apply(patch);
                if !applied {
                    warn!("Patch does not match {:?} entry {}; ignored", entry.kind, id);
                }
                applied
            }
            None => {
                debug!("Update for unknown event {}; ignored", id);
                false
            }
        }
    }

    pub fn remove_by_id(&mut self, id: EventId) -> Option<PendingEvent> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        self.entries.remove(pos)
    }

    /// Entries due for transmission, oldest first. Nothing is removed.
    pub fn select_eligible(&self, now: Timestamp, delay: Duration, flush_all: bool) -> Vec<&PendingEvent> {
        self.entries
            .iter()
            .filter(|e| flush_all || now - e.created_at > delay)
            .collect()
    }

    /// Removes exactly the given ids and returns what was removed, in queue order.
    pub fn drain(&mut self, ids: &[EventId]) -> Vec<PendingEvent> {
        let mut drained = Vec::with_capacity(ids.len());
        let mut kept = VecDeque::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if ids.contains(&entry.id) {
                drained.push(entry);
            } else {
                kept.push_back(entry);
            }
        }
        self.entries = kept;
        drained
    }

    pub fn record_location(&mut self, sample: LocationSample) {
        for entry in self.entries.iter_mut() {
            entry.record_location_after(sample);
        }
    }

    pub fn get(&self, id: EventId) -> Option<&PendingEvent> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingEvent> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
