use serde::Serialize;
use std::collections::VecDeque;

use super::event::EventName;
use super::recorder::{DispatchOutcome, DispatchRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchSnapshot {
    pub departs: u64,
    pub arrives: u64,
    pub cancels: u64,
    pub feedbacks: u64,
    pub reroutes: u64,
    pub faster_routes: u64,
    pub dropped: u64,
    pub queue_stats: QueueLatencyStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueLatencyStats {
    pub delayed_sent: u64,
    pub avg_queued_ms: f64,
    pub max_queued_ms: i64,
}

impl DispatchSnapshot {
    pub fn sent(&self, name: EventName) -> u64 {
        match name {
            EventName::Depart => self.departs,
            EventName::Arrive => self.arrives,
            EventName::Cancel => self.cancels,
            EventName::Feedback => self.feedbacks,
            EventName::Reroute => self.reroutes,
            EventName::FasterRoute => self.faster_routes,
        }
    }

    pub fn total_sent(&self) -> u64 {
        EventName::ALL.iter().map(|n| self.sent(*n)).sum()
    }
}

pub fn compute_snapshot(records: &VecDeque<DispatchRecord>) -> DispatchSnapshot {
    let mut snap = DispatchSnapshot::default();
    let mut total_queued_ms: i64 = 0;

    for record in records {
        if record.outcome == DispatchOutcome::Dropped {
            snap.dropped += 1;
            continue;
        }

        match record.name {
            EventName::Depart => snap.departs += 1,
            EventName::Arrive => snap.arrives += 1,
            EventName::Cancel => snap.cancels += 1,
            EventName::Feedback => snap.feedbacks += 1,
            EventName::Reroute => snap.reroutes += 1,
            EventName::FasterRoute => snap.faster_routes += 1,
        }

        if let Some(waited) = record.queued_ms {
            snap.queue_stats.delayed_sent += 1;
            total_queued_ms += waited;
            snap.queue_stats.max_queued_ms = snap.queue_stats.max_queued_ms.max(waited);
        }
    }

    if snap.queue_stats.delayed_sent > 0 {
        snap.queue_stats.avg_queued_ms = total_queued_ms as f64 / snap.queue_stats.delayed_sent as f64;
    }

    snap
}
