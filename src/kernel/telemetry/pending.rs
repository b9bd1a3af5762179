use serde::Serialize;
use serde_json::{Map, Value};

use super::event::{to_object, EventName, FeedbackSource, FeedbackType, SessionAttributes};
use crate::error::Result;
use crate::kernel::identity::EventId;
use crate::kernel::route::{Coordinate, LocationSample, Route};
use crate::kernel::time::Timestamp;

/// Which delayed event an entry will become.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PendingKind {
    Feedback,
    Reroute,
    /// Proactive reroute onto a faster route. Shares the queue with reactive
    /// reroutes but keeps its own name and counter.
    FasterRoute,
}

impl PendingKind {
    pub fn event_name(&self) -> EventName {
        match self {
            PendingKind::Feedback => EventName::Feedback,
            PendingKind::Reroute => EventName::Reroute,
            PendingKind::FasterRoute => EventName::FasterRoute,
        }
    }

    pub fn for_reroute(proactive: bool) -> Self {
        if proactive {
            PendingKind::FasterRoute
        } else {
            PendingKind::Reroute
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackDetails {
    pub feedback_type: FeedbackType,
    pub source: FeedbackSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Base64 JPEG.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RerouteDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_request_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_distance_remaining: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_duration_remaining: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_geometry: Option<Vec<Coordinate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PendingDetails {
    Feedback(FeedbackDetails),
    Reroute(RerouteDetails),
}

/// In-place update for a queued entry. Only fields a caller may still change
/// before flush are representable here.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPatch {
    Feedback {
        feedback_type: FeedbackType,
        source: FeedbackSource,
        description: Option<String>,
    },
    Reroute {
        new_request_identifier: String,
        new_distance_remaining: f64,
        new_duration_remaining: f64,
        new_geometry: Vec<Coordinate>,
    },
}

impl EventPatch {
    /// Patch describing the route a reroute resolved to.
    pub fn resulting_route(route: &Route) -> Self {
        EventPatch::Reroute {
            new_request_identifier: route.request_id.clone(),
            new_distance_remaining: route.distance,
            new_duration_remaining: route.expected_travel_time,
            new_geometry: route.geometry.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub id: EventId,
    pub created_at: Timestamp,
    pub kind: PendingKind,
    pub session: SessionAttributes,
    pub details: PendingDetails,
    pub locations_before: Vec<LocationSample>,
    pub locations_after: Vec<LocationSample>,
    after_capacity: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueuedBody<'a> {
    event: &'static str,
    feedback_id: EventId,
    #[serde(flatten)]
    session: &'a SessionAttributes,
    #[serde(flatten)]
    details: &'a PendingDetails,
    locations_before: &'a [LocationSample],
    locations_after: &'a [LocationSample],
}

impl PendingEvent {
    pub fn feedback(
        id: EventId,
        created_at: Timestamp,
        session: SessionAttributes,
        details: FeedbackDetails,
        locations_before: Vec<LocationSample>,
        after_capacity: usize,
    ) -> Self {
        Self {
            id,
            created_at,
            kind: PendingKind::Feedback,
            session,
            details: PendingDetails::Feedback(details),
            locations_before,
            locations_after: Vec::new(),
            after_capacity,
        }
    }

    pub fn reroute(
        id: EventId,
        created_at: Timestamp,
        proactive: bool,
        session: SessionAttributes,
        details: RerouteDetails,
        locations_before: Vec<LocationSample>,
        after_capacity: usize,
    ) -> Self {
        Self {
            id,
            created_at,
            kind: PendingKind::for_reroute(proactive),
            session,
            details: PendingDetails::Reroute(details),
            locations_before,
            locations_after: Vec::new(),
            after_capacity,
        }
    }

    pub fn event_name(&self) -> EventName {
        self.kind.event_name()
    }

    /// Applies `patch` if it matches this entry's kind. Returns whether anything changed.
    pub fn apply(&mut self, patch: &EventPatch) -> bool {
        match (&mut self.details, patch) {
            (
                PendingDetails::Feedback(details),
                EventPatch::Feedback {
                    feedback_type,
                    source,
                    description,
                },
            ) => {
                details.feedback_type = *feedback_type;
                details.source = *source;
                details.description = description.clone();
                true
            }
            (
                PendingDetails::Reroute(details),
                EventPatch::Reroute {
                    new_request_identifier,
                    new_distance_remaining,
                    new_duration_remaining,
                    new_geometry,
                },
            ) => {
                details.new_request_identifier = Some(new_request_identifier.clone());
                details.new_distance_remaining = Some(*new_distance_remaining);
                details.new_duration_remaining = Some(*new_duration_remaining);
                details.new_geometry = Some(new_geometry.clone());
                true
            }
            _ => false,
        }
    }

    /// Appends a sample observed while the entry waits. Silently stops at capacity.
    pub fn record_location_after(&mut self, sample: LocationSample) {
        if self.locations_after.len() < self.after_capacity {
            self.locations_after.push(sample);
        }
    }

    /// Serializes the entry as it stands right now.
    pub fn to_payload(&self) -> Result<Map<String, Value>> {
        let name = self.event_name();
        let body = QueuedBody {
            event: name.as_str(),
            feedback_id: self.id,
            session: &self.session,
            details: &self.details,
            locations_before: &self.locations_before,
            locations_after: &self.locations_after,
        };
        to_object(name, &body)
    }
}
