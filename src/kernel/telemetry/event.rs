use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::error::{Result, TelemetryError};
use crate::kernel::route::RouteProgress;
use crate::kernel::state::{AppState, DeviceOrientation, SessionState};
use crate::kernel::time::{seconds_since, Timestamp};

pub const EVENT_VERSION: u32 = 8;

/// Every event name this kernel can put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    Depart,
    Arrive,
    Cancel,
    Feedback,
    Reroute,
    FasterRoute,
}

impl EventName {
    pub const ALL: [EventName; 6] = [
        EventName::Depart,
        EventName::Arrive,
        EventName::Cancel,
        EventName::Feedback,
        EventName::Reroute,
        EventName::FasterRoute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::Depart => "navigation.depart",
            EventName::Arrive => "navigation.arrive",
            EventName::Cancel => "navigation.cancel",
            EventName::Feedback => "navigation.feedback",
            EventName::Reroute => "navigation.reroute",
            EventName::FasterRoute => "navigation.fasterRoute",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedbackType {
    #[default]
    General,
    Accident,
    Hazard,
    RoadClosed,
    NotAllowed,
    RoutingError,
    MissingRoad,
    MissingExit,
    ConfusingInstruction,
    InaccurateGps,
    IncorrectVisual,
}

/// Who originated a feedback entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedbackSource {
    #[default]
    User,
    Reroute,
    Unknown,
}

/// Optional end-of-route rating attached to an explicit cancel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndOfRouteFeedback {
    /// Accepted range is 0-100; anything else is dropped from the payload.
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

impl EndOfRouteFeedback {
    pub fn new(rating: i64, comment: impl Into<String>) -> Self {
        Self {
            rating: Some(rating),
            comment: Some(comment.into()),
        }
    }

    pub fn validated_rating(&self) -> Option<u8> {
        let raw = self.rating?;
        match u8::try_from(raw) {
            Ok(r) if r <= 100 => Some(r),
            _ => {
                warn!("Ignoring out-of-range end-of-route rating {}", raw);
                None
            }
        }
    }
}

/// Session-derived fields stamped on every payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAttributes {
    pub event_version: u32,
    pub created: Timestamp,
    pub session_identifier: Uuid,
    pub start_timestamp: Timestamp,
    pub request_identifier: String,
    pub original_request_identifier: String,
    pub profile: String,
    pub leg_index: usize,
    pub leg_count: usize,
    pub distance_completed: f64,
    pub distance_remaining: f64,
    pub duration_remaining: f64,
    pub estimated_distance: f64,
    pub estimated_duration: f64,
    pub reroute_count: u32,
    pub faster_route_count: u32,
    pub seconds_since_last_reroute: i64,
    pub departure_timestamp: Option<Timestamp>,
    pub arrival_timestamp: Option<Timestamp>,
    pub percent_time_in_portrait: u8,
    pub percent_time_in_foreground: u8,
    pub device_orientation: DeviceOrientation,
    pub application_state: AppState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

impl SessionAttributes {
    /// Reads the session (never mutates it). `progress` is the latest update, if any.
    pub fn capture(state: &SessionState, progress: Option<&RouteProgress>, now: Timestamp) -> Self {
        let route = &state.current_route;
        let (leg_index, traveled, distance_remaining, duration_remaining, position) = match progress {
            Some(p) => (
                p.leg_index,
                p.distance_traveled,
                p.distance_remaining,
                p.duration_remaining,
                Some(p.location.coordinate),
            ),
            None => (0, 0.0, route.distance, route.expected_travel_time, None),
        };

        Self {
            event_version: EVENT_VERSION,
            created: now,
            session_identifier: state.identifier,
            start_timestamp: state.started_at,
            request_identifier: route.request_id.clone(),
            original_request_identifier: state.original_route.request_id.clone(),
            profile: route.profile.clone(),
            leg_index,
            leg_count: route.leg_count,
            distance_completed: state.distance_completed + traveled.max(0.0),
            distance_remaining,
            duration_remaining,
            estimated_distance: state.original_route.distance,
            estimated_duration: state.original_route.expected_travel_time,
            reroute_count: state.number_of_reroutes,
            faster_route_count: state.number_of_faster_routes,
            seconds_since_last_reroute: seconds_since(state.last_reroute_date, now),
            departure_timestamp: state.departure_timestamp,
            arrival_timestamp: state.arrival_timestamp,
            percent_time_in_portrait: state.percent_time_in_portrait(now),
            percent_time_in_foreground: state.percent_time_in_foreground(now),
            device_orientation: state.device_orientation,
            application_state: state.app_state,
            lat: position.map(|c| c.lat),
            lng: position.map(|c| c.lng),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LifecycleBody<'a> {
    event: &'static str,
    #[serde(flatten)]
    session: &'a SessionAttributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
}

/// Builds the payload of a depart/arrive/cancel event.
pub fn lifecycle_payload(
    name: EventName,
    session: &SessionAttributes,
    feedback: Option<&EndOfRouteFeedback>,
) -> Result<Map<String, Value>> {
    let body = LifecycleBody {
        event: name.as_str(),
        session,
        rating: feedback.and_then(EndOfRouteFeedback::validated_rating),
        comment: feedback.and_then(|f| f.comment.as_deref()),
    };
    to_object(name, &body)
}

pub(crate) fn to_object<T: Serialize>(name: EventName, body: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(TelemetryError::NonObjectPayload(name.as_str())),
    }
}
