use serde::{Deserialize, Serialize};

use super::identity::EventId;
use super::route::{Route, RouteProgress};
use super::state::{AppState, DeviceOrientation};
use super::telemetry::event::{EndOfRouteFeedback, FeedbackSource, FeedbackType};

/// External signals fed to the async driver. One JSON object per line in the
/// replay format, e.g. `{"type":"orientation","data":"landscape"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    Progress(RouteProgress),
    Reroute {
        route: Route,
        #[serde(default)]
        proactive: bool,
    },
    /// New user feedback. A caller-supplied `id` lets later events refer to it.
    Feedback {
        #[serde(default)]
        id: Option<EventId>,
        #[serde(default)]
        feedback_type: FeedbackType,
        #[serde(default)]
        description: Option<String>,
    },
    /// Edits queued feedback. Ignored once it has been sent.
    UpdateFeedback {
        id: EventId,
        #[serde(default)]
        feedback_type: FeedbackType,
        #[serde(default)]
        source: FeedbackSource,
        #[serde(default)]
        description: Option<String>,
    },
    /// Withdraws queued feedback. Ignored once it has been sent.
    CancelFeedback { id: EventId },
    Orientation(DeviceOrientation),
    AppState(AppState),
    /// Explicit user cancel, optionally rated.
    Cancel {
        #[serde(default)]
        feedback: Option<EndOfRouteFeedback>,
    },
    /// Application is going away. `{"type":"terminate"}`.
    Terminate,
}
