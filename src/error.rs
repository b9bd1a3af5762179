use thiserror::Error;

use crate::kernel::identity::EventId;

/// Failures inside the telemetry kernel. None of these ever reach navigation
/// logic: callers log and skip the affected event.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to serialize event payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("event {0} is already queued")]
    DuplicateEvent(EventId),

    #[error("payload for {0} did not serialize to a JSON object")]
    NonObjectPayload(&'static str),

    #[error("screen capture failed: {0}")]
    ScreenCapture(String),
}

pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;
