use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Identity of a pending telemetry event. Immutable once minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub trait IdentityGenerator: Send + Sync {
    fn next_id(&self) -> EventId;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdentityGenerator for UuidGenerator {
    fn next_id(&self) -> EventId {
        EventId::new()
    }
}

/// Deterministic ids (`00000000-0000-0000-0000-000000000001`, ...) for reproducible runs.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityGenerator for SequentialIds {
    fn next_id(&self) -> EventId {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        EventId(Uuid::from_u128(n as u128))
    }
}
