use serde::{Deserialize, Serialize};

/// Where a session sits in its one-way depart/arrive/cancel lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LifecyclePhase {
    /// Session created, no progress update seen yet.
    #[default]
    NotDeparted,
    /// At least one progress update seen; depart has been emitted.
    Departed,
    /// Final waypoint reached; arrive has been emitted. Only a new route leaves this.
    Arrived,
    /// Terminated before arrival; cancel has been emitted.
    Cancelled,
}

/// Signals that request a lifecycle transition.
/// These are REQUESTS, not forces. The graph validates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleRequest {
    Depart,
    Arrive,
    Cancel,
}

/// The state machine that governs lifecycle transitions.
pub struct LifecycleGraph;

impl LifecycleGraph {
    /// Pure function: (Current Phase, Request) -> New Phase
    /// Returns None if the transition is invalid or already taken, which makes
    /// every emission a one-shot.
    pub fn transition(current: LifecyclePhase, request: LifecycleRequest) -> Option<LifecyclePhase> {
        use LifecyclePhase::*;
        use LifecycleRequest::*;

        match (current, request) {
            (NotDeparted, Depart) => Some(Departed),
            (Departed, Arrive) => Some(Arrived),
            (NotDeparted, Cancel) | (Departed, Cancel) => Some(Cancelled),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_monotonic() {
        use LifecyclePhase::*;
        use LifecycleRequest::*;

        assert_eq!(LifecycleGraph::transition(NotDeparted, Depart), Some(Departed));
        assert_eq!(LifecycleGraph::transition(Departed, Depart), None);
        assert_eq!(LifecycleGraph::transition(NotDeparted, Arrive), None);
        assert_eq!(LifecycleGraph::transition(Departed, Arrive), Some(Arrived));
        assert_eq!(LifecycleGraph::transition(Arrived, Cancel), None);
        assert_eq!(LifecycleGraph::transition(Cancelled, Cancel), None);
        assert_eq!(LifecycleGraph::transition(Cancelled, Depart), None);
    }
}
