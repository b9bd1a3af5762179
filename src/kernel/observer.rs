use super::scheduler::FlushReport;
use super::state::SessionState;

/// Hooks the host can implement to follow the session. Every method has a
/// no-op default, so implementors override only what they need.
pub trait NavigationObserver: Send {
    fn on_depart(&mut self, _state: &SessionState) {}

    fn on_arrive(&mut self, _state: &SessionState) {}

    fn on_reroute(&mut self, _state: &SessionState, _proactive: bool) {}

    fn on_cancel(&mut self, _state: &SessionState) {}

    /// A new session replaced the previous one.
    fn on_session_reset(&mut self, _state: &SessionState) {}

    fn on_flush(&mut self, _report: &FlushReport) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl NavigationObserver for NoopObserver {}
