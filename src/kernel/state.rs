use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use super::lifecycle::LifecyclePhase;
use super::route::{LocationSample, Route};
use super::time::Timestamp;

pub const DEFAULT_LOCATION_HISTORY: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceOrientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AppState {
    #[default]
    Foreground,
    Background,
}

/// Platform signal recorded for later payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceChange {
    Orientation(DeviceOrientation),
    AppState(AppState),
}

/// Strict state delta. This is the ONLY way session state mutates.
#[derive(Debug, Clone)]
pub enum StateDelta {
    Departed(Timestamp),
    Arrived(Timestamp),
    Terminated,
    Rerouted {
        route: Route,
        proactive: bool,
        at: Timestamp,
        /// Distance travelled on the route being abandoned.
        distance_traveled: f64,
    },
    LocationRecorded(LocationSample),
    DeviceChanged { change: DeviceChange, at: Timestamp },
}

/// Accumulated time spent in two mutually exclusive modes.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ModeClock {
    primary: Duration,
    secondary: Duration,
    in_primary: bool,
    since: Timestamp,
}

impl ModeClock {
    fn new(in_primary: bool, since: Timestamp) -> Self {
        Self {
            primary: Duration::zero(),
            secondary: Duration::zero(),
            in_primary,
            since,
        }
    }

    fn switch(&mut self, in_primary: bool, at: Timestamp) {
        self.close_interval(at);
        self.in_primary = in_primary;
    }

    fn close_interval(&mut self, at: Timestamp) {
        let span = (at - self.since).max(Duration::zero());
        if self.in_primary {
            self.primary = self.primary + span;
        } else {
            self.secondary = self.secondary + span;
        }
        self.since = at;
    }

    /// Share of time in the primary mode up to `now`, 0-100.
    fn percent_primary(&self, now: Timestamp) -> u8 {
        let open = (now - self.since).max(Duration::zero());
        let (primary, secondary) = if self.in_primary {
            (self.primary + open, self.secondary)
        } else {
            (self.primary, self.secondary + open)
        };
        let total = (primary + secondary).num_milliseconds();
        if total <= 0 {
            return if self.in_primary { 100 } else { 0 };
        }
        ((primary.num_milliseconds() as f64 / total as f64) * 100.0).round() as u8
    }
}

/// In-memory snapshot of one navigation session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub identifier: Uuid,
    pub started_at: Timestamp,
    pub current_route: Route,
    pub original_route: Route,
    pub departure_timestamp: Option<Timestamp>,
    pub arrival_timestamp: Option<Timestamp>,
    pub last_reroute_date: Option<Timestamp>,
    pub number_of_reroutes: u32,
    pub number_of_faster_routes: u32,
    /// Metres travelled on routes abandoned by a reroute.
    pub distance_completed: f64,
    pub past_locations: VecDeque<LocationSample>,
    pub terminated: bool,
    pub device_orientation: DeviceOrientation,
    pub app_state: AppState,
    location_capacity: usize,
    orientation_clock: ModeClock,
    app_state_clock: ModeClock,
}

impl SessionState {
    pub fn new(identifier: Uuid, route: Route, now: Timestamp, location_capacity: usize) -> Self {
        Self::carrying(identifier, route, now, location_capacity, DeviceOrientation::default(), AppState::default())
    }

    fn carrying(
        identifier: Uuid,
        route: Route,
        now: Timestamp,
        location_capacity: usize,
        device_orientation: DeviceOrientation,
        app_state: AppState,
    ) -> Self {
        Self {
            identifier,
            started_at: now,
            current_route: route.clone(),
            original_route: route,
            departure_timestamp: None,
            arrival_timestamp: None,
            last_reroute_date: None,
            number_of_reroutes: 0,
            number_of_faster_routes: 0,
            distance_completed: 0.0,
            past_locations: VecDeque::with_capacity(location_capacity),
            terminated: false,
            device_orientation,
            app_state,
            location_capacity,
            orientation_clock: ModeClock::new(device_orientation == DeviceOrientation::Portrait, now),
            app_state_clock: ModeClock::new(app_state == AppState::Foreground, now),
        }
    }

    /// Replaces the session with a fresh one for `route` under a new `identifier`.
    /// The device keeps its orientation and app state across the boundary;
    /// everything else is cleared.
    pub fn reset_session(&mut self, identifier: Uuid, route: Route, now: Timestamp) {
        *self = Self::carrying(
            identifier,
            route,
            now,
            self.location_capacity,
            self.device_orientation,
            self.app_state,
        );
    }

    pub fn record_reroute(&mut self, new_route: Route, proactive: bool, at: Timestamp, distance_traveled: f64) {
        self.reduce(StateDelta::Rerouted {
            route: new_route,
            proactive,
            at,
            distance_traveled,
        });
    }

    pub fn report_change(&mut self, change: DeviceChange, at: Timestamp) {
        self.reduce(StateDelta::DeviceChanged { change, at });
    }

    pub fn record_location(&mut self, sample: LocationSample) {
        self.reduce(StateDelta::LocationRecorded(sample));
    }

    /// Pure reduction: State + Delta -> Mutated State
    pub fn reduce(&mut self, delta: StateDelta) {
        match delta {
            StateDelta::Departed(at) => {
                if self.departure_timestamp.is_none() {
                    self.departure_timestamp = Some(at);
                }
            }
            StateDelta::Arrived(at) => {
                if self.arrival_timestamp.is_none() {
                    self.arrival_timestamp = Some(at);
                }
            }
            StateDelta::Terminated => {
                self.terminated = true;
            }
            StateDelta::Rerouted {
                route,
                proactive,
                at,
                distance_traveled,
            } => {
                self.current_route = route;
                self.last_reroute_date = Some(at);
                self.distance_completed += distance_traveled.max(0.0);
                if proactive {
                    self.number_of_faster_routes += 1;
                } else {
                    self.number_of_reroutes += 1;
                }
            }
            StateDelta::LocationRecorded(sample) => {
                if self.location_capacity == 0 {
                    return;
                }
                if self.past_locations.len() >= self.location_capacity {
                    self.past_locations.pop_front();
                }
                self.past_locations.push_back(sample);
            }
            StateDelta::DeviceChanged { change, at } => match change {
                DeviceChange::Orientation(o) => {
                    self.orientation_clock.switch(o == DeviceOrientation::Portrait, at);
                    self.device_orientation = o;
                }
                DeviceChange::AppState(s) => {
                    self.app_state_clock.switch(s == AppState::Foreground, at);
                    self.app_state = s;
                }
            },
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        if self.terminated {
            LifecyclePhase::Cancelled
        } else if self.arrival_timestamp.is_some() {
            LifecyclePhase::Arrived
        } else if self.departure_timestamp.is_some() {
            LifecyclePhase::Departed
        } else {
            LifecyclePhase::NotDeparted
        }
    }

    pub fn percent_time_in_portrait(&self, now: Timestamp) -> u8 {
        self.orientation_clock.percent_primary(now)
    }

    pub fn percent_time_in_foreground(&self, now: Timestamp) -> u8 {
        self.app_state_clock.percent_primary(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::route::Coordinate;
    use chrono::{TimeZone, Utc};

    fn route(id: &str) -> Route {
        Route::new(id, vec![Coordinate::new(0.0, 0.0)], 1000.0, 60.0)
    }

    #[test]
    fn reroute_counters_split_by_kind() {
        let t0 = Utc.timestamp_opt(0, 0).unwrap();
        let mut state = SessionState::new(Uuid::from_u128(1), route("a"), t0, 4);
        state.record_reroute(route("b"), false, t0, 100.0);
        state.record_reroute(route("c"), true, t0, 50.0);
        assert_eq!(state.number_of_reroutes, 1);
        assert_eq!(state.number_of_faster_routes, 1);
        assert_eq!(state.current_route.request_id, "c");
        assert_eq!(state.original_route.request_id, "a");
        assert_eq!(state.distance_completed, 150.0);
    }

    #[test]
    fn location_history_is_bounded() {
        let t0 = Utc.timestamp_opt(0, 0).unwrap();
        let mut state = SessionState::new(Uuid::from_u128(1), route("a"), t0, 3);
        for i in 0..5 {
            state.record_location(LocationSample::at(Coordinate::new(i as f64, 0.0), t0));
        }
        assert_eq!(state.past_locations.len(), 3);
        assert_eq!(state.past_locations[0].coordinate.lat, 2.0);
    }

    #[test]
    fn orientation_share_tracks_elapsed_time() {
        let t0 = Utc.timestamp_opt(0, 0).unwrap();
        let mut state = SessionState::new(Uuid::from_u128(1), route("a"), t0, 3);
        assert_eq!(state.percent_time_in_portrait(t0), 100);

        state.report_change(DeviceChange::Orientation(DeviceOrientation::Landscape), t0 + Duration::seconds(30));
        assert_eq!(state.percent_time_in_portrait(t0 + Duration::seconds(60)), 50);
        assert_eq!(state.percent_time_in_foreground(t0 + Duration::seconds(60)), 100);
    }

    #[test]
    fn reset_keeps_device_state_only() {
        let t0 = Utc.timestamp_opt(0, 0).unwrap();
        let mut state = SessionState::new(Uuid::from_u128(1), route("a"), t0, 3);
        state.reduce(StateDelta::Departed(t0));
        state.reduce(StateDelta::Arrived(t0));
        state.report_change(DeviceChange::AppState(AppState::Background), t0);
        let old_id = state.identifier;

        state.reset_session(Uuid::from_u128(2), route("b"), t0);
        assert_ne!(state.identifier, old_id);
        assert_eq!(state.phase(), LifecyclePhase::NotDeparted);
        assert_eq!(state.original_route.request_id, "b");
        assert_eq!(state.app_state, AppState::Background);
    }
}
