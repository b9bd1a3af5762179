use serde::{Deserialize, Serialize};

use super::time::Timestamp;

/// WGS84 position, longitude first to match GeoJSON ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lng: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lng, lat }
    }
}

/// The subset of a directions response the telemetry layer cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Identifier of the directions request that produced this route.
    pub request_id: String,
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default)]
    pub geometry: Vec<Coordinate>,
    /// Metres.
    pub distance: f64,
    /// Seconds.
    pub expected_travel_time: f64,
    #[serde(default = "default_leg_count")]
    pub leg_count: usize,
}

fn default_profile() -> String {
    "driving-traffic".to_string()
}

fn default_leg_count() -> usize {
    1
}

impl Route {
    pub fn new(request_id: impl Into<String>, geometry: Vec<Coordinate>, distance: f64, expected_travel_time: f64) -> Self {
        Self {
            request_id: request_id.into(),
            profile: default_profile(),
            geometry,
            distance,
            expected_travel_time,
            leg_count: default_leg_count(),
        }
    }

    pub fn with_legs(mut self, leg_count: usize) -> Self {
        self.leg_count = leg_count.max(1);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    #[serde(flatten)]
    pub coordinate: Coordinate,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub course: f64,
    #[serde(default)]
    pub horizontal_accuracy: f64,
    #[serde(default)]
    pub altitude: f64,
}

impl LocationSample {
    pub fn at(coordinate: Coordinate, timestamp: Timestamp) -> Self {
        Self {
            coordinate,
            timestamp,
            speed: 0.0,
            course: 0.0,
            horizontal_accuracy: 0.0,
            altitude: 0.0,
        }
    }
}

/// One progress update from the route controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteProgress {
    pub route: Route,
    pub leg_index: usize,
    /// Set once the traveler has reached the waypoint that ends the current leg.
    pub user_has_arrived_at_waypoint: bool,
    /// Metres travelled on the current route.
    pub distance_traveled: f64,
    pub distance_remaining: f64,
    pub duration_remaining: f64,
    pub location: LocationSample,
}

impl RouteProgress {
    pub fn is_final_leg(&self) -> bool {
        self.leg_index + 1 >= self.route.leg_count
    }

    pub fn has_arrived_at_destination(&self) -> bool {
        self.is_final_leg() && self.user_has_arrived_at_waypoint
    }
}
