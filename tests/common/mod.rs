#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use std::sync::Arc;

use nav_telemetry::kernel::identity::SequentialIds;
use nav_telemetry::kernel::route::{Coordinate, LocationSample, Route, RouteProgress};
use nav_telemetry::kernel::time::{ManualClock, Timestamp};
use nav_telemetry::kernel::transport::MemoryTransport;
use nav_telemetry::{TelemetryConfig, TelemetryReactor};

pub fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

pub fn route(id: &str) -> Route {
    let geometry = (0..5).map(|i| Coordinate::new(52.0 + i as f64 * 0.001, 13.0)).collect();
    Route::new(id, geometry, 1000.0, 120.0)
}

pub fn progress(route: &Route, traveled: f64, arrived: bool, at: Timestamp) -> RouteProgress {
    RouteProgress {
        route: route.clone(),
        leg_index: route.leg_count - 1,
        user_has_arrived_at_waypoint: arrived,
        distance_traveled: traveled,
        distance_remaining: (route.distance - traveled).max(0.0),
        duration_remaining: 60.0,
        location: LocationSample::at(Coordinate::new(52.0, 13.0), at),
    }
}

pub struct Harness {
    pub reactor: TelemetryReactor,
    pub clock: ManualClock,
    pub transport: MemoryTransport,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(TelemetryConfig::default())
    }

    pub fn with_config(config: TelemetryConfig) -> Self {
        let clock = ManualClock::new(t0());
        let transport = MemoryTransport::new();
        let reactor = TelemetryReactor::new(config, route("r0"), Arc::new(transport.clone()))
            .with_clock(Arc::new(clock.clone()))
            .with_identity(Arc::new(SequentialIds::new()));
        Self {
            reactor,
            clock,
            transport,
        }
    }

    /// Progress update on the session's current route at the clock's "now".
    pub fn tick(&mut self, traveled: f64, arrived: bool) {
        let route = self.reactor.state.current_route.clone();
        let now = nav_telemetry::kernel::time::Clock::now(&self.clock);
        self.reactor.on_progress_update(progress(&route, traveled, arrived, now));
    }
}
