use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Wall-clock instant used for every timestamp in the kernel.
pub type Timestamp = DateTime<Utc>;

/// Default cadence of the async driver.
pub const CADENCE_MS: u64 = 1_000;

/// Source of "now". Eligibility checks are made against this, never against
/// `Utc::now()` directly, so tests can drive time by hand.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now = *now + by;
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Converts a configured delay in (possibly fractional) seconds.
/// Negative and non-finite values collapse to zero.
pub fn delay_from_secs(secs: f64) -> Duration {
    if !secs.is_finite() || secs <= 0.0 {
        return Duration::zero();
    }
    Duration::milliseconds((secs * 1000.0).round() as i64)
}

/// Whole seconds elapsed since `earlier`, or -1 when there is no earlier instant.
pub fn seconds_since(earlier: Option<Timestamp>, now: Timestamp) -> i64 {
    match earlier {
        Some(t) => (now - t).num_seconds().max(0),
        None => -1,
    }
}
