//! Runtime configuration.
//!
//! Loaded from an optional JSON file, then overlaid from `NAV_TELEMETRY_*`
//! environment variables. Every field has a default, so `{}` is a valid file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::kernel::state::DEFAULT_LOCATION_HISTORY;
use crate::kernel::time::CADENCE_MS;

pub const DEFAULT_FLUSH_DELAY_SECONDS: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// When false every evaluation flushes the whole queue.
    pub delays_event_flushing: bool,
    /// How long feedback and reroute entries wait for late metadata.
    pub flush_delay_seconds: f64,
    /// Capacity of the session's location history and of each entry's
    /// `locationsAfter`.
    pub location_history_capacity: usize,
    pub screenshot_max_dimension: u32,
    /// Period of the async driver's flush evaluation.
    pub cadence_ms: u64,
    pub collector: Option<CollectorConfig>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            delays_event_flushing: true,
            flush_delay_seconds: DEFAULT_FLUSH_DELAY_SECONDS,
            location_history_capacity: DEFAULT_LOCATION_HISTORY,
            screenshot_max_dimension: 250,
            cadence_ms: CADENCE_MS,
            collector: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub base_url: String,
    pub access_token: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Buffered events that force a batch upload without waiting for flush().
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_max_batch() -> usize {
    32
}

impl TelemetryConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).context("Failed to parse telemetry config")?;
        Ok(config.validated())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// File named by `NAV_TELEMETRY_CONFIG` if set, defaults otherwise, then the
    /// environment overlay.
    pub fn load() -> Result<Self> {
        let base = match std::env::var("NAV_TELEMETRY_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        Ok(base.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Applies `NAV_TELEMETRY_*` overrides read through `lookup`. Unparseable
    /// values are ignored with a warning.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("NAV_TELEMETRY_DELAYS_FLUSHING") {
            match raw.trim().parse::<bool>() {
                Ok(v) => self.delays_event_flushing = v,
                Err(_) => warn!("Ignoring NAV_TELEMETRY_DELAYS_FLUSHING={:?}", raw),
            }
        }
        if let Some(raw) = lookup("NAV_TELEMETRY_FLUSH_DELAY_SECONDS") {
            match raw.trim().parse::<f64>() {
                Ok(v) => self.flush_delay_seconds = v,
                Err(_) => warn!("Ignoring NAV_TELEMETRY_FLUSH_DELAY_SECONDS={:?}", raw),
            }
        }
        if let Some(url) = lookup("NAV_TELEMETRY_COLLECTOR_URL") {
            let token = lookup("NAV_TELEMETRY_ACCESS_TOKEN").unwrap_or_default();
            self.collector = Some(CollectorConfig {
                base_url: url,
                access_token: token,
                timeout_ms: default_timeout_ms(),
                max_batch: default_max_batch(),
            });
        }
        self.validated()
    }

    fn validated(mut self) -> Self {
        if !self.flush_delay_seconds.is_finite() || self.flush_delay_seconds < 0.0 {
            warn!(
                "flush_delay_seconds {} is invalid; using {}",
                self.flush_delay_seconds, DEFAULT_FLUSH_DELAY_SECONDS
            );
            self.flush_delay_seconds = DEFAULT_FLUSH_DELAY_SECONDS;
        }
        if self.cadence_ms == 0 {
            self.cadence_ms = CADENCE_MS;
        }
        self
    }
}
