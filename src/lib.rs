pub mod config;
pub mod error;
pub mod kernel;
pub mod services;

// Re-export specific items if needed for convenient access
pub use config::TelemetryConfig;
pub use error::TelemetryError;
pub use kernel::reactor::TelemetryReactor;
