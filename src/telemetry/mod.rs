//! Recorded session input

pub mod car;
pub mod loader;
pub mod records;

pub use car::{CarSample, CarTelemetry};
pub use loader::{read_json, JsonSessionDir, SessionData, TelemetryError};
