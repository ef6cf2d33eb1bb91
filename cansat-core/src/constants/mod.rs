//! Constants for the CanSat Flight Computer
//!
//! Every register address, threshold and default interval lives here so that
//! drivers and the flight loop never carry magic numbers.
//!
//! ## Organization
//!
//! - **Physics**: atmosphere model and unit conversions
//! - **Sensors**: BME280, MPU6050 and NEO-6M register maps, ranges and the
//!   documented calibration fallback table
//! - **Flight**: apogee and landing detection thresholds
//! - **Time**: loop pacing, flush, button and status intervals

/// Atmosphere model and unit conversions.
pub mod physics;

/// Sensor register maps, plausible ranges and calibration fallbacks.
pub mod sensors;

/// Event detection thresholds and window sizes.
pub mod flight;

/// Loop pacing and timing intervals.
pub mod time;

pub use physics::{SEA_LEVEL_PRESSURE_HPA, PA_PER_HPA, KNOTS_TO_KMH};
pub use time::{MS_PER_SECOND, TICK_INTERVAL_MS, SAVE_INTERVAL_MS};
