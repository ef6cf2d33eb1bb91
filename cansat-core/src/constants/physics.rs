//! Physical Constants
//!
//! International Standard Atmosphere values used by the barometric altitude
//! formula, and the unit conversions applied to sensor output.

/// Standard sea-level pressure (hPa).
///
/// Reference pressure P0 for absolute altitude, and the ground reference
/// used when ground calibration fails.
pub const SEA_LEVEL_PRESSURE_HPA: f32 = 1013.25;

/// Scale height term of the hypsometric approximation (meters).
///
/// `h = 44330 · (1 − (P/P0)^0.1903)`
pub const ALTITUDE_SCALE_M: f64 = 44330.0;

/// Exponent of the hypsometric approximation (1 / 5.255).
pub const ALTITUDE_EXPONENT: f64 = 0.1903;

/// Pascals per hectopascal.
pub const PA_PER_HPA: f32 = 100.0;

/// Knots to kilometers per hour.
pub const KNOTS_TO_KMH: f32 = 1.852;

/// Standard gravity (m/s²), for converting g readings.
pub const STANDARD_GRAVITY: f32 = 9.80665;
