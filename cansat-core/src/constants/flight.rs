//! Flight Event Detection Thresholds
//!
//! Tuned for a parachute-recovered payload dropped from a few hundred meters.
//! Velocity is derived as Δaltitude / [`ASSUMED_TICK_S`], not measured time.

/// Capacity of the altitude history ring buffer.
pub const ALTITUDE_HISTORY_LEN: usize = 10;

/// Samples examined by the trend and variance checks.
pub const TREND_WINDOW: usize = 5;

/// Decreasing steps within the trend window that count as a descent trend.
pub const DESCENT_STEPS_REQUIRED: usize = 4;

/// Descent confidence needed before the velocity rule may declare apogee.
pub const DESCENT_CONFIDENCE_REQUIRED: u8 = 3;

/// Vertical velocity below which the payload is falling (m/s).
pub const DESCENT_VELOCITY_MPS: f32 = -1.0;

/// Vertical acceleration below which apogee is declared immediately (g).
pub const FREEFALL_ACCEL_G: f32 = -0.5;

/// Altitude below which an impact spike counts as touchdown (m).
pub const IMPACT_ALTITUDE_M: f32 = 4.0;

/// Absolute vertical acceleration treated as an impact (g).
pub const IMPACT_ACCEL_G: f32 = 3.0;

/// Altitude variance (m²) under which the payload is considered at rest.
pub const LANDING_VARIANCE_MAX: f32 = 0.25;

/// Vertical velocity above which the payload is no longer descending (m/s).
pub const LANDING_VELOCITY_MIN_MPS: f32 = -0.5;

/// Landing confidence needed to declare touchdown.
pub const LANDING_CONFIDENCE_REQUIRED: u8 = 5;

/// Upper bound for both confidence counters.
pub const CONFIDENCE_CEILING: u8 = 100;

/// Altitude under which the loop-level landing rule counts ticks (m).
pub const LOW_ALTITUDE_M: f32 = 10.0;

/// Consecutive low ticks the loop-level rule must exceed.
pub const LOW_ALTITUDE_TICKS: u8 = 5;

/// Tick length assumed by velocity estimation (seconds).
pub const ASSUMED_TICK_S: f32 = 0.1;
