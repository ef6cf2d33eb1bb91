//! Time-Related Constants
//!
//! Default pacing of the control loop. [`crate::config::FlightConfig`] starts
//! from these values.

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

/// Post-iteration delay of the control loop (milliseconds).
///
/// Pacing only, not a deadline. Blocking retries and flushes stretch a tick.
pub const TICK_INTERVAL_MS: u32 = 100;

/// Minimum time between telemetry flushes (milliseconds).
pub const SAVE_INTERVAL_MS: u32 = 5000;

/// Interval between status log lines (milliseconds).
pub const STATUS_INTERVAL_MS: u32 = 10_000;

/// Pause after a failed tick before the loop resumes (milliseconds).
pub const ERROR_RECOVERY_MS: u32 = 1000;

/// Button hold duration that triggers shutdown (milliseconds).
pub const BUTTON_HOLD_MS: u32 = 3000;

/// Minimum spacing between two accepted single presses (milliseconds).
pub const BUTTON_DEBOUNCE_MS: u32 = 500;

/// Minimum spacing between GPS serial drains (milliseconds).
pub const GPS_UPDATE_INTERVAL_MS: u64 = 1000;

/// Default number of ground calibration samples.
pub const GROUND_SAMPLES: u8 = 10;

/// Default spacing between ground calibration samples (milliseconds).
pub const GROUND_SAMPLE_DELAY_MS: u32 = 100;

/// Settling time after a BME280 soft reset (milliseconds).
pub const BME280_RESET_SETTLE_MS: u32 = 200;

/// Settling time after writing the BME280 measurement configuration (milliseconds).
pub const BME280_CONFIG_SETTLE_MS: u32 = 100;

/// Settling time after waking the MPU6050 (milliseconds).
pub const MPU6050_WAKE_SETTLE_MS: u32 = 100;
