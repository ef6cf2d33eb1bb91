//! Flight configuration
//!
//! [`FlightConfig`] gathers every tunable the flight loop reads. Defaults come
//! from [`crate::constants`]. Host builds can load a JSON override where any
//! missing field keeps its default:
//!
//! ```rust
//! # #[cfg(feature = "std")] {
//! use cansat_core::config::{FlightConfig, Verbosity};
//!
//! let config = FlightConfig::from_json(r#"{ "save_interval_ms": 2000, "verbosity": "Verbose" }"#).unwrap();
//! assert_eq!(config.save_interval_ms, 2000);
//! assert_eq!(config.verbosity, Verbosity::Verbose);
//! assert_eq!(config.tick_interval_ms, 100);
//! # }
//! ```

use crate::constants::physics::SEA_LEVEL_PRESSURE_HPA;
use crate::constants::time::{
    BUTTON_DEBOUNCE_MS, BUTTON_HOLD_MS, ERROR_RECOVERY_MS, GROUND_SAMPLES, GROUND_SAMPLE_DELAY_MS,
    SAVE_INTERVAL_MS, STATUS_INTERVAL_MS, TICK_INTERVAL_MS,
};
use crate::errors::{FlightError, FlightResult};
use crate::fusion::KalmanParams;

/// How much the drivers and loop report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Verbosity {
    /// Warnings and errors only
    Quiet,
    /// State changes, events and status lines
    #[default]
    Normal,
    /// Also raw register values and per-sample detail
    Verbose,
}

impl Verbosity {
    /// Whether raw register traffic should be logged
    pub fn is_verbose(self) -> bool {
        self == Self::Verbose
    }

    /// Whether periodic status lines should be logged
    pub fn reports_status(self) -> bool {
        self >= Self::Normal
    }
}

/// Optional Kalman smoothing of the acceleration fed to event detection
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EstimatorConfig {
    /// Route acceleration through the filter before detection
    pub enabled: bool,
    /// Process noise added per update
    pub process_variance: f32,
    /// Measurement noise of the accelerometer
    pub measurement_variance: f32,
    /// Error variance after a reset
    pub initial_error_variance: f32,
}

impl EstimatorConfig {
    /// Filter parameters
    pub fn params(&self) -> KalmanParams {
        KalmanParams {
            process_variance: self.process_variance,
            measurement_variance: self.measurement_variance,
            initial_error_variance: self.initial_error_variance,
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        let params = KalmanParams::default();
        Self {
            enabled: false,
            process_variance: params.process_variance,
            measurement_variance: params.measurement_variance,
            initial_error_variance: params.initial_error_variance,
        }
    }
}

/// Flight loop configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FlightConfig {
    /// Delay after each loop iteration (ms)
    pub tick_interval_ms: u32,
    /// Minimum spacing between telemetry flushes (ms)
    pub save_interval_ms: u32,
    /// Spacing between status log lines (ms)
    pub status_interval_ms: u32,
    /// Pause after a failed tick (ms)
    pub error_recovery_ms: u32,
    /// Hold duration that triggers shutdown (ms)
    pub button_hold_ms: u32,
    /// Minimum spacing between single presses (ms)
    pub button_debounce_ms: u32,
    /// Reference pressure for absolute altitude (hPa)
    pub sea_level_pressure_hpa: f32,
    /// Ground calibration sample count
    pub ground_samples: u8,
    /// Spacing between ground calibration samples (ms)
    pub ground_sample_delay_ms: u32,
    /// Logging detail for drivers and loop
    pub verbosity: Verbosity,
    /// Acceleration smoothing for detection
    pub estimator: EstimatorConfig,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: TICK_INTERVAL_MS,
            save_interval_ms: SAVE_INTERVAL_MS,
            status_interval_ms: STATUS_INTERVAL_MS,
            error_recovery_ms: ERROR_RECOVERY_MS,
            button_hold_ms: BUTTON_HOLD_MS,
            button_debounce_ms: BUTTON_DEBOUNCE_MS,
            sea_level_pressure_hpa: SEA_LEVEL_PRESSURE_HPA,
            ground_samples: GROUND_SAMPLES,
            ground_sample_delay_ms: GROUND_SAMPLE_DELAY_MS,
            verbosity: Verbosity::Normal,
            estimator: EstimatorConfig::default(),
        }
    }
}

impl FlightConfig {
    /// Check that every field can be flown
    pub fn validate(&self) -> FlightResult<()> {
        if self.tick_interval_ms == 0 {
            return Err(FlightError::Config { reason: "tick_interval_ms must be > 0" });
        }
        if self.save_interval_ms == 0 {
            return Err(FlightError::Config { reason: "save_interval_ms must be > 0" });
        }
        if self.status_interval_ms == 0 {
            return Err(FlightError::Config { reason: "status_interval_ms must be > 0" });
        }
        if self.button_hold_ms == 0 {
            return Err(FlightError::Config { reason: "button_hold_ms must be > 0" });
        }
        if self.ground_samples == 0 {
            return Err(FlightError::Config { reason: "ground_samples must be > 0" });
        }
        if !(self.sea_level_pressure_hpa > 0.0) {
            return Err(FlightError::Config { reason: "sea_level_pressure_hpa must be > 0" });
        }
        let est = &self.estimator;
        if !(est.process_variance > 0.0 && est.measurement_variance > 0.0 && est.initial_error_variance > 0.0) {
            return Err(FlightError::Config { reason: "estimator variances must be > 0" });
        }
        Ok(())
    }

    /// Parse a JSON document, filling missing fields with defaults
    #[cfg(feature = "std")]
    pub fn from_json(json: &str) -> FlightResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|_| FlightError::Config { reason: "malformed JSON" })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to JSON
    #[cfg(feature = "std")]
    pub fn to_json(&self) -> FlightResult<String> {
        serde_json::to_string_pretty(self).map_err(|_| FlightError::Config { reason: "serialization failed" })
    }
}
