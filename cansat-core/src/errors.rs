//! Error Types for the Flight Computer
//!
//! ## Overview
//!
//! Every fallible operation in the crate returns [`FlightResult`]. The error enum
//! carries only `Copy` data and `&'static str` messages so it can be returned
//! from drivers and stored in sensor status without allocation.
//!
//! ## Error Categories
//!
//! ### Sensor Bring-Up
//! - `DeviceNotFound`: no device answered at the expected address, or its
//!   identity register held the wrong value. Fatal to that sensor only.
//!
//! ### Runtime Faults
//! - `Transport`: a register read or write failed after the retry budget.
//!   Drivers turn this into "no reading" before it reaches flight logic.
//! - `OutOfRange`: a computed value fell outside physical bounds.
//! - `Calibration`: factory constants rejected. Always recovered by the
//!   documented fallback table.
//! - `Storage`: the telemetry sink refused a write. Recoverable per tick.
//!
//! ### Control Faults
//! - `InvalidTransition`: a flight state change the graph does not allow.
//! - `Config`: a configuration value that cannot be flown.
//! - `Fatal`: startup cannot continue; the program aborts.
//!
//! ## Handling Strategy
//!
//! ```rust
//! use cansat_core::FlightError;
//!
//! fn on_tick_error(err: FlightError) -> bool {
//!     if err.is_fatal() {
//!         // play the error pattern and stop
//!         return false;
//!     }
//!     // log, record a "Main Loop Error" event and keep flying
//!     true
//! }
//! # assert!(on_tick_error(FlightError::Storage { reason: "sd busy" }));
//! ```

use thiserror_no_std::Error;

use crate::flight::FlightState;

/// Result type for flight computer operations
pub type FlightResult<T> = Result<T, FlightError>;

/// Flight computer errors - `Copy` and allocation-free
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FlightError {
    /// Device absent or identity mismatch
    #[error("Device not found: {device}")]
    DeviceNotFound {
        /// Which sensor failed to answer
        device: &'static str,
    },

    /// Bus I/O failed after all retries
    #[error("Transport failure on {device} at register {register:#04x}")]
    Transport {
        /// Device being addressed
        device: &'static str,
        /// First register of the failed access
        register: u8,
    },

    /// Computed value outside plausible bounds
    #[error("Value {value} outside range [{min}, {max}]")]
    OutOfRange {
        /// The rejected value
        value: f32,
        /// Lower plausible bound
        min: f32,
        /// Upper plausible bound
        max: f32,
    },

    /// Factory calibration constants rejected
    #[error("Calibration rejected: {reason}")]
    Calibration {
        /// Which constant group failed validation
        reason: &'static str,
    },

    /// Telemetry sink failure
    #[error("Storage failure: {reason}")]
    Storage {
        /// Failing operation
        reason: &'static str,
    },

    /// Requested state change is not an edge of the flight graph
    #[error("Invalid transition {from} -> {to}")]
    InvalidTransition {
        /// State the machine was in
        from: FlightState,
        /// Rejected target state
        to: FlightState,
    },

    /// Configuration value cannot be used
    #[error("Invalid configuration: {reason}")]
    Config {
        /// Offending setting
        reason: &'static str,
    },

    /// Unrecoverable startup or storage failure
    #[error("Fatal: {reason}")]
    Fatal {
        /// What could not be brought up
        reason: &'static str,
    },
}

impl FlightError {
    /// Whether the control loop must stop on this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// Short static label for event records
    pub fn label(&self) -> &'static str {
        match self {
            Self::DeviceNotFound { device } => device,
            Self::Transport { device, .. } => device,
            Self::OutOfRange { .. } => "value out of range",
            Self::Calibration { reason } => reason,
            Self::Storage { reason } => reason,
            Self::InvalidTransition { .. } => "invalid transition",
            Self::Config { reason } => reason,
            Self::Fatal { reason } => reason,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FlightError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::DeviceNotFound { device } =>
                defmt::write!(fmt, "Device not found: {}", device),
            Self::Transport { device, register } =>
                defmt::write!(fmt, "Transport failure on {} at {=u8:#x}", device, register),
            Self::OutOfRange { value, min, max } =>
                defmt::write!(fmt, "Value {} outside [{}, {}]", value, min, max),
            Self::Calibration { reason } =>
                defmt::write!(fmt, "Calibration rejected: {}", reason),
            Self::Storage { reason } =>
                defmt::write!(fmt, "Storage failure: {}", reason),
            Self::InvalidTransition { from, to } =>
                defmt::write!(fmt, "Invalid transition {} -> {}", from.name(), to.name()),
            Self::Config { reason } =>
                defmt::write!(fmt, "Invalid configuration: {}", reason),
            Self::Fatal { reason } =>
                defmt::write!(fmt, "Fatal: {}", reason),
        }
    }
}
