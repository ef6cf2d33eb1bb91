//! Flight computer core for a CanSat-class atmospheric payload
//!
//! Fuses barometric, inertial and GPS readings into a forward-only flight
//! phase machine and records telemetry to append-only CSV files, all from a
//! single cooperative control loop.
//!
//! Key constraints:
//! - Runs as the only program on a microcontroller, no OS, no threads
//! - No heap allocation outside the `std` host sinks
//! - A bad sensor read never stops the loop; only storage loss at startup does
//!
//! ```text
//! I2C ──▶ Bme280 ─┐
//! I2C ──▶ Mpu6050 ┼──▶ FlightComputer ──▶ EventDetector ──▶ FlightStateMachine
//! UART ─▶ GpsRx ──┘          │                                     │
//!                            ▼                                     ▼
//!                  TelemetryRecorder ──▶ data / events CSV   AlertController
//! ```
//!
//! ```rust,ignore
//! use cansat_core::{FlightComputer, FlightConfig};
//!
//! let mut computer = FlightComputer::new(board(), FlightConfig::default())?;
//! computer.run()?;
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

// logging macros, declared before every module that uses them
#[macro_use]
mod fmt;

pub mod buffer;
pub mod config;
pub mod constants;
pub mod drivers;
pub mod errors;
pub mod events;
pub mod flight;
pub mod fusion;
pub mod retry;
pub mod telemetry;
pub mod time;
pub mod traits;

// Public API
pub use config::{EstimatorConfig, FlightConfig, Verbosity};
pub use errors::{FlightError, FlightResult};
pub use events::{EventKind, EventRecord};
pub use flight::{FlightComputer, FlightState, SensorStatus, TickOutcome};
pub use fusion::{KalmanFilter3D, KalmanParams};
pub use telemetry::{LogFile, PhysicalReading, TelemetryRecorder, TelemetryRow, TelemetrySink};
pub use time::{TimeSource, Timestamp};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
