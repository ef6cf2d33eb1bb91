//! Flight logic: phases, button handling, event detection and the loop
//!
//! ## Module Organization
//!
//! - `state` - [`FlightState`] and the transition graph
//! - `button` - press and hold recognition from sampled levels
//! - `detector` - apogee and landing detection with hysteresis
//! - `computer` - the per-tick control loop tying sensors, detection,
//!   telemetry and feedback together

pub mod button;
pub mod computer;
pub mod detector;
pub mod state;

pub use button::{ButtonAction, ButtonTracker};
pub use computer::{FlightComputer, SensorStatus, TickOutcome};
pub use detector::{Detection, EventDetector};
pub use state::{FlightState, FlightStateMachine};
