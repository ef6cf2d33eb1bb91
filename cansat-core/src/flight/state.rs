//! Flight phases and the transition graph
//!
//! ```text
//! WAITING_START ──press + sensors ok──▶ READY ──press──▶ ASCENT
//!                                                          │ apogee
//!                                                          ▼
//!                                       LANDED ◀─landing─ DESCENT
//!
//! any state ──long press──▶ SHUTDOWN
//! ```
//!
//! IDLE, PREFLIGHT and CALIBRATION keep their numeric codes for the event
//! file format but no edge leads to them.

use core::fmt;

use crate::errors::{FlightError, FlightResult};

/// Flight phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i8)]
pub enum FlightState {
    /// Powered, waiting for the first press
    WaitingStart = -1,
    /// Reserved, unreached
    Idle = 0,
    /// Reserved, unreached
    Preflight = 1,
    /// Reserved, unreached
    Calibration = 2,
    /// Sensors up and ground-referenced, waiting for launch press
    Ready = 3,
    /// Climbing, recording telemetry
    Ascent = 4,
    /// Falling after apogee, recording telemetry
    Descent = 5,
    /// On the ground
    Landed = 6,
    /// Halted after a graceful shutdown
    Shutdown = 7,
}

impl FlightState {
    /// Numeric state code
    pub const fn code(self) -> i8 {
        self as i8
    }

    /// Upper-case name used in event records
    pub const fn name(self) -> &'static str {
        match self {
            Self::WaitingStart => "WAITING_START",
            Self::Idle => "IDLE",
            Self::Preflight => "PREFLIGHT",
            Self::Calibration => "CALIBRATION",
            Self::Ready => "READY",
            Self::Ascent => "ASCENT",
            Self::Descent => "DESCENT",
            Self::Landed => "LANDED",
            Self::Shutdown => "SHUTDOWN",
        }
    }

    /// State for a numeric code
    pub const fn from_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(Self::WaitingStart),
            0 => Some(Self::Idle),
            1 => Some(Self::Preflight),
            2 => Some(Self::Calibration),
            3 => Some(Self::Ready),
            4 => Some(Self::Ascent),
            5 => Some(Self::Descent),
            6 => Some(Self::Landed),
            7 => Some(Self::Shutdown),
            _ => None,
        }
    }

    /// Whether telemetry is sampled and recorded in this state
    pub const fn is_flying(self) -> bool {
        matches!(self, Self::Ascent | Self::Descent)
    }

    /// Whether `next` is an edge of the flight graph
    pub const fn can_transition_to(self, next: FlightState) -> bool {
        matches!(
            (self, next),
            (Self::WaitingStart, Self::Ready)
                | (Self::Ready, Self::Ascent)
                | (Self::Ascent, Self::Descent)
                | (Self::Descent, Self::Landed)
        ) || (matches!(next, Self::Shutdown) && !matches!(self, Self::Shutdown))
    }
}

impl fmt::Display for FlightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FlightState {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.name())
    }
}

/// Sole owner of the current flight state
#[derive(Debug, Clone)]
pub struct FlightStateMachine {
    state: FlightState,
}

impl FlightStateMachine {
    /// Machine in WAITING_START
    pub const fn new() -> Self {
        Self { state: FlightState::WaitingStart }
    }

    /// Current state
    pub fn state(&self) -> FlightState {
        self.state
    }

    /// Move along an edge of the graph, returning the previous state
    pub fn transition(&mut self, next: FlightState) -> FlightResult<FlightState> {
        if !self.state.can_transition_to(next) {
            return Err(FlightError::InvalidTransition { from: self.state, to: next });
        }
        let previous = self.state;
        self.state = next;
        log_info!("state {} -> {}", previous.name(), next.name());
        Ok(previous)
    }
}

impl Default for FlightStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
