//! Flight Event Records
//!
//! ## Overview
//!
//! Every state transition and notable condition produces one [`EventRecord`].
//! Records are append-only: the recorder writes them to the event file as
//! soon as they are created and never buffers or edits them.
//!
//! ```text
//! timestamp,event,state,altitude,details
//! 12.300,Flight Start,ASCENT,0.12,Data collection initiated
//! 47.800,Apogee Detected,DESCENT,212.4,"Max altitude: 214.9m, Velocity: -3.10m/s"
//! ```
//!
//! `state` is the state *after* the event was handled, so a transition event
//! names the state it entered.
//!
//! ## Usage Example
//!
//! ```rust
//! use cansat_core::events::{EventKind, EventRecord};
//! use cansat_core::flight::FlightState;
//!
//! let record = EventRecord::new(1500, EventKind::FlightStart, FlightState::Ascent)
//!     .with_altitude(Some(0.5))
//!     .with_details("Data collection initiated");
//!
//! assert_eq!(
//!     record.to_csv().unwrap().as_str(),
//!     "1.500,Flight Start,ASCENT,0.5,Data collection initiated"
//! );
//! ```

use core::fmt::{self, Write};

use crate::errors::FlightResult;
use crate::flight::FlightState;
use crate::telemetry::csv::{self, CsvLine};
use crate::time::Timestamp;

/// Maximum length of an event's details text
pub const EVENT_DETAILS_CAPACITY: usize = 96;

/// Event details text
pub type EventDetails = heapless::String<EVENT_DETAILS_CAPACITY>;

/// Header line of the event file
pub const EVENT_HEADER: &str = "timestamp,event,state,altitude,details";

/// Kinds of flight events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    /// Storage opened at boot
    SystemInitialization,
    /// Control loop started
    MainLoop,
    /// Single press accepted
    ButtonPress,
    /// Long press accepted
    ButtonHold,
    /// Generic state change
    StateChange,
    /// READY to ASCENT
    FlightStart,
    /// ASCENT to DESCENT
    ApogeeDetected,
    /// Touchdown by impact spike
    ImpactDetected,
    /// Touchdown by altitude stability
    LandingDetected,
    /// Touchdown by the loop-level low-altitude rule
    LandingConfirmed,
    /// Sensor initialisation or other operator-visible failure
    Error,
    /// A tick failed and the loop recovered
    MainLoopError,
    /// Telemetry rows could not be written
    DataSaveError,
    /// Graceful shutdown started
    Shutdown,
}

impl EventKind {
    /// Name written to the event file
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SystemInitialization => "System Initialization",
            Self::MainLoop => "Main Loop",
            Self::ButtonPress => "Button Press",
            Self::ButtonHold => "Button Hold",
            Self::StateChange => "State Change",
            Self::FlightStart => "Flight Start",
            Self::ApogeeDetected => "Apogee Detected",
            Self::ImpactDetected => "Impact Detected",
            Self::LandingDetected => "Landing Detected",
            Self::LandingConfirmed => "Landing Confirmed",
            Self::Error => "Error",
            Self::MainLoopError => "Main Loop Error",
            Self::DataSaveError => "Data Save Error",
            Self::Shutdown => "Shutdown",
        }
    }
}

/// One line of the event file
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// When the event happened
    pub timestamp: Timestamp,
    /// What happened
    pub kind: EventKind,
    /// State after the event was handled
    pub state: FlightState,
    /// Latest altitude, if one was available
    pub altitude_m: Option<f32>,
    /// Free text
    pub details: EventDetails,
}

impl EventRecord {
    /// Record without altitude or details
    pub fn new(timestamp: Timestamp, kind: EventKind, state: FlightState) -> Self {
        Self {
            timestamp,
            kind,
            state,
            altitude_m: None,
            details: EventDetails::new(),
        }
    }

    /// Attach the latest altitude
    pub fn with_altitude(mut self, altitude_m: Option<f32>) -> Self {
        self.altitude_m = altitude_m;
        self
    }

    /// Attach details, truncated to [`EVENT_DETAILS_CAPACITY`]
    pub fn with_details(mut self, text: &str) -> Self {
        self.details.clear();
        for ch in text.chars() {
            if self.details.push(ch).is_err() {
                break;
            }
        }
        self
    }

    /// Attach formatted details
    ///
    /// Output that does not fit is cut at the last fragment that did.
    pub fn with_details_fmt(mut self, args: fmt::Arguments<'_>) -> Self {
        self.details.clear();
        let _ = self.details.write_fmt(args);
        self
    }

    /// Format as an event file line
    pub fn to_csv(&self) -> FlightResult<CsvLine> {
        csv::line(|out| {
            csv::push_timestamp(out, self.timestamp)?;
            write!(out, ",{},{},", self.kind.name(), self.state.name())?;
            csv::push_optional(out, self.altitude_m)?;
            out.write_char(',')?;
            csv::push_text(out, &self.details)
        })
    }
}
