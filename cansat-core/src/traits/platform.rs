//! Board capabilities: alerts, button and the platform bundle
//!
//! ## Overview
//!
//! A board crate implements [`Platform`] once. The flight computer is generic
//! over it, so the choice of buses, UART, storage and feedback hardware is
//! fixed at compile time and nothing is probed at runtime.
//!
//! ```text
//!            ┌──────────────── Platform ────────────────┐
//!            │ Bus ×2   Serial   Storage   Clock  Delay │
//!            │ Alert (LEDs + buzzer)      Button        │
//!            └──────────────────────────────────────────┘
//!                              │
//!                       FlightComputer<P>
//! ```
//!
//! ## Alert Patterns
//!
//! Buzzer sequences are `(on_ms, off_ms)` steps. The tables live on
//! [`AlertPattern`] so every board plays the same signals.

use embedded_hal::delay::DelayNs;

use crate::errors::FlightResult;
use crate::flight::FlightState;
use crate::telemetry::TelemetrySink;
use crate::time::{TimeSource, Timestamp};
use crate::traits::{RegisterTransport, Stream};

/// Status LEDs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Led {
    /// Healthy / progress indicator
    Green,
    /// Fault indicator
    Red,
}

/// Named feedback signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlertPattern {
    /// Board powered and storage ready
    Startup,
    /// Minimum sensor set initialised
    SensorsReady,
    /// Data collection started
    FlightStart,
    /// Apogee declared
    Apogee,
    /// Touchdown declared
    Landing,
    /// Recoverable or fatal error
    Error,
    /// Graceful shutdown
    Shutdown,
}

const STARTUP_STEPS: [(u32, u32); 3] = [(200, 100), (200, 100), (200, 0)];
const SENSORS_READY_STEPS: [(u32, u32); 2] = [(500, 200), (500, 0)];
const FLIGHT_START_STEPS: [(u32, u32); 3] = [(500, 100), (500, 100), (500, 0)];
const APOGEE_STEPS: [(u32, u32); 4] = [(300, 100), (300, 100), (300, 100), (300, 0)];
const LANDING_STEPS: [(u32, u32); 3] = [(1000, 200), (1000, 200), (1000, 0)];
const ERROR_STEPS: [(u32, u32); 5] = [(100, 100); 5];
const SHUTDOWN_STEPS: [(u32, u32); 3] = [(500, 200), (500, 200), (500, 0)];

/// Red LED toggle pattern after a failed tick (milliseconds)
pub const ERROR_BLINK_MS: [u32; 6] = [100, 100, 100, 100, 100, 100];

/// Green LED toggle pattern at power-up (milliseconds)
pub const STARTUP_BLINK_MS: [u32; 3] = [200, 200, 200];

impl AlertPattern {
    /// Buzzer steps as `(on_ms, off_ms)`
    pub const fn buzz_steps(&self) -> &'static [(u32, u32)] {
        match self {
            Self::Startup => &STARTUP_STEPS,
            Self::SensorsReady => &SENSORS_READY_STEPS,
            Self::FlightStart => &FLIGHT_START_STEPS,
            Self::Apogee => &APOGEE_STEPS,
            Self::Landing => &LANDING_STEPS,
            Self::Error => &ERROR_STEPS,
            Self::Shutdown => &SHUTDOWN_STEPS,
        }
    }

    /// Upper-case name used in logs
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Startup => "STARTUP",
            Self::SensorsReady => "SENSORS_READY",
            Self::FlightStart => "FLIGHT_START",
            Self::Apogee => "APOGEE",
            Self::Landing => "LANDING",
            Self::Error => "ERROR",
            Self::Shutdown => "SHUTDOWN",
        }
    }
}

/// LED and buzzer feedback
///
/// Implementations block for the duration of a pattern.
pub trait AlertController {
    /// Toggle `led` for each duration in `pattern_ms`, ending off
    fn blink(&mut self, led: Led, pattern_ms: &[u32]);

    /// Sound the buzzer for each `(on_ms, off_ms)` step
    fn buzz(&mut self, steps: &[(u32, u32)]);

    /// Drive an LED steadily
    fn set_led(&mut self, _led: Led, _on: bool) {}

    /// Play a named pattern
    fn play(&mut self, pattern: AlertPattern) {
        self.buzz(pattern.buzz_steps());
    }

    /// Reflect the flight state on the status LEDs, called once per tick
    ///
    /// The default lights green once the system is armed or flying and red
    /// while waiting for the start press.
    fn show_state(&mut self, state: FlightState) {
        match state {
            FlightState::WaitingStart => {
                self.set_led(Led::Red, true);
                self.set_led(Led::Green, false);
            }
            FlightState::Shutdown => self.all_off(),
            _ => {
                self.set_led(Led::Red, false);
                self.set_led(Led::Green, true);
            }
        }
    }

    /// Turn every LED off
    fn all_off(&mut self) {
        self.set_led(Led::Green, false);
        self.set_led(Led::Red, false);
    }
}

/// Start/stop push button
pub trait ButtonInput {
    /// Debounced level, `true` while held
    fn is_pressed(&mut self) -> bool;
}

/// Everything a board provides to the flight computer
pub trait Platform {
    /// I2C register transport for the sensors
    type Bus: RegisterTransport;
    /// GPS UART byte source
    type Serial: Stream<Item = u8>;
    /// Blocking delay provider
    type Delay: DelayNs + Clone;
    /// Monotonic millisecond clock
    type Clock: TimeSource + Clone;
    /// Telemetry file storage
    type Storage: TelemetrySink;
    /// LED and buzzer output
    type Alert: AlertController;
    /// Start/stop button
    type Button: ButtonInput;

    /// Clock handle
    fn clock(&self) -> Self::Clock;

    /// Delay handle
    fn delay(&self) -> Self::Delay;

    /// Open the bus the barometer sits on
    fn open_barometer_bus(&mut self) -> FlightResult<Self::Bus>;

    /// Open the bus the inertial sensor sits on
    fn open_inertial_bus(&mut self) -> FlightResult<Self::Bus>;

    /// Open the GPS UART
    fn open_gps_serial(&mut self) -> FlightResult<Self::Serial>;

    /// Create the data and event files for a session
    fn open_storage(&mut self, session: Timestamp) -> FlightResult<Self::Storage>;

    /// Feedback outputs
    fn alerts(&mut self) -> &mut Self::Alert;

    /// Start/stop button
    fn button(&mut self) -> &mut Self::Button;
}
