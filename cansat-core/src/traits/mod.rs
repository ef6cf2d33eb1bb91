//! Capability Traits for the Flight Computer
//!
//! The flight loop never touches hardware directly. Each board provides
//! implementations of these traits, selected at compile time through
//! [`Platform`]:
//!
//! - [`transport`] - register-level bus access ([`RegisterTransport`])
//! - [`stream`] - non-blocking byte sources for the GPS UART ([`Stream`])
//! - [`platform`] - alerts, button input and the [`Platform`] bundle
//!
//! Time comes from [`crate::time::TimeSource`] and blocking delays from
//! [`embedded_hal::delay::DelayNs`].

pub mod platform;
pub mod stream;
pub mod transport;

pub use platform::{
    AlertController, AlertPattern, ButtonInput, Led, Platform, ERROR_BLINK_MS, STARTUP_BLINK_MS,
};
pub use stream::{ByteStream, Stream};
pub use transport::{I2cTransport, RegisterTransport};
