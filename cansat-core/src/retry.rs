//! Bounded retry with a fixed backoff
//!
//! Register accesses on a shared I2C bus fail transiently (brown-outs, a
//! stretched clock, a loose connector under vibration). Drivers wrap each
//! access in [`with_backoff`]: the operation runs up to `attempts` times with
//! `backoff_ms` of blocking delay between failures. There is no wall-clock
//! timeout, only the attempt bound.
//!
//! ```rust
//! use cansat_core::retry::{with_backoff, RetryPolicy};
//! use cansat_core::time::ManualClock;
//!
//! let mut delay = ManualClock::new(0);
//! let mut calls = 0;
//! let result: Result<u8, ()> = with_backoff(&RetryPolicy::default(), &mut delay, || {
//!     calls += 1;
//!     if calls < 3 { Err(()) } else { Ok(0x60) }
//! });
//! assert_eq!(result, Ok(0x60));
//! assert_eq!(calls, 3);
//! ```

use embedded_hal::delay::DelayNs;

use crate::constants::sensors::{REGISTER_RETRY_ATTEMPTS, REGISTER_RETRY_BACKOFF_MS};

/// Attempt count and delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves as one.
    pub attempts: u8,
    /// Delay after each failed attempt except the last (milliseconds)
    pub backoff_ms: u32,
}

impl RetryPolicy {
    /// Policy with explicit attempts and backoff
    pub const fn new(attempts: u8, backoff_ms: u32) -> Self {
        Self { attempts, backoff_ms }
    }

    /// Single attempt, no delay
    pub const fn once() -> Self {
        Self { attempts: 1, backoff_ms: 0 }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(REGISTER_RETRY_ATTEMPTS, REGISTER_RETRY_BACKOFF_MS)
    }
}

/// Run `op` until it succeeds or the attempt budget is spent
///
/// Returns the first success or the last error.
pub fn with_backoff<T, E, D, F>(policy: &RetryPolicy, delay: &mut D, mut op: F) -> Result<T, E>
where
    D: DelayNs,
    F: FnMut() -> Result<T, E>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => return Err(err),
            Err(_) => {
                log_trace!("retry {} of {} after {} ms", attempt, attempts, policy.backoff_ms);
                if policy.backoff_ms > 0 {
                    delay.delay_ms(policy.backoff_ms);
                }
                attempt += 1;
            }
        }
    }
}
