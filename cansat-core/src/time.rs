//! Time sources for the flight loop
//!
//! All flight timing (flush intervals, button hold and debounce, GPS rate
//! limiting) is re-derived from a monotonic millisecond [`Timestamp`] each
//! tick. Targets supply their own [`TimeSource`] backed by a hardware timer.
//! Host builds get two helpers:
//! - [`ManualClock`]: shared, manually advanced clock that is also a delay
//!   provider, so a simulated flight advances time exactly by the delays the
//!   flight loop requests
//! - [`StdClock`]: `Instant`-based clock with a sleeping delay

/// Milliseconds since boot
pub type Timestamp = u64;

/// Source of time for the system
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs monotonic)
    fn is_wall_clock(&self) -> bool {
        false
    }

    /// Get precision in milliseconds
    fn precision_ms(&self) -> u32 {
        1
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn is_wall_clock(&self) -> bool {
        (**self).is_wall_clock()
    }

    fn precision_ms(&self) -> u32 {
        (**self).precision_ms()
    }
}

/// Milliseconds from `earlier` to `later`, zero if the clock went backwards
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}

#[cfg(feature = "std")]
mod host {
    use super::{TimeSource, Timestamp};
    use embedded_hal::delay::DelayNs;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    /// Manually advanced clock shared between clones
    ///
    /// Delays advance the clock instead of sleeping.
    ///
    /// ```rust
    /// use cansat_core::time::{ManualClock, TimeSource};
    /// use embedded_hal::delay::DelayNs;
    ///
    /// let clock = ManualClock::new(0);
    /// let mut delay = clock.clone();
    /// delay.delay_ms(250);
    /// assert_eq!(clock.now(), 250);
    /// ```
    #[derive(Debug, Clone, Default)]
    pub struct ManualClock {
        nanos: Rc<Cell<u64>>,
    }

    impl ManualClock {
        /// Create a clock starting at `start_ms`
        pub fn new(start_ms: Timestamp) -> Self {
            Self {
                nanos: Rc::new(Cell::new(start_ms * 1_000_000)),
            }
        }

        /// Jump to an absolute time
        pub fn set(&self, timestamp: Timestamp) {
            self.nanos.set(timestamp * 1_000_000);
        }

        /// Move forward by `ms`
        pub fn advance(&self, ms: u64) {
            self.nanos.set(self.nanos.get() + ms * 1_000_000);
        }
    }

    impl TimeSource for ManualClock {
        fn now(&self) -> Timestamp {
            self.nanos.get() / 1_000_000
        }
    }

    impl DelayNs for ManualClock {
        fn delay_ns(&mut self, ns: u32) {
            self.nanos.set(self.nanos.get() + u64::from(ns));
        }

        fn delay_ms(&mut self, ms: u32) {
            self.advance(u64::from(ms));
        }
    }

    /// Monotonic clock over `std::time::Instant`
    #[derive(Debug, Clone, Copy)]
    pub struct StdClock {
        start: Instant,
    }

    impl StdClock {
        /// Start counting from now
        pub fn new() -> Self {
            Self { start: Instant::now() }
        }
    }

    impl Default for StdClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TimeSource for StdClock {
        fn now(&self) -> Timestamp {
            self.start.elapsed().as_millis() as Timestamp
        }
    }

    impl DelayNs for StdClock {
        fn delay_ns(&mut self, ns: u32) {
            std::thread::sleep(Duration::from_nanos(u64::from(ns)));
        }
    }
}

#[cfg(feature = "std")]
pub use host::{ManualClock, StdClock};
