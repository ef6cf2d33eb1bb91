//! Press and hold recognition from a sampled button level
//!
//! The button is sampled once per tick. Hold and debounce are derived from
//! timestamps of those samples:
//!
//! - a hold is reported once the level has stayed high for `hold_ms`
//! - a press is reported on release, if the previous accepted press was more
//!   than `debounce_ms` earlier and the same contact was not already a hold

use crate::time::{elapsed_ms, Timestamp};

/// What a button sample means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonAction {
    /// Nothing to act on
    None,
    /// Short press, reported on release
    Press,
    /// Long press, reported while still held
    Hold,
}

/// Button state carried between ticks
#[derive(Debug, Clone)]
pub struct ButtonTracker {
    hold_ms: u64,
    debounce_ms: u64,
    pressed_since: Option<Timestamp>,
    last_press: Option<Timestamp>,
    hold_reported: bool,
}

impl ButtonTracker {
    /// Tracker with the given hold and debounce durations
    pub fn new(hold_ms: u32, debounce_ms: u32) -> Self {
        Self {
            hold_ms: u64::from(hold_ms),
            debounce_ms: u64::from(debounce_ms),
            pressed_since: None,
            last_press: None,
            hold_reported: false,
        }
    }

    /// Feed one sample taken at `now`
    pub fn update(&mut self, pressed: bool, now: Timestamp) -> ButtonAction {
        if pressed {
            let since = *self.pressed_since.get_or_insert(now);
            if !self.hold_reported && elapsed_ms(since, now) >= self.hold_ms {
                self.hold_reported = true;
                return ButtonAction::Hold;
            }
            return ButtonAction::None;
        }

        if self.pressed_since.take().is_none() {
            return ButtonAction::None;
        }
        if core::mem::take(&mut self.hold_reported) {
            return ButtonAction::None;
        }

        let debounced = self
            .last_press
            .map_or(true, |last| elapsed_ms(last, now) > self.debounce_ms);
        if debounced {
            self.last_press = Some(now);
            ButtonAction::Press
        } else {
            ButtonAction::None
        }
    }

    /// Whether the button is currently held
    pub fn is_held(&self) -> bool {
        self.pressed_since.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ButtonTracker {
        ButtonTracker::new(3000, 500)
    }

    #[test]
    fn press_reported_on_release() {
        let mut button = tracker();
        assert_eq!(button.update(true, 1000), ButtonAction::None);
        assert_eq!(button.update(true, 1100), ButtonAction::None);
        assert_eq!(button.update(false, 1200), ButtonAction::Press);
        assert_eq!(button.update(false, 1300), ButtonAction::None);
    }

    #[test]
    fn bounce_within_debounce_ignored() {
        let mut button = tracker();
        button.update(true, 1000);
        assert_eq!(button.update(false, 1100), ButtonAction::Press);
        button.update(true, 1200);
        assert_eq!(button.update(false, 1300), ButtonAction::None);
        button.update(true, 1700);
        assert_eq!(button.update(false, 1800), ButtonAction::Press);
    }

    #[test]
    fn hold_fires_once_and_suppresses_press() {
        let mut button = tracker();
        let mut holds = 0;
        for t in (0..=4000).step_by(100) {
            if button.update(true, t) == ButtonAction::Hold {
                holds += 1;
                assert_eq!(t, 3000);
            }
        }
        assert_eq!(holds, 1);
        assert_eq!(button.update(false, 4100), ButtonAction::None);
    }

    #[test]
    fn first_press_needs_no_history() {
        let mut button = tracker();
        button.update(true, 0);
        assert_eq!(button.update(false, 100), ButtonAction::Press);
    }
}
