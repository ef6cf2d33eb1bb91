//! Apogee and landing detection from a noisy altitude stream
//!
//! ## Overview
//!
//! The detector is fed one altitude sample per tick while the payload is
//! flying. It owns the rolling [`AltitudeHistory`] and two hysteresis
//! counters, and reports at most one [`Detection`] per sample. It never
//! changes the flight state itself; the flight computer applies the
//! transition a detection names.
//!
//! ## Apogee (ASCENT)
//!
//! Once the history holds [`TREND_WINDOW`] samples, each sample scores the
//! last five: four decreasing steps raise `descent_confidence`, anything
//! else lowers it (never below zero). Apogee is declared when
//!
//! ```text
//! (velocity < −1.0 m/s  AND  descent_confidence ≥ 3)  OR  vertical accel < −0.5 g
//! ```
//!
//! ## Landing (DESCENT)
//!
//! ```text
//! altitude < 4 m AND |vertical accel| > 3 g          → Impact, immediately
//! variance(last 5) < 0.25 m² AND velocity > −0.5 m/s → landing_confidence += 1
//! otherwise                                          → landing_confidence −= 1
//! landing_confidence ≥ 5                             → Landing
//! ```
//!
//! Velocity is Δaltitude divided by the nominal 0.1 s tick, not the measured
//! interval. The very first sample only primes the detector.

use crate::buffer::AltitudeHistory;
use crate::constants::flight::{
    ASSUMED_TICK_S, CONFIDENCE_CEILING, DESCENT_CONFIDENCE_REQUIRED, DESCENT_STEPS_REQUIRED,
    DESCENT_VELOCITY_MPS, FREEFALL_ACCEL_G, IMPACT_ACCEL_G, IMPACT_ALTITUDE_M,
    LANDING_CONFIDENCE_REQUIRED, LANDING_VARIANCE_MAX, LANDING_VELOCITY_MIN_MPS, TREND_WINDOW,
};
use crate::events::EventKind;
use crate::flight::FlightState;
use crate::traits::AlertPattern;

/// A flight event recognised by the detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detection {
    /// Peak passed, now descending
    Apogee {
        /// Highest altitude seen this flight (m)
        max_altitude_m: f32,
        /// Velocity at detection (m/s)
        velocity_mps: f32,
    },
    /// Touchdown recognised by an acceleration spike near the ground
    Impact {
        /// Altitude at impact (m)
        altitude_m: f32,
        /// Vertical acceleration at impact (g)
        accel_g: f32,
    },
    /// Touchdown recognised by a stable altitude
    Landing {
        /// Altitude at detection (m)
        altitude_m: f32,
        /// Velocity at detection (m/s)
        velocity_mps: f32,
    },
}

impl Detection {
    /// State the flight enters on this detection
    pub fn next_state(&self) -> FlightState {
        match self {
            Self::Apogee { .. } => FlightState::Descent,
            Self::Impact { .. } | Self::Landing { .. } => FlightState::Landed,
        }
    }

    /// Event recorded for this detection
    pub fn event_kind(&self) -> EventKind {
        match self {
            Self::Apogee { .. } => EventKind::ApogeeDetected,
            Self::Impact { .. } => EventKind::ImpactDetected,
            Self::Landing { .. } => EventKind::LandingDetected,
        }
    }

    /// Feedback pattern for this detection
    pub fn alert(&self) -> AlertPattern {
        match self {
            Self::Apogee { .. } => AlertPattern::Apogee,
            Self::Impact { .. } | Self::Landing { .. } => AlertPattern::Landing,
        }
    }
}

/// Rolling altitude analysis with hysteresis
#[derive(Debug, Clone, Default)]
pub struct EventDetector {
    history: AltitudeHistory,
    last_altitude: Option<f32>,
    peak_altitude: Option<f32>,
    velocity_mps: f32,
    descent_confidence: u8,
    landing_confidence: u8,
    descent_detected: bool,
}

impl EventDetector {
    /// Detector with empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one altitude sample taken while in `state`
    ///
    /// `vertical_accel_g` is `None` when the inertial sensor gave no reading.
    pub fn update(
        &mut self,
        state: FlightState,
        altitude_m: f32,
        vertical_accel_g: Option<f32>,
    ) -> Option<Detection> {
        let Some(previous) = self.last_altitude.replace(altitude_m) else {
            self.peak_altitude = Some(altitude_m);
            return None;
        };

        self.history.push(altitude_m);
        self.peak_altitude = Some(self.peak_altitude.map_or(altitude_m, |p| p.max(altitude_m)));
        self.velocity_mps = (altitude_m - previous) / ASSUMED_TICK_S;

        match state {
            FlightState::Ascent if !self.descent_detected => self.check_apogee(vertical_accel_g),
            FlightState::Descent => self.check_landing(altitude_m, vertical_accel_g),
            _ => None,
        }
    }

    fn check_apogee(&mut self, vertical_accel_g: Option<f32>) -> Option<Detection> {
        if self.history.len() < TREND_WINDOW {
            return None;
        }

        let mut window = [0.0f32; TREND_WINDOW];
        for (slot, &alt) in window.iter_mut().zip(self.history.recent(TREND_WINDOW)) {
            *slot = alt;
        }
        let decreasing = window.windows(2).filter(|step| step[1] < step[0]).count();

        if decreasing >= DESCENT_STEPS_REQUIRED {
            self.descent_confidence = (self.descent_confidence + 1).min(CONFIDENCE_CEILING);
        } else {
            self.descent_confidence = self.descent_confidence.saturating_sub(1);
        }

        let falling = self.velocity_mps < DESCENT_VELOCITY_MPS
            && self.descent_confidence >= DESCENT_CONFIDENCE_REQUIRED;
        let freefall = vertical_accel_g.is_some_and(|az| az < FREEFALL_ACCEL_G);
        if !(falling || freefall) {
            return None;
        }

        self.descent_detected = true;
        let max_altitude_m = self.peak_altitude.unwrap_or_default();
        log_debug!(
            "apogee: peak {} m, velocity {} m/s, confidence {}",
            max_altitude_m,
            self.velocity_mps,
            self.descent_confidence
        );
        Some(Detection::Apogee { max_altitude_m, velocity_mps: self.velocity_mps })
    }

    fn check_landing(&mut self, altitude_m: f32, vertical_accel_g: Option<f32>) -> Option<Detection> {
        if altitude_m < IMPACT_ALTITUDE_M {
            if let Some(accel_g) = vertical_accel_g {
                if libm::fabsf(accel_g) > IMPACT_ACCEL_G {
                    return Some(Detection::Impact { altitude_m, accel_g });
                }
            }
        }

        let variance = self.window_variance();
        if variance < LANDING_VARIANCE_MAX && self.velocity_mps > LANDING_VELOCITY_MIN_MPS {
            self.landing_confidence = (self.landing_confidence + 1).min(CONFIDENCE_CEILING);
        } else {
            self.landing_confidence = self.landing_confidence.saturating_sub(1);
        }

        if self.landing_confidence >= LANDING_CONFIDENCE_REQUIRED {
            return Some(Detection::Landing { altitude_m, velocity_mps: self.velocity_mps });
        }
        None
    }

    /// Population variance of the newest [`TREND_WINDOW`] samples
    ///
    /// Zero until the window is full.
    fn window_variance(&self) -> f32 {
        if self.history.len() < TREND_WINDOW {
            return 0.0;
        }
        let n = TREND_WINDOW as f32;
        let mean = self.history.recent(TREND_WINDOW).sum::<f32>() / n;
        self.history
            .recent(TREND_WINDOW)
            .map(|x| (x - mean) * (x - mean))
            .sum::<f32>()
            / n
    }

    /// Most recent altitude fed in
    pub fn last_altitude(&self) -> Option<f32> {
        self.last_altitude
    }

    /// Highest altitude fed in
    pub fn peak_altitude(&self) -> Option<f32> {
        self.peak_altitude
    }

    /// Velocity derived from the last two samples (m/s)
    pub fn velocity_mps(&self) -> f32 {
        self.velocity_mps
    }

    /// Current descent confidence
    pub fn descent_confidence(&self) -> u8 {
        self.descent_confidence
    }

    /// Current landing confidence
    pub fn landing_confidence(&self) -> u8 {
        self.landing_confidence
    }

    /// Whether apogee has already been declared
    pub fn descent_detected(&self) -> bool {
        self.descent_detected
    }

    /// Altitude window, oldest first
    pub fn history(&self) -> &AltitudeHistory {
        &self.history
    }
}
