//! Scalar Kalman Filters
//!
//! ## Overview
//!
//! Each axis is an independent one-state filter with a constant-value model.
//! There is no cross-axis coupling, so a three-axis filter is three scalar
//! filters sharing one parameter set.
//!
//! ```text
//! predicted_error = error + Q
//! gain            = predicted_error / (predicted_error + R)
//! state           = state + gain · (z − state)
//! error           = (1 − gain) · predicted_error
//! ```
//!
//! With a constant measurement the error converges to the positive root of
//! `e² + Q·e − Q·R = 0` and the state converges geometrically to `z`.
//!
//! ## Usage Example
//!
//! ```rust
//! use cansat_core::fusion::{KalmanFilter3D, KalmanParams};
//!
//! let mut filter = KalmanFilter3D::new(KalmanParams::default());
//! let smoothed = filter.update([0.02, -0.01, 1.03]);
//! assert!(smoothed[2] > 0.0);
//! ```

/// Shared filter parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanParams {
    /// Q, added to the error each step
    pub process_variance: f32,
    /// R, noise of each measurement
    pub measurement_variance: f32,
    /// Error variance after construction or reset
    pub initial_error_variance: f32,
}

impl Default for KalmanParams {
    fn default() -> Self {
        Self {
            process_variance: 0.01,
            measurement_variance: 0.1,
            initial_error_variance: 1.0,
        }
    }
}

/// One-state Kalman filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarKalman {
    params: KalmanParams,
    state: f32,
    error: f32,
}

impl ScalarKalman {
    /// Filter at state 0 with the initial error variance
    pub fn new(params: KalmanParams) -> Self {
        Self {
            params,
            state: 0.0,
            error: params.initial_error_variance,
        }
    }

    /// Fold in one measurement and return the new estimate
    pub fn update(&mut self, measurement: f32) -> f32 {
        let predicted_error = self.error + self.params.process_variance;
        let gain = predicted_error / (predicted_error + self.params.measurement_variance);
        self.state += gain * (measurement - self.state);
        self.error = (1.0 - gain) * predicted_error;
        self.state
    }

    /// Zero the state and restore the initial error
    pub fn reset(&mut self) {
        self.state = 0.0;
        self.error = self.params.initial_error_variance;
    }

    /// Current estimate
    pub fn state(&self) -> f32 {
        self.state
    }

    /// Current error variance
    pub fn error(&self) -> f32 {
        self.error
    }
}

/// Three independent scalar filters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanFilter3D {
    axes: [ScalarKalman; 3],
}

impl KalmanFilter3D {
    /// Three filters sharing `params`
    pub fn new(params: KalmanParams) -> Self {
        Self {
            axes: [ScalarKalman::new(params); 3],
        }
    }

    /// Update every axis with its component of `measurement`
    pub fn update(&mut self, measurement: [f32; 3]) -> [f32; 3] {
        [
            self.axes[0].update(measurement[0]),
            self.axes[1].update(measurement[1]),
            self.axes[2].update(measurement[2]),
        ]
    }

    /// Reset every axis
    pub fn reset(&mut self) {
        for axis in &mut self.axes {
            axis.reset();
        }
    }

    /// Current estimate per axis
    pub fn state(&self) -> [f32; 3] {
        [self.axes[0].state(), self.axes[1].state(), self.axes[2].state()]
    }

    /// Current error variance per axis
    pub fn error(&self) -> [f32; 3] {
        [self.axes[0].error(), self.axes[1].error(), self.axes[2].error()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_update_matches_hand_computation() {
        let mut filter = ScalarKalman::new(KalmanParams::default());
        let estimate = filter.update(10.0);

        // predicted 1.01, gain 1.01 / 1.11
        let gain = 1.01 / 1.11;
        assert!((estimate - 10.0 * gain).abs() < 1e-5);
        assert!((filter.error() - (1.0 - gain) * 1.01).abs() < 1e-6);
    }

    #[test]
    fn axes_are_independent() {
        let mut filter = KalmanFilter3D::new(KalmanParams::default());
        for _ in 0..50 {
            filter.update([1.0, -2.0, 0.0]);
        }
        let state = filter.state();
        assert!((state[0] - 1.0).abs() < 0.01);
        assert!((state[1] + 2.0).abs() < 0.01);
        assert!(state[2].abs() < 1e-6);
    }

    #[test]
    fn reset_restores_initial_error() {
        let params = KalmanParams { initial_error_variance: 4.0, ..KalmanParams::default() };
        let mut filter = KalmanFilter3D::new(params);
        filter.update([3.0, 3.0, 3.0]);
        filter.reset();

        assert_eq!(filter.state(), [0.0; 3]);
        assert_eq!(filter.error(), [4.0; 3]);
    }

    proptest! {
        #[test]
        fn constant_measurement_converges(
            measurement in -100.0f32..100.0,
            q in 0.001f32..0.1,
            r in 0.01f32..1.0,
        ) {
            let params = KalmanParams {
                process_variance: q,
                measurement_variance: r,
                initial_error_variance: 1.0,
            };
            let mut filter = ScalarKalman::new(params);
            let mut last_error = filter.error();
            let mut last_distance = libm::fabsf(measurement - filter.state());

            for _ in 0..200 {
                filter.update(measurement);
                let distance = libm::fabsf(measurement - filter.state());
                prop_assert!(filter.error() <= last_error + 1e-7);
                prop_assert!(distance <= last_distance + 1e-4);
                last_error = filter.error();
                last_distance = distance;
            }
            prop_assert!(last_distance <= 1e-2 * (1.0 + libm::fabsf(measurement)));
        }
    }
}
