//! Recursive estimation
//!
//! A per-axis scalar Kalman filter for smoothing three-axis sensor vectors.
//! The flight loop only routes acceleration through it when
//! [`crate::config::EstimatorConfig::enabled`] is set.

pub mod kalman;

pub use kalman::{KalmanFilter3D, KalmanParams, ScalarKalman};
