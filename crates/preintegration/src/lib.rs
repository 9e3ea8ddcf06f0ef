//! # Preintegration
//!
//! IMU preintegration between two reference times.
//!
//! Responsibilities:
//! - Midpoint integration of rotation / velocity / position deltas
//! - 15-state error transition (Jacobian) and covariance propagation
//! - Bias rebasing and re-propagation from recorded samples
//!
//! Pure numerics: no I/O, no clocks, no shared state.
//!
//! # Example
//!
//! ```
//! use nalgebra::Vector3;
//! use preintegration::{ImuBias, ImuNoise, PreintegratedDelta};
//!
//! let gravity = Vector3::new(0.0, 0.0, 9.8);
//! let mut delta = PreintegratedDelta::new(gravity, Vector3::zeros(), ImuBias::zero(), ImuNoise::default());
//! for _ in 0..100 {
//!     delta.integrate(0.01, gravity, Vector3::zeros());
//! }
//! assert!((delta.delta_v().z - 9.8).abs() < 1e-9);
//! ```

mod delta;
mod midpoint;
mod model;

pub use delta::PreintegratedDelta;
pub use midpoint::Motion;
pub use model::{
    ImuBias, ImuNoise, Matrix15, NoiseCovariance, NoiseGain, StateBlock, NOISE_DIM, STATE_DIM,
};
