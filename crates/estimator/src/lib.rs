//! # Estimator
//!
//! Filter state orchestration between the scheduler and the correction step.
//!
//! Responsibilities:
//! - Own the nominal state, the cursor and the live preintegration
//! - `process_imu`: fold one inertial step, advance the cursor
//! - `process_pcl`: bootstrap or predict + correct, then restart preintegration
//! - Count consumed scans and time their processing
//!
//! The lidar residual mathematics plug in through [`MeasurementUpdate`].

mod estimator;
mod state;
mod update;

pub use estimator::{EstimatorConfig, StateEstimator};
pub use state::NavState;
pub use update::{InertialOnly, MeasurementUpdate};
