//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Sensor timestamps (seconds, f64) are the only clock
//! - The estimator cursor advances only through consumed samples and scans, never wall-clock time
//!
//! ## Frame Model
//! - Everything in this crate is expressed in the estimator frame (x forward, y left, z up)
//! - Conversion to the published convention happens in the dispatcher

mod config;
mod error;
mod event;
mod odometry;
mod sensor;
mod sensor_source;
mod sink;

pub use config::*;
pub use error::*;
pub use event::*;
pub use odometry::*;
pub use sensor::*;
pub use sensor_source::{SensorEventCallback, SensorSource};
pub use sink::*;
