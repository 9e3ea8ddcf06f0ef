//! FusionConfig - Config Loader output
//!
//! Complete configuration for the fusion pipeline. Every section has defaults,
//! so an empty document is a valid configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::Vector3;

/// Configuration version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct FusionConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Inertial sensor model
    #[serde(default)]
    #[validate(nested)]
    pub imu: ImuConfig,

    /// Per-stream buffer capacities
    #[serde(default)]
    #[validate(nested)]
    pub buffers: BufferCapacities,

    /// Scheduler settings
    #[serde(default)]
    #[validate(nested)]
    pub sync: SyncSettings,

    /// Publish boundary settings
    #[serde(default)]
    pub publish: PublishConfig,

    /// Output sinks
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,

    /// Logging / metrics settings
    #[serde(default)]
    pub observability: ObservabilitySettings,
}

/// Inertial sensor model
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ImuConfig {
    /// IMU-to-vehicle misalignment, roll (degrees)
    #[serde(default)]
    #[validate(range(min = -180.0, max = 180.0))]
    pub misalign_roll_deg: f64,

    /// IMU-to-vehicle misalignment, pitch (degrees)
    #[serde(default)]
    #[validate(range(min = -180.0, max = 180.0))]
    pub misalign_pitch_deg: f64,

    /// IMU-to-vehicle misalignment, yaw (degrees)
    #[serde(default)]
    #[validate(range(min = -180.0, max = 180.0))]
    pub misalign_yaw_deg: f64,

    /// Initial accelerometer bias (m/s²)
    #[serde(default)]
    pub init_acc_bias: Vector3,

    /// Initial gyroscope bias (rad/s)
    #[serde(default)]
    pub init_gyr_bias: Vector3,

    /// Accelerometer measurement noise (standard deviation)
    #[serde(default = "default_meas_noise")]
    #[validate(range(exclusive_min = 0.0))]
    pub acc_noise: f64,

    /// Gyroscope measurement noise (standard deviation)
    #[serde(default = "default_meas_noise")]
    #[validate(range(exclusive_min = 0.0))]
    pub gyr_noise: f64,

    /// Accelerometer bias random walk (standard deviation)
    #[serde(default = "default_walk_noise")]
    #[validate(range(exclusive_min = 0.0))]
    pub acc_walk: f64,

    /// Gyroscope bias random walk (standard deviation)
    #[serde(default = "default_walk_noise")]
    #[validate(range(exclusive_min = 0.0))]
    pub gyr_walk: f64,

    /// Local gravity magnitude (m/s²)
    #[serde(default = "default_gravity")]
    #[validate(range(min = 9.7, max = 9.9))]
    pub gravity: f64,
}

fn default_meas_noise() -> f64 {
    1e-4
}

fn default_walk_noise() -> f64 {
    1e-8
}

fn default_gravity() -> f64 {
    9.81
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            misalign_roll_deg: 0.0,
            misalign_pitch_deg: 0.0,
            misalign_yaw_deg: 0.0,
            init_acc_bias: Vector3::ZERO,
            init_gyr_bias: Vector3::ZERO,
            acc_noise: default_meas_noise(),
            gyr_noise: default_meas_noise(),
            acc_walk: default_walk_noise(),
            gyr_walk: default_walk_noise(),
            gravity: default_gravity(),
        }
    }
}

/// Per-stream buffer capacities
///
/// When a buffer is full the oldest entry is dropped.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BufferCapacities {
    #[serde(default = "default_imu_capacity")]
    #[validate(range(min = 2))]
    pub imu: usize,

    #[serde(default = "default_scan_capacity")]
    #[validate(range(min = 1))]
    pub scan: usize,

    #[serde(default = "default_scan_capacity")]
    #[validate(range(min = 1))]
    pub scan_info: usize,

    #[serde(default = "default_scan_capacity")]
    #[validate(range(min = 1))]
    pub outlier: usize,
}

fn default_imu_capacity() -> usize {
    500
}

fn default_scan_capacity() -> usize {
    3
}

impl Default for BufferCapacities {
    fn default() -> Self {
        Self {
            imu: default_imu_capacity(),
            scan: default_scan_capacity(),
            scan_info: default_scan_capacity(),
            outlier: default_scan_capacity(),
        }
    }
}

/// Scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SyncSettings {
    /// How side-channel payloads are matched to a scan
    #[serde(default)]
    pub pairing: SideChannelPairing,

    /// Maximum tolerated skew for [`SideChannelPairing::Checked`] (seconds)
    #[serde(default = "default_max_skew")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub max_skew_s: f64,
}

fn default_max_skew() -> f64 {
    0.005
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            pairing: SideChannelPairing::default(),
            max_skew_s: default_max_skew(),
        }
    }
}

/// Side-channel pairing policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideChannelPairing {
    /// Pair by the same upper-bound query against the cursor
    #[default]
    Positional,
    /// Positional, but log and count pairs whose timestamps differ by more than `max_skew_s`
    Checked,
}

/// Publish boundary settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Axis convention expected downstream
    #[serde(default)]
    pub frame: FrameConventionKind,

    /// Attach scan / outlier clouds to every published frame
    #[serde(default)]
    pub attach_features: bool,
}

/// Axis convention of published frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameConventionKind {
    /// Same as the estimator (x forward, y left, z up)
    Xyz,
    /// Camera-style (z forward, x left, y up)
    #[default]
    Yzx,
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// Trajectory file output
    File,
}

/// Logging / metrics settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    /// Default log level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus port (None = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_port: None,
        }
    }
}
