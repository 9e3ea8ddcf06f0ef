//! OdometryFrame - Sync Engine output
//!
//! Pose estimate produced on every consumed scan.

use serde::{Deserialize, Serialize};

use crate::{PointCloudData, Quaternion, Vector3};

/// Estimated pose at a scan time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdometryFrame {
    /// Scan timestamp (seconds)
    pub timestamp: f64,

    /// Number of scans consumed before this one (0 = bootstrap scan)
    pub scan_index: u64,

    /// Body-to-world rotation
    pub orientation: Quaternion,

    /// Body position in world frame (m)
    pub position: Vector3,

    /// Body velocity in world frame (m/s)
    pub velocity: Vector3,

    /// Accelerometer bias estimate
    pub acc_bias: Vector3,

    /// Gyroscope bias estimate
    pub gyr_bias: Vector3,

    /// Feature subsets of the consumed scan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureClouds>,
}

/// Point subsets attached to a published pose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureClouds {
    pub scan: PointCloudData,
    pub outlier: PointCloudData,
}
