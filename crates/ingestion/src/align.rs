//! IMU 安装误差校正
//!
//! IMU 与车体坐标系之间存在固定的安装角 (roll / pitch / yaw)。
//! 入缓冲前将每个惯性样本旋转到车体系。

use contracts::{ImuConfig, InertialSample};
use nalgebra::{Rotation3, Vector3};

/// IMU 到车体系的旋转
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuAligner {
    /// `R = Rz(yaw) * Ry(pitch) * Rx(roll)`
    rotation: Rotation3<f64>,
}

impl Default for ImuAligner {
    fn default() -> Self {
        Self::identity()
    }
}

impl ImuAligner {
    pub fn identity() -> Self {
        Self {
            rotation: Rotation3::identity(),
        }
    }

    /// 由安装角构造 (弧度)
    pub fn from_euler(roll: f64, pitch: f64, yaw: f64) -> Self {
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), roll);
        let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), pitch);
        let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), yaw);
        Self {
            rotation: rz * ry * rx,
        }
    }

    /// 由配置构造 (配置单位为度)
    pub fn from_config(config: &ImuConfig) -> Self {
        Self::from_euler(
            config.misalign_roll_deg.to_radians(),
            config.misalign_pitch_deg.to_radians(),
            config.misalign_yaw_deg.to_radians(),
        )
    }

    pub fn is_identity(&self) -> bool {
        self.rotation == Rotation3::identity()
    }

    pub fn rotation(&self) -> &Rotation3<f64> {
        &self.rotation
    }

    /// `acc' = Rᵀ·acc`, `gyr' = Rᵀ·gyr`
    #[inline]
    pub fn align(&self, sample: InertialSample) -> InertialSample {
        if self.is_identity() {
            return sample;
        }
        let inverse = self.rotation.inverse();
        InertialSample {
            timestamp: sample.timestamp,
            acc: (inverse * Vector3::<f64>::from(sample.acc)).into(),
            gyr: (inverse * Vector3::<f64>::from(sample.gyr)).into(),
        }
    }
}
