//! Error-state layout, sensor noise and bias model

use contracts::ImuConfig;
use nalgebra::{SMatrix, Vector3};

/// Error-state dimension: position, velocity, attitude, accel bias, gyro bias
pub const STATE_DIM: usize = 15;

/// Noise dimension: acc/gyr white noise at both step ends plus two random walks
pub const NOISE_DIM: usize = 18;

/// 15x15 error-state matrix (Jacobian, covariance)
pub type Matrix15 = SMatrix<f64, STATE_DIM, STATE_DIM>;

/// 15x18 noise gain
pub type NoiseGain = SMatrix<f64, STATE_DIM, NOISE_DIM>;

/// 18x18 noise covariance
pub type NoiseCovariance = SMatrix<f64, NOISE_DIM, NOISE_DIM>;

/// Row/column offset of each 3-dim block in the error state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateBlock {
    Position,
    Velocity,
    Attitude,
    AccBias,
    GyrBias,
}

impl StateBlock {
    pub const fn offset(self) -> usize {
        match self {
            Self::Position => 0,
            Self::Velocity => 3,
            Self::Attitude => 6,
            Self::AccBias => 9,
            Self::GyrBias => 12,
        }
    }
}

/// Column offset of each 3-dim block in the noise vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NoiseBlock {
    Acc0,
    Gyr0,
    Acc1,
    Gyr1,
    AccWalk,
    GyrWalk,
}

impl NoiseBlock {
    pub(crate) const fn offset(self) -> usize {
        match self {
            Self::Acc0 => 0,
            Self::Gyr0 => 3,
            Self::Acc1 => 6,
            Self::Gyr1 => 9,
            Self::AccWalk => 12,
            Self::GyrWalk => 15,
        }
    }
}

/// IMU noise densities (1-sigma)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuNoise {
    pub acc_n: f64,
    pub gyr_n: f64,
    pub acc_w: f64,
    pub gyr_w: f64,
}

impl Default for ImuNoise {
    fn default() -> Self {
        Self {
            acc_n: 1e-4,
            gyr_n: 1e-4,
            acc_w: 1e-8,
            gyr_w: 1e-8,
        }
    }
}

impl ImuNoise {
    pub fn from_config(config: &ImuConfig) -> Self {
        Self {
            acc_n: config.acc_noise,
            gyr_n: config.gyr_noise,
            acc_w: config.acc_walk,
            gyr_w: config.gyr_walk,
        }
    }

    /// Diagonal noise covariance in [`NoiseBlock`] order
    pub fn covariance(&self) -> NoiseCovariance {
        let mut q = NoiseCovariance::zeros();
        let blocks = [
            (NoiseBlock::Acc0, self.acc_n),
            (NoiseBlock::Gyr0, self.gyr_n),
            (NoiseBlock::Acc1, self.acc_n),
            (NoiseBlock::Gyr1, self.gyr_n),
            (NoiseBlock::AccWalk, self.acc_w),
            (NoiseBlock::GyrWalk, self.gyr_w),
        ];
        for (block, sigma) in blocks {
            let o = block.offset();
            for i in o..o + 3 {
                q[(i, i)] = sigma * sigma;
            }
        }
        q
    }
}

/// Accelerometer and gyroscope bias
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuBias {
    pub acc: Vector3<f64>,
    pub gyr: Vector3<f64>,
}

impl ImuBias {
    pub fn zero() -> Self {
        Self {
            acc: Vector3::zeros(),
            gyr: Vector3::zeros(),
        }
    }

    pub fn new(acc: Vector3<f64>, gyr: Vector3<f64>) -> Self {
        Self { acc, gyr }
    }

    pub fn from_config(config: &ImuConfig) -> Self {
        Self {
            acc: config.init_acc_bias.into(),
            gyr: config.init_gyr_bias.into(),
        }
    }
}

impl Default for ImuBias {
    fn default() -> Self {
        Self::zero()
    }
}
