//! Sync engine configuration

use contracts::{BufferCapacities, FusionConfig, SideChannelPairing};
use estimator::EstimatorConfig;

/// Sync engine configuration
#[derive(Debug, Clone)]
pub struct SyncEngineConfig {
    /// Per-stream buffer capacities
    pub buffers: BufferCapacities,
    /// Side-channel pairing policy
    pub pairing: SideChannelPairing,
    /// Skew tolerated by [`SideChannelPairing::Checked`] (seconds)
    pub max_skew_s: f64,
    /// Estimator parameters
    pub estimator: EstimatorConfig,
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self::from_fusion_config(&FusionConfig::default())
    }
}

impl SyncEngineConfig {
    pub fn from_fusion_config(config: &FusionConfig) -> Self {
        Self {
            buffers: config.buffers.clone(),
            pairing: config.sync.pairing,
            max_skew_s: config.sync.max_skew_s,
            estimator: EstimatorConfig::from_imu_config(&config.imu),
        }
    }
}
