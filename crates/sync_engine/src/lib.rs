//! # Sync Engine
//!
//! 惯性与激光雷达数据流的同步调度。
//!
//! 负责：
//! - 四路有界时间戳缓冲（IMU / scan / scan info / outlier）
//! - 以 IMU 到达为触发的拉取式调度
//! - 扫描对齐的惯性积分（跨越扫描边界的样本截断并复用）
//! - 驱动 [`StateEstimator`] 并输出 [`OdometryFrame`](contracts::OdometryFrame)
//!
//! ## 使用示例
//!
//! ```
//! use contracts::{InertialSample, PointCloudData, ScanInfo, SensorEvent, Vector3};
//! use sync_engine::{SyncEngine, SyncEngineConfig};
//!
//! let mut engine = SyncEngine::new(SyncEngineConfig::default());
//!
//! engine.push(SensorEvent::scan(0.0, PointCloudData::empty()));
//! engine.push(SensorEvent::scan_info(0.0, ScanInfo::default()));
//! engine.push(SensorEvent::outlier(0.0, PointCloudData::empty()));
//!
//! let gravity = Vector3::new(0.0, 0.0, 9.81);
//! let report = engine.push(SensorEvent::imu(InertialSample::new(0.0, gravity, Vector3::ZERO)));
//! assert_eq!(report.frames.len(), 1);
//! assert!(engine.is_initialized());
//! ```

mod buffer;
mod config;
mod engine;

pub use buffer::{Insertion, TimedBuffer, TimedEntry};
pub use config::SyncEngineConfig;
pub use engine::{NotReady, SyncEngine, SyncReport, SyncState, SyncStats};

// Re-export estimator types
pub use estimator::{EstimatorConfig, InertialOnly, MeasurementUpdate, NavState, StateEstimator};
