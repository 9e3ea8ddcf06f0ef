//! # Dispatcher
//!
//! 位姿分发模块。
//!
//! 负责：
//! - 消费 `OdometryFrame`
//! - 转换到发布坐标约定 (xyz / yzx)，按配置附带特征点云
//! - Fan-out 到多个 sinks
//! - 隔离慢 sink，不阻塞估计链路

pub mod dispatcher;
pub mod error;
pub mod frame;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{DataSink, OdometryFrame};
pub use dispatcher::{create_dispatcher, Dispatcher};
pub use error::DispatcherError;
pub use frame::{FrameConvention, PublishTransform};
pub use handle::{SinkHandle, DEFAULT_FLUSH_INTERVAL};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, FileSinkConfig, LogSink};
