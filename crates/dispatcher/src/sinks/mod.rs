//! 位姿输出端：`log` 周期性打印，`file` 写 TUM 轨迹（可选 PLY 点云）。

mod file;
mod log;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
