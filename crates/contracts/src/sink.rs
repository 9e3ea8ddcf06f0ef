//! 位姿输出端接口

use crate::{ContractError, OdometryFrame};

/// A consumer of published poses.
///
/// Frames arrive already converted into the published frame convention,
/// one call per processed scan, in scan order. Each sink runs on its own
/// worker task, so a slow `write` only delays that sink.
#[trait_variant::make(DataSink: Send)]
pub trait LocalDataSink {
    /// Label used in logs and per-sink metrics
    fn name(&self) -> &str;

    async fn write(&mut self, frame: &OdometryFrame) -> Result<(), ContractError>;

    /// Called periodically and once before `close`
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Called exactly once after the last frame
    async fn close(&mut self) -> Result<(), ContractError>;
}
