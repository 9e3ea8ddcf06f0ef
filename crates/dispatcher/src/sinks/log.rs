//! 以 tracing 事件输出位姿摘要

use std::collections::HashMap;

use contracts::{ContractError, DataSink, OdometryFrame};
use tracing::{info, instrument};

/// Emits one `info` event every `every` poses
pub struct LogSink {
    name: String,
    every: u64,
    seen: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            every: 1,
            seen: 0,
        }
    }

    /// 0 behaves like 1
    pub fn with_every(mut self, every: u64) -> Self {
        self.every = every.max(1);
        self
    }

    /// `params.every` is optional
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let every = params
            .get("every")
            .map(|raw| raw.parse::<u64>())
            .transpose()
            .map_err(|e| {
                ContractError::config_validation(format!("sinks[{name}].params.every"), e.to_string())
            })?
            .unwrap_or(1);
        Ok(Self::new(name).with_every(every))
    }

    fn should_log(&self) -> bool {
        self.seen % self.every == 0
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, frame),
        fields(sink = %self.name, scan_index = frame.scan_index)
    )]
    async fn write(&mut self, frame: &OdometryFrame) -> Result<(), ContractError> {
        if self.should_log() {
            let (p, v) = (&frame.position, &frame.velocity);
            info!(
                t = frame.timestamp,
                x = p.x,
                y = p.y,
                z = p.z,
                speed = (v.x * v.x + v.y * v.y + v.z * v.z).sqrt(),
                features = frame.features.is_some(),
                "pose"
            );
        }
        self.seen += 1;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, poses = self.seen, "log sink closed");
        Ok(())
    }
}
