//! Pipeline orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{InputSource, Pipeline, PipelineConfig};
pub use stats::{RunStats, StopReason};
