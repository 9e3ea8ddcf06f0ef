//! # Ingestion Pipeline
//!
//! Sensor event ingestion module.
//!
//! Responsibilities:
//! - Register sensor event sources (recording replay, synthetic scenario)
//! - Rotate inertial samples from the IMU frame into the vehicle frame
//! - Backpressure management and drop policy
//! - Funnel every source into one async-channel consumed by a single task
//!
//! ## Usage Example
//!
//! ```no_run
//! use ingestion::{ImuAligner, IngestionPipeline, ReplaySource};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pipeline = IngestionPipeline::new(1024)
//!     .with_aligner(ImuAligner::from_euler(0.0, 0.0, 0.01));
//! let replay = ReplaySource::open(Path::new("drive.jsonl"))?;
//! pipeline.register_source("drive".into(), Box::new(replay), None)?;
//!
//! let rx = pipeline.take_receiver().unwrap();
//! pipeline.start_all();
//! while let Ok(event) = rx.recv().await {
//!     println!("{} at {:.3}", event.kind(), event.timestamp);
//! }
//! # Ok(())
//! # }
//! ```

mod align;
mod config;
mod error;
mod mock;
mod pipeline;
mod replay;
mod source_adapter;

// Re-exports
pub use align::ImuAligner;
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use error::{IngestionError, Result};
pub use mock::{MockScenario, MockScenarioConfig};
pub use pipeline::IngestionPipeline;
pub use replay::{read_recording, write_recording, RecordedEvent, ReplaySource};
pub use source_adapter::SourceAdapter;
