//! Ingestion Pipeline main entry

use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::{SensorEvent, SensorSource};
use tracing::{debug, info, instrument, warn};

use crate::align::ImuAligner;
use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::error::{IngestionError, Result};
use crate::source_adapter::SourceAdapter;

/// Ingestion Pipeline
///
/// Funnels every registered source into one bounded channel. The channel
/// closes once the pipeline has been started and every source has finished,
/// so the consumer sees end-of-stream as a closed receiver.
pub struct IngestionPipeline {
    /// Registered adapters
    adapters: HashMap<String, SourceAdapter>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    /// Sender handed to adapters; released by `start_all`
    tx: Option<Sender<SensorEvent>>,

    /// Data receiver
    rx: Option<Receiver<SensorEvent>>,

    /// Rotation applied to every inertial sample
    aligner: ImuAligner,

    /// Default backpressure configuration
    default_config: BackpressureConfig,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    ///
    /// # Arguments
    /// * `channel_capacity` - Channel capacity
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_config(BackpressureConfig {
            channel_capacity,
            ..Default::default()
        })
    }

    /// Create with custom backpressure configuration
    pub fn with_config(config: BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));

        Self {
            adapters: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx: Some(tx),
            rx: Some(rx),
            aligner: ImuAligner::identity(),
            default_config: config,
        }
    }

    /// Rotate inertial samples of sources registered from now on
    pub fn with_aligner(mut self, aligner: ImuAligner) -> Self {
        self.aligner = aligner;
        self
    }

    /// Register a sensor event source
    ///
    /// # Arguments
    /// * `name` - Source name, unique within the pipeline
    /// * `source` - Data source implementing `SensorSource` trait
    /// * `config` - Optional backpressure configuration
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source, config),
        fields(source = %name)
    )]
    pub fn register_source(
        &mut self,
        name: String,
        source: Box<dyn SensorSource>,
        config: Option<BackpressureConfig>,
    ) -> Result<()> {
        if self.adapters.contains_key(&name) {
            return Err(IngestionError::DuplicateSource { source_name: name });
        }
        let adapter = SourceAdapter::new(
            name.clone(),
            source,
            config.unwrap_or_else(|| self.default_config.clone()),
            self.aligner,
        );
        debug!(source = %name, "registered sensor source");
        self.adapters.insert(name, adapter);
        Ok(())
    }

    /// Start all registered sources
    ///
    /// The pipeline's own sender is released here; sources registered later
    /// cannot be started.
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&mut self) {
        let Some(tx) = self.tx.take() else {
            warn!("ingestion pipeline already started");
            return;
        };
        info!(count = self.adapters.len(), "starting all sensor sources");
        for adapter in self.adapters.values() {
            if !adapter.is_listening() {
                debug!(source = %adapter.source_name(), "starting source");
                adapter.start(tx.clone(), self.metrics.clone());
            }
        }
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.adapters.len(), "stopping all sensor sources");
        for adapter in self.adapters.values() {
            adapter.stop();
        }
    }

    /// Get event stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<SensorEvent>> {
        self.rx.take()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Get registered source count
    pub fn source_count(&self) -> usize {
        self.adapters.len()
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
