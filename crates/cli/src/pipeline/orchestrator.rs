//! Pipeline orchestrator - coordinates all components.
//!
//! One source feeds the ingestion channel; a single consumer owns the
//! [`SyncEngine`] and forwards odometry frames to the dispatcher.

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_channel::Receiver;
use contracts::{FusionConfig, OdometryFrame, SensorEvent, SensorSource, Vector3};
use ingestion::{
    BackpressureConfig, ImuAligner, IngestionPipeline, MockScenario, MockScenarioConfig,
    ReplaySource,
};
use sync_engine::{NotReady, SyncEngine, SyncEngineConfig, SyncReport};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{RunStats, StopReason};
use crate::error::{CliError, Result};

/// Where sensor events come from
#[derive(Debug, Clone)]
pub enum InputSource {
    /// JSON Lines recording
    Replay(PathBuf),
    /// Synthetic stationary scenario of the given length (seconds)
    Simulate(f64),
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Loaded and validated configuration
    pub fusion: FusionConfig,

    /// Event source
    pub input: InputSource,

    /// Playback rate (0 = as fast as possible)
    pub rate: f64,

    /// Maximum number of frames to publish (None = unlimited)
    pub max_frames: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Ingestion channel settings
    pub backpressure: BackpressureConfig,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the input ends, a limit is hit or `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<RunStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let fusion = &self.config.fusion;

        if let Some(port) = fusion.observability.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Setup Ingestion Pipeline
        let aligner = ImuAligner::from_config(&fusion.imu);
        if !aligner.is_identity() {
            info!(
                roll_deg = fusion.imu.misalign_roll_deg,
                pitch_deg = fusion.imu.misalign_pitch_deg,
                yaw_deg = fusion.imu.misalign_yaw_deg,
                "IMU misalignment correction enabled"
            );
        }
        let mut ingestion =
            IngestionPipeline::with_config(self.config.backpressure.clone()).with_aligner(aligner);

        let source = self.build_source()?;
        let source_name = source.name().to_string();
        ingestion.register_source(source_name.clone(), source, None)?;
        info!(source = %source_name, "Ingestion pipeline configured");

        // Setup Dispatcher
        let (frame_tx, frame_rx) =
            mpsc::channel::<OdometryFrame>(self.config.backpressure.channel_capacity);
        if fusion.sinks.is_empty() {
            warn!("No sinks configured - odometry frames will be dropped");
        }
        let dispatcher =
            dispatcher::create_dispatcher(fusion.sinks.clone(), fusion.publish.clone(), frame_rx)?;
        let sink_metrics = dispatcher.sink_metrics();
        let dispatcher_handle = dispatcher.spawn();
        info!(active_sinks = sink_metrics.len(), "Dispatcher started");

        // Setup Sync Engine
        let mut engine = SyncEngine::new(SyncEngineConfig::from_fusion_config(fusion));

        ingestion.start_all();
        let events = ingestion
            .take_receiver()
            .ok_or_else(|| CliError::pipeline_execution("ingestion receiver already taken"))?;

        info!(max_frames = ?self.config.max_frames, "Pipeline running");

        let mut stats = RunStats {
            active_sources: ingestion.source_count(),
            active_sinks: sink_metrics.len(),
            ..Default::default()
        };
        stats.stop_reason = self
            .consume(&events, &mut engine, &frame_tx, &mut stats, shutdown)
            .await;

        // Shutdown
        info!(reason = %stats.stop_reason, "Shutting down pipeline...");
        ingestion.stop_all();
        drop(frame_tx);

        match tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Dispatcher task failed"),
            Err(_) => warn!("Dispatcher did not flush within 5s"),
        }

        stats.finish(
            &engine,
            ingestion.metrics().snapshot(),
            sink_metrics
                .iter()
                .map(|(name, metrics)| (name.clone(), metrics.snapshot()))
                .collect(),
            start_time.elapsed(),
        );

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            frames = stats.frames_published,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }

    fn build_source(&self) -> Result<Box<dyn SensorSource>> {
        match &self.config.input {
            InputSource::Replay(path) => {
                let source = ReplaySource::open(path)?.with_rate(self.config.rate);
                info!(
                    path = %path.display(),
                    events = source.len(),
                    duration_s = source.duration(),
                    "Running in REPLAY mode"
                );
                Ok(Box::new(source))
            }
            InputSource::Simulate(duration_s) => {
                if !duration_s.is_finite() || *duration_s <= 0.0 {
                    return Err(CliError::pipeline_execution(format!(
                        "simulation length must be positive, got {duration_s}"
                    )));
                }
                let gravity = self.config.fusion.imu.gravity;
                let scenario = MockScenario::new(MockScenarioConfig {
                    duration_s: *duration_s,
                    specific_force: Vector3::new(0.0, 0.0, gravity),
                    rate: self.config.rate,
                    ..Default::default()
                });
                info!(duration_s, "Running in SIMULATION mode");
                Ok(Box::new(scenario))
            }
        }
    }

    /// Single consumer: buffer events, run the scheduler, forward frames
    async fn consume<F>(
        &self,
        events: &Receiver<SensorEvent>,
        engine: &mut SyncEngine,
        frame_tx: &mpsc::Sender<OdometryFrame>,
        stats: &mut RunStats,
        shutdown: F,
    ) -> StopReason
    where
        F: Future<Output = ()>,
    {
        let timeout = self.config.timeout;
        let deadline = async move {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(deadline);

        loop {
            let event = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping pipeline...");
                    return StopReason::Shutdown;
                }
                _ = &mut deadline => {
                    warn!(timeout_secs = ?timeout.map(|t| t.as_secs()), "Pipeline timed out");
                    return StopReason::Timeout;
                }
                received = events.recv() => match received {
                    Ok(event) => event,
                    Err(_) => return StopReason::EndOfStream,
                },
            };

            stats.events_received += 1;
            observability::record_event_received(event.kind());

            let started = Instant::now();
            let report = engine.push(event);
            if let Some(reason) = self.forward(report, started, frame_tx, stats).await {
                return reason;
            }
        }
    }

    async fn forward(
        &self,
        report: SyncReport,
        started: Instant,
        frame_tx: &mpsc::Sender<OdometryFrame>,
        stats: &mut RunStats,
    ) -> Option<StopReason> {
        let SyncReport {
            frames,
            imu_steps,
            stall,
        } = report;

        if let Some(stall) = stall.filter(NotReady::is_stall) {
            stats.fusion.update_stall(stall.reason());
        }
        if frames.is_empty() {
            return None;
        }

        let per_frame_ms = started.elapsed().as_secs_f64() * 1000.0 / frames.len() as f64;
        for (i, frame) in frames.into_iter().enumerate() {
            // a pass integrates once; its steps go to the first frame
            let steps = if i == 0 { imu_steps } else { 0 };
            stats.fusion.update_scan(&frame, per_frame_ms, steps);

            debug!(
                scan_index = frame.scan_index,
                t = format!("{:.3}", frame.timestamp),
                x = frame.position.x,
                y = frame.position.y,
                z = frame.position.z,
                "Odometry frame produced"
            );

            if frame_tx.send(frame).await.is_err() {
                warn!("Dispatcher channel closed");
                return Some(StopReason::DispatcherClosed);
            }
            stats.frames_published += 1;

            if let Some(max) = self.config.max_frames {
                if stats.frames_published >= max {
                    info!(frames = stats.frames_published, "Reached max frames limit");
                    return Some(StopReason::MaxFrames);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SinkConfig, SinkType};
    use ingestion::{write_recording, DropPolicy};
    use std::collections::HashMap;
    use std::fs;

    fn file_sink(path: &std::path::Path) -> SinkConfig {
        SinkConfig {
            name: "trajectory".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 256,
            params: HashMap::from([("path".to_string(), path.display().to_string())]),
        }
    }

    fn pipeline(fusion: FusionConfig, input: InputSource, max_frames: Option<u64>) -> Pipeline {
        Pipeline::new(PipelineConfig {
            fusion,
            input,
            rate: 0.0,
            max_frames,
            timeout: None,
            backpressure: BackpressureConfig::new(64, DropPolicy::Block),
        })
    }

    #[tokio::test]
    async fn test_simulation_publishes_every_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traj.txt");
        let mut fusion = FusionConfig::default();
        fusion.sinks.push(file_sink(&path));

        let stats = pipeline(fusion, InputSource::Simulate(1.0), None)
            .run(std::future::pending())
            .await
            .unwrap();

        // scans at 0.0, 0.1, ..., 1.0
        assert_eq!(stats.stop_reason, StopReason::EndOfStream);
        assert_eq!(stats.frames_published, 11);
        assert_eq!(stats.sync.scans_consumed, 11);
        assert_eq!(stats.ingestion.imu_received, 101);
        assert_eq!(stats.sinks[0].1.write_count, 11);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 11);
    }

    #[tokio::test]
    async fn test_max_frames_stops_early() {
        let fusion = FusionConfig::default();

        let stats = pipeline(fusion, InputSource::Simulate(2.0), Some(3))
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, StopReason::MaxFrames);
        assert_eq!(stats.frames_published, 3);
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_pipeline() {
        let fusion = FusionConfig::default();

        let stats = pipeline(fusion, InputSource::Simulate(1.0), None)
            .run(std::future::ready(()))
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, StopReason::Shutdown);
    }

    #[tokio::test]
    async fn test_replay_recording() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("session.jsonl");
        let events = MockScenario::stationary(0.5).events();
        write_recording(fs::File::create(&recording).unwrap(), &events).unwrap();

        let stats = pipeline(
            FusionConfig::default(),
            InputSource::Replay(recording),
            None,
        )
        .run(std::future::pending())
        .await
        .unwrap();

        assert_eq!(stats.events_received, events.len() as u64);
        assert_eq!(stats.frames_published, 6);
        assert_eq!(stats.pending_scans, 0);
    }

    #[tokio::test]
    async fn test_missing_recording_is_an_error() {
        let result = pipeline(
            FusionConfig::default(),
            InputSource::Replay(PathBuf::from("/nonexistent/session.jsonl")),
            None,
        )
        .run(std::future::pending())
        .await;

        assert!(matches!(result, Err(CliError::Contract(_))));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_simulation() {
        let result = pipeline(FusionConfig::default(), InputSource::Simulate(0.0), None)
            .run(std::future::pending())
            .await;

        assert!(matches!(result, Err(CliError::PipelineExecution { .. })));
    }
}
