//! Pose fan-out.
//!
//! The estimator side pushes [`OdometryFrame`]s into one channel; the
//! dispatcher converts each frame to the published convention once and hands
//! a copy to every sink queue.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{ContractError, OdometryFrame, PublishConfig, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::frame::PublishTransform;
use crate::handle::SinkHandle;
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::sinks::{FileSink, LogSink};

/// Fan-out task state
pub struct Dispatcher {
    sinks: Vec<SinkHandle>,
    publish: PublishTransform,
    poses: mpsc::Receiver<OdometryFrame>,
}

impl Dispatcher {
    /// Open every configured sink; fails on the first sink that cannot be opened
    #[instrument(
        name = "dispatcher_from_config",
        skip_all,
        fields(sink_count = sinks.len(), frame = ?publish.frame)
    )]
    pub fn from_config(
        sinks: &[SinkConfig],
        publish: &PublishConfig,
        poses: mpsc::Receiver<OdometryFrame>,
    ) -> Result<Self, DispatcherError> {
        let sinks = sinks
            .iter()
            .map(open_sink)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::with_handles(
            sinks,
            PublishTransform::from_config(publish),
            poses,
        ))
    }

    /// Assemble from already running sink workers
    pub fn with_handles(
        sinks: Vec<SinkHandle>,
        publish: PublishTransform,
        poses: mpsc::Receiver<OdometryFrame>,
    ) -> Self {
        Self {
            sinks,
            publish,
            poses,
        }
    }

    /// Point-in-time counters per sink
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.sinks
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Shared metrics handles, still readable after the dispatcher has shut down
    pub fn sink_metrics(&self) -> Vec<(String, Arc<SinkMetrics>)> {
        self.sinks
            .iter()
            .map(|h| (h.name().to_string(), Arc::clone(h.metrics())))
            .collect()
    }

    /// Forward poses until the input channel closes, then drain every sink
    #[instrument(name = "dispatcher_run", skip(self), fields(sinks = self.sinks.len()))]
    pub async fn run(mut self) {
        info!("dispatcher started");
        let mut forwarded: u64 = 0;

        while let Some(frame) = self.poses.recv().await {
            let frame = self.publish.prepare(frame);
            for sink in &self.sinks {
                sink.try_send(frame.clone());
            }

            forwarded += 1;
            if forwarded.is_multiple_of(100) {
                debug!(forwarded, scan_index = frame.scan_index, "dispatcher progress");
            }
        }

        info!(forwarded, "pose channel closed, draining sinks");
        for sink in self.sinks {
            let name = sink.name().to_string();
            let metrics = Arc::clone(sink.metrics());
            sink.shutdown().await;
            info!(sink = %name, summary = %metrics.snapshot(), "sink closed");
        }
    }

    /// Run on a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

fn open_sink(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    let creation_failed = |e: ContractError| DispatcherError::sink_creation(&config.name, e);

    let handle = match config.sink_type {
        SinkType::Log => SinkHandle::spawn(
            LogSink::from_params(&config.name, &config.params).map_err(creation_failed)?,
            config.queue_capacity,
        ),
        SinkType::File => SinkHandle::spawn(
            FileSink::from_params(&config.name, &config.params).map_err(creation_failed)?,
            config.queue_capacity,
        ),
    };
    debug!(sink = %config.name, sink_type = ?config.sink_type, "sink opened");
    Ok(handle)
}

/// Open the configured sinks and wire them to `poses`
pub fn create_dispatcher(
    sinks: Vec<SinkConfig>,
    publish: PublishConfig,
    poses: mpsc::Receiver<OdometryFrame>,
) -> Result<Dispatcher, DispatcherError> {
    Dispatcher::from_config(&sinks, &publish, poses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pose;
    use contracts::FrameConventionKind;
    use std::collections::HashMap;

    fn file_sink(name: &str, path: &std::path::Path) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            sink_type: SinkType::File,
            queue_capacity: 50,
            params: HashMap::from([("path".to_string(), path.display().to_string())]),
        }
    }

    #[tokio::test]
    async fn test_every_sink_sees_every_pose() {
        let (tx, rx) = mpsc::channel(10);
        let handles = vec![
            SinkHandle::spawn(LogSink::new("first"), 10),
            SinkHandle::spawn(LogSink::new("second"), 10),
        ];
        let dispatcher = Dispatcher::with_handles(handles, PublishTransform::default(), rx);
        let metrics = dispatcher.sink_metrics();
        let task = dispatcher.spawn();

        for i in 0..5 {
            tx.send(pose(i)).await.unwrap();
        }
        drop(tx);
        task.await.unwrap();

        for (name, m) in &metrics {
            assert_eq!(m.write_count(), 5, "sink {name}");
            assert_eq!(m.last_scan_index(), Some(4));
        }
    }

    #[tokio::test]
    async fn test_file_output_uses_published_convention() {
        let dir = tempfile::tempdir().unwrap();
        let xyz_path = dir.path().join("xyz.txt");
        let yzx_path = dir.path().join("yzx.txt");

        for (path, frame) in [
            (&xyz_path, FrameConventionKind::Xyz),
            (&yzx_path, FrameConventionKind::Yzx),
        ] {
            let (tx, rx) = mpsc::channel(10);
            let publish = PublishConfig {
                frame,
                attach_features: false,
            };
            let dispatcher =
                create_dispatcher(vec![file_sink("trajectory", path)], publish, rx).unwrap();
            let task = dispatcher.spawn();
            // pose(2) sits 2 m along x
            tx.send(pose(2)).await.unwrap();
            drop(tx);
            task.await.unwrap();
        }

        let position = |path: &std::path::Path| -> Vec<f64> {
            std::fs::read_to_string(path)
                .unwrap()
                .split_whitespace()
                .skip(1)
                .take(3)
                .map(|f| f.parse().unwrap())
                .collect()
        };
        assert_eq!(position(&xyz_path), vec![2.0, 0.0, 0.0]);
        assert_eq!(position(&yzx_path), vec![0.0, 0.0, 2.0]);
    }

    #[tokio::test]
    async fn test_mixed_sinks_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let (_tx, rx) = mpsc::channel(1);
        let configs = vec![
            SinkConfig {
                name: "console".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 50,
                params: HashMap::from([("every".to_string(), "10".to_string())]),
            },
            file_sink("trajectory", &dir.path().join("traj.txt")),
        ];

        let dispatcher = create_dispatcher(configs, PublishConfig::default(), rx).unwrap();
        let names: Vec<String> = dispatcher.metrics().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["console", "trajectory"]);
    }

    #[tokio::test]
    async fn test_file_sink_without_path_fails_creation() {
        let (_tx, rx) = mpsc::channel(1);
        let configs = vec![SinkConfig {
            name: "broken".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 1,
            params: HashMap::new(),
        }];
        let result = create_dispatcher(configs, PublishConfig::default(), rx);
        assert!(matches!(
            result,
            Err(DispatcherError::SinkCreation { ref name, .. }) if name == "broken"
        ));
    }
}
