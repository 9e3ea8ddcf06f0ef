//! Per-sink queue and worker task.
//!
//! Each sink owns a bounded queue. The dispatcher never waits on a sink:
//! when the queue is full the pose is dropped for that sink only.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, instrument, warn};

use contracts::{DataSink, OdometryFrame};

use crate::metrics::SinkMetrics;

/// Trajectory files are flushed at least this often while poses keep arriving
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Front end of a running sink worker
pub struct SinkHandle {
    name: String,
    queue: mpsc::Sender<OdometryFrame>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker with the default flush interval
    pub fn spawn<S: DataSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        Self::spawn_with_flush(sink, queue_capacity, DEFAULT_FLUSH_INTERVAL)
    }

    /// Spawn the worker; `flush_every` bounds how stale on-disk output can get
    pub fn spawn_with_flush<S: DataSink + Send + 'static>(
        sink: S,
        queue_capacity: usize,
        flush_every: Duration,
    ) -> Self {
        let name = sink.name().to_string();
        let (queue, poses) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker = tokio::spawn(run_worker(
            sink,
            poses,
            Arc::clone(&metrics),
            name.clone(),
            flush_every,
        ));

        Self {
            name,
            queue,
            metrics,
            worker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Enqueue one pose without waiting; `false` means it was not accepted
    pub fn try_send(&self, frame: OdometryFrame) -> bool {
        let scan_index = frame.scan_index;
        match self.queue.try_send(frame) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.queue.max_capacity() - self.queue.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.inc_dropped_count();
                observability::record_frame_dispatched(&self.name, false);
                warn!(sink = %self.name, scan_index, "sink queue full, pose dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, scan_index, "sink worker is gone");
                false
            }
        }
    }

    /// Close the queue and wait until the worker has flushed and closed its sink
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        let Self {
            name,
            queue,
            worker,
            ..
        } = self;
        drop(queue);
        if let Err(e) = worker.await {
            error!(sink = %name, error = ?e, "sink worker panicked");
        }
        debug!(sink = %name, "sink stopped");
    }
}

#[instrument(name = "sink_worker", skip_all, fields(sink = %name))]
async fn run_worker<S: DataSink>(
    mut sink: S,
    mut poses: mpsc::Receiver<OdometryFrame>,
    metrics: Arc<SinkMetrics>,
    name: String,
    flush_every: Duration,
) {
    let mut flush_tick = interval(flush_every);
    flush_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    flush_tick.tick().await;
    let mut unflushed = false;

    loop {
        tokio::select! {
            received = poses.recv() => {
                let Some(frame) = received else { break };
                metrics.set_queue_len(poses.len());
                match sink.write(&frame).await {
                    Ok(()) => {
                        metrics.record_written(frame.scan_index);
                        observability::record_frame_dispatched(&name, true);
                        unflushed = true;
                    }
                    Err(e) => {
                        metrics.inc_failure_count();
                        observability::record_frame_dispatched(&name, false);
                        error!(scan_index = frame.scan_index, error = %e, "sink write failed");
                    }
                }
            }
            _ = flush_tick.tick(), if unflushed => {
                if let Err(e) = sink.flush().await {
                    warn!(error = %e, "periodic flush failed");
                }
                unflushed = false;
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(error = %e, "final flush failed");
    }
    if let Err(e) = sink.close().await {
        error!(error = %e, "close failed");
    }
}
