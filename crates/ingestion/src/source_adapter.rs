//! 通用数据源适配器
//!
//! 基于 `SensorSource` trait 的统一适配器实现。
//! 负责安装误差校正、计数以及按背压策略写入通道。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::{Sender, TrySendError};
use contracts::{SensorEvent, SensorEventCallback, SensorPayload, SensorSource};
use tracing::{debug, trace, warn};

use crate::align::ImuAligner;
use crate::config::{BackpressureConfig, DropPolicy, IngestionMetrics};

/// 通用数据源适配器
///
/// 将 `SensorSource` 回调桥接到共享事件通道。
pub struct SourceAdapter {
    source_name: String,
    source: Box<dyn SensorSource>,
    config: BackpressureConfig,
    aligner: ImuAligner,
    listening: Arc<AtomicBool>,
}

impl SourceAdapter {
    /// 创建新的适配器
    pub fn new(
        source_name: String,
        source: Box<dyn SensorSource>,
        config: BackpressureConfig,
        aligner: ImuAligner,
    ) -> Self {
        Self {
            source_name,
            source,
            config,
            aligner,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn start(&self, tx: Sender<SensorEvent>, metrics: Arc<IngestionMetrics>) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_name = self.source_name.clone();
        let drop_policy = self.config.drop_policy;
        let aligner = self.aligner;
        let listening = self.listening.clone();

        debug!(source = %source_name, "starting source adapter");

        let callback: SensorEventCallback = Arc::new(move |event| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            metrics.record_received(event.kind());
            let event = align_event(&aligner, event);
            trace!(source = %source_name, stream = %event.kind(), "adapter received event");
            send_event(&tx, event, &metrics, &source_name, drop_policy);
        });

        self.source.listen(callback);
    }

    pub fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(source = %self.source_name, "stopping source adapter");
            self.source.stop();
        }
    }

    /// Adapter 与底层数据源都在运行
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed) && self.source.is_listening()
    }
}

#[inline]
fn align_event(aligner: &ImuAligner, event: SensorEvent) -> SensorEvent {
    match event.payload {
        SensorPayload::Imu(sample) => SensorEvent {
            timestamp: event.timestamp,
            payload: SensorPayload::Imu(aligner.align(sample)),
        },
        _ => event,
    }
}

/// Send event, handling backpressure policy
#[inline]
fn send_event(
    tx: &Sender<SensorEvent>,
    event: SensorEvent,
    metrics: &IngestionMetrics,
    source_name: &str,
    drop_policy: DropPolicy,
) {
    let result = match drop_policy {
        DropPolicy::Block => tx
            .send_blocking(event)
            .map_err(|e| TrySendError::Closed(e.into_inner())),
        DropPolicy::DropNewest => tx.try_send(event),
    };

    match result {
        Ok(()) => {
            metrics.update_queue_len(tx.len());
        }
        Err(TrySendError::Full(event)) => {
            metrics.record_dropped();
            metrics::counter!(
                "lins_fusion_ingestion_dropped_total",
                "stream" => event.kind().as_str()
            )
            .increment(1);
            trace!(source = %source_name, "event dropped (newest)");
        }
        Err(TrySendError::Closed(_)) => {
            warn!(source = %source_name, "event channel closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_channel::bounded;
    use contracts::{InertialSample, Vector3};
    use std::time::Duration;

    /// Emits a fixed number of inertial samples from its own thread
    struct BurstSource {
        count: usize,
        listening: Arc<AtomicBool>,
    }

    impl BurstSource {
        fn new(count: usize) -> Self {
            Self {
                count,
                listening: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl SensorSource for BurstSource {
        fn name(&self) -> &str {
            "burst"
        }

        fn listen(&self, callback: SensorEventCallback) {
            if self.listening.swap(true, Ordering::SeqCst) {
                return;
            }
            let count = self.count;
            let listening = self.listening.clone();
            std::thread::spawn(move || {
                for i in 0..count {
                    let sample = InertialSample::new(
                        i as f64 * 0.01,
                        Vector3::new(1.0, 0.0, 9.8),
                        Vector3::ZERO,
                    );
                    callback(SensorEvent::imu(sample));
                }
                listening.store(false, Ordering::SeqCst);
            });
        }

        fn stop(&self) {
            self.listening.store(false, Ordering::SeqCst);
        }

        fn is_listening(&self) -> bool {
            self.listening.load(Ordering::Relaxed)
        }
    }

    fn adapter(count: usize, policy: DropPolicy, aligner: ImuAligner) -> SourceAdapter {
        SourceAdapter::new(
            "burst".to_string(),
            Box::new(BurstSource::new(count)),
            BackpressureConfig::new(4, policy),
            aligner,
        )
    }

    #[test]
    fn test_drop_newest_when_full() {
        let (tx, rx) = bounded(4);
        let metrics = Arc::new(IngestionMetrics::new());
        let adapter = adapter(10, DropPolicy::DropNewest, ImuAligner::identity());

        adapter.start(tx, metrics.clone());
        std::thread::sleep(Duration::from_millis(100));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.imu_received, 10);
        assert_eq!(snapshot.events_dropped, 6);
        assert_eq!(rx.len(), 4);
    }

    #[test]
    fn test_block_is_lossless_and_aligned() {
        let (tx, rx) = bounded(4);
        let metrics = Arc::new(IngestionMetrics::new());
        let aligner = ImuAligner::from_euler(0.0, 0.0, std::f64::consts::PI);
        let adapter = adapter(10, DropPolicy::Block, aligner);

        adapter.start(tx, metrics.clone());

        let mut received = Vec::new();
        while received.len() < 10 {
            let event = rx.recv_blocking().expect("producer closed early");
            received.push(event);
        }

        assert_eq!(metrics.snapshot().events_dropped, 0);
        let timestamps: Vec<f64> = received.iter().map(|e| e.timestamp).collect();
        assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
        match &received[0].payload {
            SensorPayload::Imu(sample) => assert!((sample.acc.x + 1.0).abs() < 1e-12),
            other => panic!("expected imu payload, got {other:?}"),
        }
    }
}
