//! 通道容量、满载策略与接入计数

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use contracts::StreamKind;

/// 事件通道已满时的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DropPolicy {
    /// 阻塞回调线程直到消费端腾出空间；回放与离线处理不丢数据
    #[default]
    Block,
    /// 丢弃当前事件并计数
    DropNewest,
}

#[derive(Debug, Clone)]
pub struct BackpressureConfig {
    pub channel_capacity: usize,
    pub drop_policy: DropPolicy,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self::new(1024, DropPolicy::Block)
    }
}

impl BackpressureConfig {
    pub fn new(channel_capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            channel_capacity,
            drop_policy,
        }
    }
}

/// 由各数据源回调线程并发更新
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    imu: AtomicU64,
    scan_side: AtomicU64,
    dropped: AtomicU64,
    depth: AtomicUsize,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 惯性样本单独计数，其余三路合并为 scan 侧
    pub fn record_received(&self, kind: StreamKind) {
        let counter = if kind == StreamKind::Imu {
            &self.imu
        } else {
            &self.scan_side
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_queue_len(&self, len: usize) {
        self.depth.store(len, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            imu_received: self.imu.load(Ordering::Relaxed),
            scan_events_received: self.scan_side.load(Ordering::Relaxed),
            events_dropped: self.dropped.load(Ordering::Relaxed),
            queue_len: self.depth.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub imu_received: u64,
    /// scan + scan info + outlier
    pub scan_events_received: u64,
    pub events_dropped: u64,
    pub queue_len: usize,
}

impl MetricsSnapshot {
    pub fn total_received(&self) -> u64 {
        self.imu_received + self.scan_events_received
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_received_split_by_stream() {
        let metrics = IngestionMetrics::new();
        for kind in [StreamKind::Imu, StreamKind::Imu, StreamKind::Outlier, StreamKind::ScanInfo] {
            metrics.record_received(kind);
        }
        metrics.record_dropped();
        metrics.update_queue_len(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.imu_received, 2);
        assert_eq!(snapshot.scan_events_received, 2);
        assert_eq!(snapshot.total_received(), 4);
        assert_eq!(snapshot.events_dropped, 1);
        assert_eq!(snapshot.queue_len, 3);
    }
}
