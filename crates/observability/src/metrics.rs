//! Fusion 指标收集模块
//!
//! 记录扫描处理、缓冲区状态与停顿原因，并在内存中聚合摘要。

use std::collections::HashMap;

use contracts::{OdometryFrame, StreamKind};
use metrics::{counter, gauge, histogram};

/// 记录一次扫描消费
///
/// 每产生一个 OdometryFrame 调用一次。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_scan_consumed;
///
/// for frame in report.frames {
///     record_scan_consumed(&frame, elapsed_ms, imu_steps);
/// }
/// ```
pub fn record_scan_consumed(frame: &OdometryFrame, processing_ms: f64, imu_steps: usize) {
    counter!("lins_fusion_scans_total").increment(1);
    gauge!("lins_fusion_last_scan_index").set(frame.scan_index as f64);
    gauge!("lins_fusion_last_scan_time").set(frame.timestamp);
    histogram!("lins_fusion_scan_processing_ms").record(processing_ms);
    histogram!("lins_fusion_imu_steps_per_scan").record(imu_steps as f64);

    let speed = (frame.velocity.x.powi(2) + frame.velocity.y.powi(2) + frame.velocity.z.powi(2))
        .sqrt();
    gauge!("lins_fusion_speed_mps").set(speed);
}

/// 记录输入事件
pub fn record_event_received(kind: StreamKind) {
    counter!(
        "lins_fusion_events_received_total",
        "stream" => kind.as_str()
    )
    .increment(1);
}

/// 记录调度停顿 (数据不足)
pub fn record_stall(reason: &'static str) {
    counter!("lins_fusion_stalls_total", "reason" => reason).increment(1);
}

/// 记录缓冲区深度
pub fn record_buffer_depth(kind: StreamKind, depth: usize) {
    gauge!(
        "lins_fusion_buffer_depth",
        "stream" => kind.as_str()
    )
    .set(depth as f64);
}

/// 记录缓冲区丢弃 (容量满时丢弃最旧数据 / 乱序拒收)
pub fn record_buffer_drop(kind: StreamKind, reason: &'static str) {
    counter!(
        "lins_fusion_buffer_dropped_total",
        "stream" => kind.as_str(),
        "reason" => reason
    )
    .increment(1);
}

/// 记录 OdometryFrame 分发
pub fn record_frame_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "lins_fusion_frames_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Fusion 指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct FusionMetricsAggregator {
    /// 消费的扫描总数
    pub total_scans: u64,

    /// 积分的 IMU 步数
    pub total_imu_steps: u64,

    /// 停顿总数
    pub total_stalls: u64,

    /// 各原因停顿次数
    pub stall_counts: HashMap<String, u64>,

    /// 丢弃总数
    pub total_dropped: u64,

    /// 乱序拒收总数
    pub total_out_of_order: u64,

    /// 扫描处理耗时 (ms)
    pub processing_stats: RunningStats,

    /// 扫描间隔 (s)
    pub interval_stats: RunningStats,

    /// 轨迹长度 (m)
    pub path_length: f64,

    last_frame: Option<(f64, [f64; 3])>,
}

impl FusionMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一帧
    pub fn update_scan(&mut self, frame: &OdometryFrame, processing_ms: f64, imu_steps: usize) {
        self.total_scans += 1;
        self.total_imu_steps += imu_steps as u64;
        self.processing_stats.push(processing_ms);

        let position = [frame.position.x, frame.position.y, frame.position.z];
        if let Some((last_time, last_position)) = self.last_frame {
            self.interval_stats.push(frame.timestamp - last_time);
            self.path_length += position
                .iter()
                .zip(last_position.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt();
        }
        self.last_frame = Some((frame.timestamp, position));
    }

    /// 记录一次停顿
    pub fn update_stall(&mut self, reason: &str) {
        self.total_stalls += 1;
        *self.stall_counts.entry(reason.to_string()).or_insert(0) += 1;
    }

    /// 以缓冲区累计值覆盖丢弃计数
    pub fn set_drop_totals(&mut self, dropped: u64, out_of_order: u64) {
        self.total_dropped = dropped;
        self.total_out_of_order = out_of_order;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_scans: self.total_scans,
            total_imu_steps: self.total_imu_steps,
            total_stalls: self.total_stalls,
            total_dropped: self.total_dropped,
            total_out_of_order: self.total_out_of_order,
            path_length: self.path_length,
            processing_ms: StatsSummary::from(&self.processing_stats),
            scan_interval_s: StatsSummary::from(&self.interval_stats),
            stall_counts: self.stall_counts.clone(),
        }
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_scans: u64,
    pub total_imu_steps: u64,
    pub total_stalls: u64,
    pub total_dropped: u64,
    pub total_out_of_order: u64,
    pub path_length: f64,
    pub processing_ms: StatsSummary,
    pub scan_interval_s: StatsSummary,
    pub stall_counts: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Fusion Metrics Summary ===")?;
        writeln!(f, "Scans consumed: {}", self.total_scans)?;
        writeln!(f, "IMU steps: {}", self.total_imu_steps)?;
        writeln!(f, "Stalls: {}", self.total_stalls)?;
        writeln!(
            f,
            "Dropped samples: {} (out-of-order: {})",
            self.total_dropped, self.total_out_of_order
        )?;
        writeln!(f, "Path length: {:.3} m", self.path_length)?;
        writeln!(f, "Scan processing (ms): {}", self.processing_ms)?;
        writeln!(f, "Scan interval (s): {}", self.scan_interval_s)?;

        if !self.stall_counts.is_empty() {
            writeln!(f, "Stall reasons:")?;
            for (reason, count) in &self.stall_counts {
                writeln!(f, "  {}: {}", reason, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
