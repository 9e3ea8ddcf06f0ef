//! 合成场景数据源
//!
//! 用于无真实传感器/录制文件时的测试与演示。
//! 车体以恒定比力与角速度运动，按 IMU 频率与扫描频率产生事件。

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{
    InertialSample, PointCloudData, PointXYZI, ScanInfo, SensorEvent, SensorEventCallback,
    SensorSource, Vector3,
};
use rand::Rng;
use tracing::{debug, trace};

/// 合成场景配置
#[derive(Debug, Clone)]
pub struct MockScenarioConfig {
    /// 数据源名称
    pub name: String,

    /// IMU 频率 (Hz)
    pub imu_hz: f64,

    /// 扫描频率 (Hz)
    pub scan_hz: f64,

    /// 场景时长 (秒)
    pub duration_s: f64,

    /// 体坐标系比力 (含重力反作用, m/s²)
    pub specific_force: Vector3,

    /// 体坐标系角速度 (rad/s)
    pub angular_rate: Vector3,

    /// 每帧扫描点数
    pub points_per_scan: u32,

    /// 叠加在 IMU 量测上的均匀噪声幅值 (0 = 无噪声)
    pub noise_amplitude: f64,

    /// 回放速率 (1.0 = 实时, 0 = 尽快)
    pub rate: f64,
}

impl Default for MockScenarioConfig {
    fn default() -> Self {
        Self {
            name: "mock_scenario".to_string(),
            imu_hz: 100.0,
            scan_hz: 10.0,
            duration_s: 10.0,
            specific_force: Vector3::new(0.0, 0.0, 9.81),
            angular_rate: Vector3::ZERO,
            points_per_scan: 64,
            noise_amplitude: 0.0,
            rate: 0.0,
        }
    }
}

/// 合成场景数据源
pub struct MockScenario {
    config: MockScenarioConfig,
    running: Arc<AtomicBool>,
}

impl MockScenario {
    pub fn new(config: MockScenarioConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 静止场景
    pub fn stationary(duration_s: f64) -> Self {
        Self::new(MockScenarioConfig {
            duration_s,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &MockScenarioConfig {
        &self.config
    }

    /// 生成完整事件序列 (按时间排序，同一时刻扫描组先于 IMU)
    pub fn events(&self) -> Vec<SensorEvent> {
        generate(&self.config)
    }
}

fn generate(config: &MockScenarioConfig) -> Vec<SensorEvent> {
    let mut events = Vec::new();
    if config.imu_hz <= 0.0 || config.duration_s < 0.0 {
        return events;
    }

    let imu_count = (config.duration_s * config.imu_hz).round() as u64;
    // 扫描时刻对齐到最近的 IMU 时刻
    let imu_per_scan = if config.scan_hz > 0.0 {
        ((config.imu_hz / config.scan_hz).round() as u64).max(1)
    } else {
        u64::MAX
    };

    let mut rng = rand::rng();
    for k in 0..=imu_count {
        let t = k as f64 / config.imu_hz;

        if k % imu_per_scan == 0 {
            let ring_phase = (k / imu_per_scan) as f32 * 0.01;
            let (scan, info) = synthetic_scan(config.points_per_scan, ring_phase);
            events.push(SensorEvent::scan(t, scan));
            events.push(SensorEvent::scan_info(t, info));
            events.push(SensorEvent::outlier(t, PointCloudData::empty()));
        }

        let mut jitter = || {
            if config.noise_amplitude > 0.0 {
                rng.random_range(-config.noise_amplitude..config.noise_amplitude)
            } else {
                0.0
            }
        };
        let acc = Vector3::new(
            config.specific_force.x + jitter(),
            config.specific_force.y + jitter(),
            config.specific_force.z + jitter(),
        );
        let gyr = Vector3::new(
            config.angular_rate.x + jitter(),
            config.angular_rate.y + jitter(),
            config.angular_rate.z + jitter(),
        );
        events.push(SensorEvent::imu(InertialSample::new(t, acc, gyr)));
    }
    events
}

/// 单线束圆环扫描
fn synthetic_scan(num_points: u32, phase: f32) -> (PointCloudData, ScanInfo) {
    let radius = 10.0f32;
    let points: Vec<PointXYZI> = (0..num_points)
        .map(|i| {
            let angle = phase + TAU * i as f32 / num_points.max(1) as f32;
            PointXYZI::new(radius * angle.cos(), radius * angle.sin(), 0.0, i as f32)
        })
        .collect();

    let n = points.len();
    let info = ScanInfo {
        start_ring_index: vec![0],
        end_ring_index: vec![n as i32 - 1],
        start_orientation: phase,
        end_orientation: phase + TAU,
        orientation_diff: TAU,
        ground_flag: vec![false; n],
        column_index: (0..n as u32).collect(),
        range: vec![radius; n],
    };
    (PointCloudData::from_points(&points), info)
}

impl SensorSource for MockScenario {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn listen(&self, callback: SensorEventCallback) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let config = self.config.clone();
        let running = self.running.clone();

        std::thread::spawn(move || {
            let events = generate(&config);
            debug!(
                source = %config.name,
                events = events.len(),
                duration_s = config.duration_s,
                "mock scenario started"
            );

            let mut previous: Option<f64> = None;
            for event in events {
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                if let (true, Some(prev)) = (config.rate > 0.0, previous) {
                    let gap = (event.timestamp - prev) / config.rate;
                    if gap > 0.0 {
                        std::thread::sleep(Duration::from_secs_f64(gap));
                    }
                }
                previous = Some(event.timestamp);
                trace!(source = %config.name, stream = %event.kind(), timestamp = event.timestamp, "mock event");
                callback(event);
            }

            running.store(false, Ordering::SeqCst);
            debug!(source = %config.name, "mock scenario finished");
        });
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}
