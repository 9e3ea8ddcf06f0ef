//! JSON-lines 录制回放
//!
//! 每行一个事件，点云以点列表 `[x, y, z, intensity]` 存储：
//!
//! ```text
//! {"kind":"imu","t":0.01,"acc":[0.0,0.0,9.8],"gyr":[0.0,0.0,0.0]}
//! {"kind":"scan","t":0.1,"points":[[1.0,0.0,0.0,5.0]]}
//! {"kind":"scan_info","t":0.1,"info":{"start_orientation":0.0}}
//! {"kind":"outlier","t":0.1,"points":[]}
//! ```
//!
//! 空行与 `#` 开头的行被忽略。

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{
    ContractError, InertialSample, PointCloudData, PointXYZI, ScanInfo, SensorEvent,
    SensorEventCallback, SensorPayload, SensorSource, Vector3,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// 录制文件中的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordedEvent {
    Imu {
        t: f64,
        acc: [f64; 3],
        gyr: [f64; 3],
    },
    Scan {
        t: f64,
        points: Vec<[f32; 4]>,
    },
    ScanInfo {
        t: f64,
        #[serde(default)]
        info: ScanInfo,
    },
    Outlier {
        t: f64,
        points: Vec<[f32; 4]>,
    },
}

impl RecordedEvent {
    pub fn timestamp(&self) -> f64 {
        match self {
            Self::Imu { t, .. }
            | Self::Scan { t, .. }
            | Self::ScanInfo { t, .. }
            | Self::Outlier { t, .. } => *t,
        }
    }

    pub fn into_event(self) -> SensorEvent {
        match self {
            Self::Imu { t, acc, gyr } => SensorEvent::imu(InertialSample::new(
                t,
                Vector3::new(acc[0], acc[1], acc[2]),
                Vector3::new(gyr[0], gyr[1], gyr[2]),
            )),
            Self::Scan { t, points } => SensorEvent::scan(t, cloud_from_list(&points)),
            Self::ScanInfo { t, info } => SensorEvent::scan_info(t, info),
            Self::Outlier { t, points } => SensorEvent::outlier(t, cloud_from_list(&points)),
        }
    }

    /// # Errors
    /// 点云数据无法解码
    pub fn from_event(event: &SensorEvent) -> Result<Self, ContractError> {
        let t = event.timestamp;
        Ok(match &event.payload {
            SensorPayload::Imu(sample) => Self::Imu {
                t,
                acc: [sample.acc.x, sample.acc.y, sample.acc.z],
                gyr: [sample.gyr.x, sample.gyr.y, sample.gyr.z],
            },
            SensorPayload::Scan(cloud) => Self::Scan {
                t,
                points: cloud_to_list(cloud)?,
            },
            SensorPayload::ScanInfo(info) => Self::ScanInfo {
                t,
                info: info.clone(),
            },
            SensorPayload::Outlier(cloud) => Self::Outlier {
                t,
                points: cloud_to_list(cloud)?,
            },
        })
    }
}

fn cloud_from_list(points: &[[f32; 4]]) -> PointCloudData {
    let points: Vec<PointXYZI> = points
        .iter()
        .map(|[x, y, z, i]| PointXYZI::new(*x, *y, *z, *i))
        .collect();
    PointCloudData::from_points(&points)
}

fn cloud_to_list(cloud: &PointCloudData) -> Result<Vec<[f32; 4]>, ContractError> {
    Ok(cloud
        .points()?
        .into_iter()
        .map(|p| [p.x, p.y, p.z, p.intensity])
        .collect())
}

/// 解析整个录制
///
/// # Errors
/// 任一行 JSON 非法时返回 `RecordingParse`，行号从 1 开始
pub fn read_recording<R: BufRead>(reader: R) -> Result<Vec<SensorEvent>, ContractError> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let recorded: RecordedEvent =
            serde_json::from_str(trimmed).map_err(|e| ContractError::RecordingParse {
                line: idx + 1,
                message: e.to_string(),
            })?;
        events.push(recorded.into_event());
    }
    Ok(events)
}

/// 将事件写为 JSON-lines
pub fn write_recording<W: Write>(mut writer: W, events: &[SensorEvent]) -> Result<(), ContractError> {
    for event in events {
        let recorded = RecordedEvent::from_event(event)?;
        let line =
            serde_json::to_string(&recorded).map_err(|e| ContractError::RecordingEncode {
                kind: event.kind().to_string(),
                message: e.to_string(),
            })?;
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(())
}

/// 录制回放数据源
///
/// 在独立线程中按文件顺序发出事件。`rate > 0` 时按时间戳间隔
/// 节流 (1.0 = 实时)，`rate == 0` 时尽快发出。
pub struct ReplaySource {
    name: String,
    events: Arc<Vec<SensorEvent>>,
    rate: f64,
    listening: Arc<AtomicBool>,
}

impl ReplaySource {
    pub fn from_events(name: impl Into<String>, events: Vec<SensorEvent>) -> Self {
        Self {
            name: name.into(),
            events: Arc::new(events),
            rate: 0.0,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 读取录制文件
    ///
    /// # Errors
    /// 文件无法读取或解析失败
    pub fn open(path: &Path) -> Result<Self, ContractError> {
        let file = File::open(path)?;
        let events = read_recording(BufReader::new(file))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("replay")
            .to_string();
        info!(path = %path.display(), events = events.len(), "recording loaded");
        Ok(Self::from_events(name, events))
    }

    /// 回放速率 (负值视为 0)
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate.max(0.0);
        self
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// 首末事件的时间跨度 (秒)
    pub fn duration(&self) -> f64 {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).max(0.0),
            _ => 0.0,
        }
    }
}

impl SensorSource for ReplaySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn listen(&self, callback: SensorEventCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let name = self.name.clone();
        let events = self.events.clone();
        let rate = self.rate;
        let listening = self.listening.clone();

        std::thread::spawn(move || {
            let mut previous: Option<f64> = None;
            let mut emitted = 0usize;
            for event in events.iter() {
                if !listening.load(Ordering::Relaxed) {
                    break;
                }
                if let (true, Some(prev)) = (rate > 0.0, previous) {
                    let gap = (event.timestamp - prev) / rate;
                    if gap > 0.0 {
                        std::thread::sleep(Duration::from_secs_f64(gap));
                    }
                }
                previous = Some(event.timestamp);
                callback(event.clone());
                emitted += 1;
            }
            listening.store(false, Ordering::SeqCst);
            debug!(source = %name, emitted, "replay finished");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
