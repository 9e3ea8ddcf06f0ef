//! SensorEvent - Ingestion output
//!
//! One timestamped message from any of the four input streams.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{InertialSample, PointCloudData, ScanInfo};

/// Input stream kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// High-rate inertial samples
    Imu,
    /// Segmented point-cloud scan
    Scan,
    /// Per-scan segmentation metadata
    ScanInfo,
    /// Per-scan outlier cloud
    Outlier,
}

impl StreamKind {
    pub const ALL: [StreamKind; 4] = [Self::Imu, Self::Scan, Self::ScanInfo, Self::Outlier];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imu => "imu",
            Self::Scan => "scan",
            Self::ScanInfo => "scan_info",
            Self::Outlier => "outlier",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SensorPayload {
    Imu(InertialSample),
    Scan(PointCloudData),
    ScanInfo(ScanInfo),
    Outlier(PointCloudData),
}

impl SensorPayload {
    pub fn kind(&self) -> StreamKind {
        match self {
            Self::Imu(_) => StreamKind::Imu,
            Self::Scan(_) => StreamKind::Scan,
            Self::ScanInfo(_) => StreamKind::ScanInfo,
            Self::Outlier(_) => StreamKind::Outlier,
        }
    }
}

/// Timestamped sensor event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorEvent {
    /// Sensor timestamp (seconds)
    pub timestamp: f64,

    pub payload: SensorPayload,
}

impl SensorEvent {
    /// Wrap an inertial sample, reusing its own timestamp
    pub fn imu(sample: InertialSample) -> Self {
        Self {
            timestamp: sample.timestamp,
            payload: SensorPayload::Imu(sample),
        }
    }

    pub fn scan(timestamp: f64, cloud: PointCloudData) -> Self {
        Self {
            timestamp,
            payload: SensorPayload::Scan(cloud),
        }
    }

    pub fn scan_info(timestamp: f64, info: ScanInfo) -> Self {
        Self {
            timestamp,
            payload: SensorPayload::ScanInfo(info),
        }
    }

    pub fn outlier(timestamp: f64, cloud: PointCloudData) -> Self {
        Self {
            timestamp,
            payload: SensorPayload::Outlier(cloud),
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.payload.kind()
    }
}
