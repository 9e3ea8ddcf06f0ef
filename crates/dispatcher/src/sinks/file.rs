//! FileSink - writes the trajectory (TUM format) and optional PLY clouds

use contracts::{ContractError, DataSink, OdometryFrame, PointXYZI};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Trajectory file, one `t x y z qx qy qz qw` line per frame
    pub path: PathBuf,
    /// Directory for per-scan PLY exports of attached feature clouds
    pub ply_dir: Option<PathBuf>,
}

impl FileSinkConfig {
    /// Create config from params map (`path` required, `ply_dir` optional)
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .ok_or_else(|| {
                ContractError::config_validation("params.path", "file sink requires a 'path'")
            })?;
        let ply_dir = params.get("ply_dir").map(PathBuf::from);

        Ok(Self { path, ply_dir })
    }
}

/// Sink that writes frames to disk files
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: BufWriter<File>,
    lines: u64,
}

impl FileSink {
    /// Create a new FileSink, truncating the trajectory file
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if let Some(dir) = &config.ply_dir {
            fs::create_dir_all(dir)?;
        }
        let writer = BufWriter::new(File::create(&config.path)?);

        Ok(Self {
            name: name.into(),
            config,
            writer,
            lines: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let config = FileSinkConfig::from_params(params)?;
        Ok(Self::new(name, config)?)
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn write_frame_to_disk(&mut self, frame: &OdometryFrame) -> Result<(), ContractError> {
        // 点云先解码，坏数据不会留下半帧输出
        let clouds = match (&self.config.ply_dir, &frame.features) {
            (Some(dir), Some(features)) => {
                Some((dir, features.scan.points()?, features.outlier.points()?))
            }
            _ => None,
        };

        let p = &frame.position;
        let q = &frame.orientation;
        writeln!(
            self.writer,
            "{:.6} {:.6} {:.6} {:.6} {:.9} {:.9} {:.9} {:.9}",
            frame.timestamp, p.x, p.y, p.z, q.x, q.y, q.z, q.w
        )?;
        self.lines += 1;

        if let Some((dir, scan, outlier)) = clouds {
            let stem = format!("{:06}", frame.scan_index);
            save_point_cloud(&dir.join(format!("{stem}_scan.ply")), &scan)?;
            save_point_cloud(&dir.join(format!("{stem}_outlier.ply")), &outlier)?;
        }
        Ok(())
    }

    fn persist_frame(&mut self, frame: &OdometryFrame) -> Result<(), ContractError> {
        self.write_frame_to_disk(frame).map_err(|e| {
            error!(sink = %self.name, scan_index = frame.scan_index, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

fn save_point_cloud(path: &Path, points: &[PointXYZI]) -> std::io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    // Write PLY header
    writeln!(file, "ply")?;
    writeln!(file, "format binary_little_endian 1.0")?;
    writeln!(file, "element vertex {}", points.len())?;
    writeln!(file, "property float x")?;
    writeln!(file, "property float y")?;
    writeln!(file, "property float z")?;
    writeln!(file, "property float intensity")?;
    writeln!(file, "end_header")?;

    for point in points {
        for value in [point.x, point.y, point.z, point.intensity] {
            file.write_all(&value.to_le_bytes())?;
        }
    }
    file.flush()
}

impl DataSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, frame),
        fields(sink = %self.name, scan_index = frame.scan_index)
    )]
    async fn write(&mut self, frame: &OdometryFrame) -> Result<(), ContractError> {
        self.persist_frame(frame)?;
        Ok(())
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.writer
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await?;
        debug!(sink = %self.name, lines = self.lines, path = %self.config.path.display(), "FileSink closed");
        Ok(())
    }
}
