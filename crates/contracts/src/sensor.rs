//! 传感器数据模型
//!
//! IMU 采样、点云与分割元数据。时间戳统一为秒 (f64)。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ContractError;

/// 3D 向量
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<nalgebra::Vector3<f64>> for Vector3 {
    fn from(v: nalgebra::Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Vector3> for nalgebra::Vector3<f64> {
    fn from(v: Vector3) -> Self {
        nalgebra::Vector3::new(v.x, v.y, v.z)
    }
}

/// 单位四元数 (w, x, y, z)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<nalgebra::UnitQuaternion<f64>> for Quaternion {
    fn from(q: nalgebra::UnitQuaternion<f64>) -> Self {
        Self {
            w: q.w,
            x: q.i,
            y: q.j,
            z: q.k,
        }
    }
}

impl From<Quaternion> for nalgebra::UnitQuaternion<f64> {
    /// 转换时重新归一化
    fn from(q: Quaternion) -> Self {
        nalgebra::UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(q.w, q.x, q.y, q.z))
    }
}

/// IMU 采样
///
/// 采集后不可变，由 preintegration 消费。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InertialSample {
    /// 采样时间 (秒)
    pub timestamp: f64,

    /// 比力 (m/s²)，未去除重力
    pub acc: Vector3,

    /// 角速度 (rad/s)
    pub gyr: Vector3,
}

impl InertialSample {
    pub fn new(timestamp: f64, acc: Vector3, gyr: Vector3) -> Self {
        Self { timestamp, acc, gyr }
    }
}

/// 点云中的单个点 (x, y, z, intensity)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable, Serialize, Deserialize)]
pub struct PointXYZI {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
}

impl PointXYZI {
    pub const STRIDE: u32 = std::mem::size_of::<PointXYZI>() as u32;

    pub fn new(x: f32, y: f32, z: f32, intensity: f32) -> Self {
        Self { x, y, z, intensity }
    }
}

/// LiDAR 点云数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudData {
    /// 点数量
    pub num_points: u32,

    /// 每点字节数 (通常 16: x,y,z,intensity)
    pub point_stride: u32,

    /// 点云数据 (零拷贝)
    pub data: Bytes,
}

impl PointCloudData {
    pub fn empty() -> Self {
        Self {
            num_points: 0,
            point_stride: PointXYZI::STRIDE,
            data: Bytes::new(),
        }
    }

    pub fn from_points(points: &[PointXYZI]) -> Self {
        Self {
            num_points: points.len() as u32,
            point_stride: PointXYZI::STRIDE,
            data: Bytes::copy_from_slice(bytemuck::cast_slice(points)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    /// 解码为点列表
    ///
    /// # Errors
    /// stride 不是 16 字节或数据长度与点数不符
    pub fn points(&self) -> Result<Vec<PointXYZI>, ContractError> {
        if self.point_stride != PointXYZI::STRIDE {
            return Err(ContractError::payload_decode(
                "point_cloud",
                format!(
                    "unsupported point stride {} (expected {})",
                    self.point_stride,
                    PointXYZI::STRIDE
                ),
            ));
        }

        let expected = self.num_points as usize * PointXYZI::STRIDE as usize;
        if self.data.len() != expected {
            return Err(ContractError::payload_decode(
                "point_cloud",
                format!(
                    "data length {} does not match {} points",
                    self.data.len(),
                    self.num_points
                ),
            ));
        }

        // Bytes 不保证 4 字节对齐，逐点读取
        Ok(self
            .data
            .chunks_exact(PointXYZI::STRIDE as usize)
            .map(bytemuck::pod_read_unaligned::<PointXYZI>)
            .collect())
    }

    /// 对每个点应用变换，生成新点云
    pub fn transformed<F>(&self, mut f: F) -> Result<Self, ContractError>
    where
        F: FnMut(PointXYZI) -> PointXYZI,
    {
        let points: Vec<PointXYZI> = self.points()?.into_iter().map(&mut f).collect();
        Ok(Self::from_points(&points))
    }
}

/// 单帧扫描的分割元数据
///
/// 与扫描共享时间戳。按线束 (ring) 记录索引范围，按点记录分割属性。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanInfo {
    /// 每条线束在分割点云中的起始索引
    #[serde(default)]
    pub start_ring_index: Vec<i32>,

    /// 每条线束在分割点云中的结束索引
    #[serde(default)]
    pub end_ring_index: Vec<i32>,

    /// 扫描起始方位角 (rad)
    #[serde(default)]
    pub start_orientation: f32,

    /// 扫描结束方位角 (rad)
    #[serde(default)]
    pub end_orientation: f32,

    /// 起止方位角差 (rad)
    #[serde(default)]
    pub orientation_diff: f32,

    /// 每点是否为地面点
    #[serde(default)]
    pub ground_flag: Vec<bool>,

    /// 每点在距离图像中的列号
    #[serde(default)]
    pub column_index: Vec<u32>,

    /// 每点的量测距离 (m)
    #[serde(default)]
    pub range: Vec<f32>,
}

/// 配对后的一帧扫描
///
/// Scheduler 交给 estimator 的输入：扫描点云及其两路附属数据。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFrame {
    /// 扫描时间 (秒)
    pub timestamp: f64,

    /// 分割后的扫描点云
    pub scan: PointCloudData,

    /// 分割元数据
    pub info: ScanInfo,

    /// 离群点云
    pub outlier: PointCloudData,
}
