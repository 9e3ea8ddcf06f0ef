//! Publish boundary: axis convention and feature attachment

use contracts::{
    FeatureClouds, FrameConventionKind, OdometryFrame, PointCloudData, PointXYZI, PublishConfig,
    Quaternion, Vector3,
};
use tracing::warn;

/// Axis convention of published frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrameConvention {
    /// Estimator axes unchanged
    Xyz,
    /// `(x, y, z) -> (y, z, x)`
    #[default]
    Yzx,
}

impl From<FrameConventionKind> for FrameConvention {
    fn from(kind: FrameConventionKind) -> Self {
        match kind {
            FrameConventionKind::Xyz => Self::Xyz,
            FrameConventionKind::Yzx => Self::Yzx,
        }
    }
}

impl FrameConvention {
    #[inline]
    pub fn vector(&self, v: Vector3) -> Vector3 {
        match self {
            Self::Xyz => v,
            Self::Yzx => Vector3::new(v.y, v.z, v.x),
        }
    }

    /// Conjugation by the axis permutation permutes the vector part
    #[inline]
    pub fn rotation(&self, q: Quaternion) -> Quaternion {
        match self {
            Self::Xyz => q,
            Self::Yzx => Quaternion {
                w: q.w,
                x: q.y,
                y: q.z,
                z: q.x,
            },
        }
    }

    #[inline]
    pub fn point(&self, p: PointXYZI) -> PointXYZI {
        match self {
            Self::Xyz => p,
            Self::Yzx => PointXYZI::new(p.y, p.z, p.x, p.intensity),
        }
    }

    pub fn cloud(&self, cloud: &PointCloudData) -> Result<PointCloudData, contracts::ContractError> {
        match self {
            Self::Xyz => Ok(cloud.clone()),
            Self::Yzx => cloud.transformed(|p| self.point(p)),
        }
    }
}

/// Converts estimator output into what sinks receive
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishTransform {
    convention: FrameConvention,
    attach_features: bool,
}

impl PublishTransform {
    pub fn new(convention: FrameConvention, attach_features: bool) -> Self {
        Self {
            convention,
            attach_features,
        }
    }

    pub fn from_config(config: &PublishConfig) -> Self {
        Self::new(config.frame.into(), config.attach_features)
    }

    pub fn convention(&self) -> FrameConvention {
        self.convention
    }

    /// Apply the convention to pose and clouds; strip clouds unless attached
    pub fn prepare(&self, frame: OdometryFrame) -> OdometryFrame {
        let c = self.convention;
        let features = if self.attach_features {
            frame.features.and_then(|f| self.features(frame.scan_index, &f))
        } else {
            None
        };

        OdometryFrame {
            timestamp: frame.timestamp,
            scan_index: frame.scan_index,
            orientation: c.rotation(frame.orientation),
            position: c.vector(frame.position),
            velocity: c.vector(frame.velocity),
            acc_bias: c.vector(frame.acc_bias),
            gyr_bias: c.vector(frame.gyr_bias),
            features,
        }
    }

    fn features(&self, scan_index: u64, features: &FeatureClouds) -> Option<FeatureClouds> {
        let converted = self
            .convention
            .cloud(&features.scan)
            .and_then(|scan| Ok((scan, self.convention.cloud(&features.outlier)?)));
        match converted {
            Ok((scan, outlier)) => Some(FeatureClouds { scan, outlier }),
            Err(e) => {
                warn!(scan_index, error = %e, "feature clouds not published");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3 as NVector3};

    fn frame_with_features() -> OdometryFrame {
        let orientation: Quaternion =
            UnitQuaternion::from_euler_angles(0.1, -0.3, 0.7).into();
        OdometryFrame {
            timestamp: 1.0,
            scan_index: 3,
            orientation,
            position: Vector3::new(1.0, 2.0, 3.0),
            velocity: Vector3::new(-1.0, 0.5, 0.0),
            acc_bias: Vector3::ZERO,
            gyr_bias: Vector3::new(0.0, 0.0, 0.01),
            features: Some(FeatureClouds {
                scan: PointCloudData::from_points(&[PointXYZI::new(1.0, 2.0, 3.0, 7.0)]),
                outlier: PointCloudData::empty(),
            }),
        }
    }

    #[test]
    fn test_yzx_permutes_vectors() {
        let out = PublishTransform::new(FrameConvention::Yzx, false).prepare(frame_with_features());
        assert_eq!(out.position, Vector3::new(2.0, 3.0, 1.0));
        assert_eq!(out.velocity, Vector3::new(0.5, 0.0, -1.0));
        assert_eq!(out.gyr_bias, Vector3::new(0.0, 0.01, 0.0));
        assert!(out.features.is_none(), "features stripped unless attached");
    }

    #[test]
    fn test_yzx_rotation_is_conjugation() {
        let frame = frame_with_features();
        let out = PublishTransform::new(FrameConvention::Yzx, false).prepare(frame.clone());

        // P maps estimator axes onto published axes: (x, y, z) -> (y, z, x)
        let p = Rotation3::from_matrix_unchecked(Matrix3::new(
            0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, //
            1.0, 0.0, 0.0,
        ));
        let r: UnitQuaternion<f64> = frame.orientation.into();
        let expected = p * r.to_rotation_matrix() * p.inverse();
        let actual: UnitQuaternion<f64> = out.orientation.into();

        let v = NVector3::new(0.3, -1.2, 2.0);
        let diff = actual * v - expected * v;
        assert!(diff.norm() < 1e-12, "rotation mismatch: {diff}");
    }

    #[test]
    fn test_attached_features_converted() {
        let out = PublishTransform::new(FrameConvention::Yzx, true).prepare(frame_with_features());
        let features = out.features.expect("features attached");
        let points = features.scan.points().unwrap();
        assert_eq!(points[0], PointXYZI::new(2.0, 3.0, 1.0, 7.0));
        assert!(features.outlier.is_empty());
    }

    #[test]
    fn test_xyz_is_identity() {
        let frame = frame_with_features();
        let out = PublishTransform::new(FrameConvention::Xyz, true).prepare(frame.clone());
        assert_eq!(out, frame);
    }

    #[test]
    fn test_from_config() {
        let transform = PublishTransform::from_config(&PublishConfig::default());
        assert_eq!(transform.convention(), FrameConvention::Yzx);
    }
}
