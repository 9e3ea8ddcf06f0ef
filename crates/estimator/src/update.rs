//! Measurement-update seam
//!
//! The lidar residual and its Jacobian live behind [`MeasurementUpdate`]; the
//! orchestrator only hands over the prediction, the retired delta and the scan.

use contracts::ScanFrame;
use preintegration::PreintegratedDelta;

use crate::NavState;

/// Correction step run once per consumed scan
pub trait MeasurementUpdate: Send {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Refine `predicted` using `scan`
    ///
    /// `delta` is the preintegration covering the interval that ends at the
    /// scan; its covariance is the prior for the correction. The returned
    /// biases become the linearization point of the next interval.
    fn correct(
        &mut self,
        predicted: NavState,
        delta: &PreintegratedDelta,
        scan: &ScanFrame,
    ) -> NavState;
}

/// Dead reckoning: accepts the inertial prediction unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct InertialOnly;

impl MeasurementUpdate for InertialOnly {
    fn name(&self) -> &str {
        "inertial_only"
    }

    fn correct(
        &mut self,
        predicted: NavState,
        _delta: &PreintegratedDelta,
        _scan: &ScanFrame,
    ) -> NavState {
        predicted
    }
}

impl<U: MeasurementUpdate + ?Sized> MeasurementUpdate for Box<U> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn correct(
        &mut self,
        predicted: NavState,
        delta: &PreintegratedDelta,
        scan: &ScanFrame,
    ) -> NavState {
        (**self).correct(predicted, delta, scan)
    }
}
