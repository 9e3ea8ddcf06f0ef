//! PreintegratedDelta - relative motion between two reference times

use nalgebra::{UnitQuaternion, Vector3};

use crate::midpoint::{midpoint_step, Motion, SamplePair};
use crate::model::{ImuBias, ImuNoise, Matrix15, NoiseCovariance};

/// Relative motion accumulated from inertial samples since a reference time.
///
/// The rotation, velocity and position deltas are expressed in the body frame
/// at the reference time and still contain gravity. `jacobian` maps the
/// reference-time error state to the current error state and is the product
/// of every per-step transition since construction. `covariance` follows
/// `P = F P Fᵀ + V Q Vᵀ` and is kept symmetric.
#[derive(Debug, Clone)]
pub struct PreintegratedDelta {
    /// Sample at the reference time, kept for re-propagation
    linearized_acc: Vector3<f64>,
    linearized_gyr: Vector3<f64>,

    /// Most recently folded-in sample
    acc_0: Vector3<f64>,
    gyr_0: Vector3<f64>,

    bias: ImuBias,
    noise: ImuNoise,
    noise_cov: NoiseCovariance,

    motion: Motion,
    sum_dt: f64,
    jacobian: Matrix15,
    covariance: Matrix15,

    dt_buf: Vec<f64>,
    acc_buf: Vec<Vector3<f64>>,
    gyr_buf: Vec<Vector3<f64>>,
}

impl PreintegratedDelta {
    /// Start a new delta at the reference sample `(acc_0, gyr_0)`
    pub fn new(acc_0: Vector3<f64>, gyr_0: Vector3<f64>, bias: ImuBias, noise: ImuNoise) -> Self {
        Self {
            linearized_acc: acc_0,
            linearized_gyr: gyr_0,
            acc_0,
            gyr_0,
            bias,
            noise,
            noise_cov: noise.covariance(),
            motion: Motion::identity(),
            sum_dt: 0.0,
            jacobian: Matrix15::identity(),
            covariance: Matrix15::zeros(),
            dt_buf: Vec::new(),
            acc_buf: Vec::new(),
            gyr_buf: Vec::new(),
        }
    }

    /// Fold one inertial sample into the delta
    ///
    /// A non-positive or non-finite `dt` is rejected with a warning and leaves
    /// every field untouched. Returns whether the sample was applied.
    pub fn integrate(&mut self, dt: f64, acc: Vector3<f64>, gyr: Vector3<f64>) -> bool {
        if !Self::valid_dt(dt) {
            tracing::warn!(dt, sum_dt = self.sum_dt, "ignoring inertial step with invalid dt");
            return false;
        }

        self.dt_buf.push(dt);
        self.acc_buf.push(acc);
        self.gyr_buf.push(gyr);
        self.propagate(dt, acc, gyr);
        true
    }

    /// Transition matrix the next [`integrate`](Self::integrate) call would
    /// apply, without changing any state
    pub fn step_transition(
        &self,
        dt: f64,
        acc: Vector3<f64>,
        gyr: Vector3<f64>,
    ) -> Option<Matrix15> {
        if !Self::valid_dt(dt) {
            return None;
        }
        let samples = self.samples_to(acc, gyr);
        Some(midpoint_step(&self.motion, &samples, &self.bias, dt).transition)
    }

    /// Replace the stored biases without touching the accumulated delta
    pub fn reset_bias(&mut self, acc_bias: Vector3<f64>, gyr_bias: Vector3<f64>) {
        self.bias = ImuBias::new(acc_bias, gyr_bias);
    }

    /// Rebuild the delta from the recorded samples using new biases
    pub fn repropagate(&mut self, acc_bias: Vector3<f64>, gyr_bias: Vector3<f64>) {
        self.bias = ImuBias::new(acc_bias, gyr_bias);
        self.acc_0 = self.linearized_acc;
        self.gyr_0 = self.linearized_gyr;
        self.motion = Motion::identity();
        self.sum_dt = 0.0;
        self.jacobian = Matrix15::identity();
        self.covariance = Matrix15::zeros();

        for i in 0..self.dt_buf.len() {
            self.propagate(self.dt_buf[i], self.acc_buf[i], self.gyr_buf[i]);
        }

        tracing::debug!(
            steps = self.dt_buf.len(),
            sum_dt = self.sum_dt,
            "repropagated preintegration with refined bias"
        );
    }

    fn propagate(&mut self, dt: f64, acc: Vector3<f64>, gyr: Vector3<f64>) {
        let samples = self.samples_to(acc, gyr);
        let step = midpoint_step(&self.motion, &samples, &self.bias, dt);

        self.jacobian = step.transition * self.jacobian;
        let propagated = step.transition * self.covariance * step.transition.transpose()
            + step.noise_gain * self.noise_cov * step.noise_gain.transpose();
        self.covariance = 0.5 * (propagated + propagated.transpose());

        self.motion = step.motion;
        self.sum_dt += dt;
        self.acc_0 = acc;
        self.gyr_0 = gyr;
    }

    fn samples_to(&self, acc: Vector3<f64>, gyr: Vector3<f64>) -> SamplePair {
        SamplePair {
            acc_0: self.acc_0,
            gyr_0: self.gyr_0,
            acc_1: acc,
            gyr_1: gyr,
        }
    }

    fn valid_dt(dt: f64) -> bool {
        dt.is_finite() && dt > 0.0
    }

    pub fn delta_q(&self) -> &UnitQuaternion<f64> {
        &self.motion.rotation
    }

    pub fn delta_v(&self) -> &Vector3<f64> {
        &self.motion.velocity
    }

    pub fn delta_p(&self) -> &Vector3<f64> {
        &self.motion.position
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    /// Elapsed time since the reference sample (seconds)
    pub fn sum_dt(&self) -> f64 {
        self.sum_dt
    }

    pub fn jacobian(&self) -> &Matrix15 {
        &self.jacobian
    }

    pub fn covariance(&self) -> &Matrix15 {
        &self.covariance
    }

    pub fn bias(&self) -> &ImuBias {
        &self.bias
    }

    pub fn noise(&self) -> &ImuNoise {
        &self.noise
    }

    /// Number of samples folded in
    pub fn len(&self) -> usize {
        self.dt_buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dt_buf.is_empty()
    }

    /// Recorded `(dt, acc, gyr)` history in integration order
    pub fn samples(&self) -> impl Iterator<Item = (f64, &Vector3<f64>, &Vector3<f64>)> + '_ {
        self.dt_buf
            .iter()
            .zip(self.acc_buf.iter())
            .zip(self.gyr_buf.iter())
            .map(|((dt, acc), gyr)| (*dt, acc, gyr))
    }
}
