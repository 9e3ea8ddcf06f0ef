//! Nominal navigation state

use nalgebra::{UnitQuaternion, Vector3};
use preintegration::{ImuBias, PreintegratedDelta};

/// Nominal state of the platform in the world frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavState {
    /// Body-to-world rotation
    pub rotation: UnitQuaternion<f64>,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub bias: ImuBias,
}

impl NavState {
    /// Level, at the origin, not moving
    pub fn at_rest(bias: ImuBias) -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            bias,
        }
    }

    /// Compose this state with a preintegrated delta
    ///
    /// `gravity` is the world-frame gravity vector, e.g. `(0, 0, -9.81)`.
    pub fn predict(&self, delta: &PreintegratedDelta, gravity: &Vector3<f64>) -> Self {
        let dt = delta.sum_dt();
        Self {
            rotation: self.rotation * delta.delta_q(),
            position: self.position
                + self.velocity * dt
                + 0.5 * gravity * dt * dt
                + self.rotation * delta.delta_p(),
            velocity: self.velocity + gravity * dt + self.rotation * delta.delta_v(),
            bias: self.bias,
        }
    }
}
