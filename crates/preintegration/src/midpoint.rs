//! Midpoint integration of one inertial step
//!
//! Transition and noise-gain blocks follow the discrete error-state model
//! in [`StateBlock`] order.

use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};

use crate::model::{ImuBias, Matrix15, NoiseBlock, NoiseGain, StateBlock};

/// Relative motion accumulated since the reference time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub rotation: UnitQuaternion<f64>,
    pub velocity: Vector3<f64>,
    pub position: Vector3<f64>,
}

impl Motion {
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            velocity: Vector3::zeros(),
            position: Vector3::zeros(),
        }
    }
}

/// Raw samples at both ends of a step
#[derive(Debug, Clone, Copy)]
pub(crate) struct SamplePair {
    pub acc_0: Vector3<f64>,
    pub gyr_0: Vector3<f64>,
    pub acc_1: Vector3<f64>,
    pub gyr_1: Vector3<f64>,
}

/// Result of one midpoint step
#[derive(Debug, Clone)]
pub(crate) struct MidpointStep {
    pub motion: Motion,
    pub transition: Matrix15,
    pub noise_gain: NoiseGain,
}

fn put(m: &mut Matrix15, row: StateBlock, col: StateBlock, block: &Matrix3<f64>) {
    m.fixed_view_mut::<3, 3>(row.offset(), col.offset())
        .copy_from(block);
}

fn put_noise(m: &mut NoiseGain, row: StateBlock, col: NoiseBlock, block: &Matrix3<f64>) {
    m.fixed_view_mut::<3, 3>(row.offset(), col.offset())
        .copy_from(block);
}

/// Advance `motion` by one step of length `dt`
///
/// Bias compensation uses `bias` for both step ends; the bias itself is not
/// part of the deterministic update.
pub(crate) fn midpoint_step(
    motion: &Motion,
    samples: &SamplePair,
    bias: &ImuBias,
    dt: f64,
) -> MidpointStep {
    use StateBlock::*;

    let acc_0 = samples.acc_0 - bias.acc;
    let acc_1 = samples.acc_1 - bias.acc;

    let un_acc_0 = motion.rotation * acc_0;
    let un_gyr = 0.5 * (samples.gyr_0 + samples.gyr_1) - bias.gyr;

    let half_angle = un_gyr * (0.5 * dt);
    let increment = Quaternion::new(1.0, half_angle.x, half_angle.y, half_angle.z);
    let rotation = UnitQuaternion::new_normalize(motion.rotation.into_inner() * increment);

    let un_acc_1 = rotation * acc_1;
    let un_acc = 0.5 * (un_acc_0 + un_acc_1);

    let next = Motion {
        rotation,
        position: motion.position + motion.velocity * dt + 0.5 * un_acc * dt * dt,
        velocity: motion.velocity + un_acc * dt,
    };

    let r_0 = motion.rotation.to_rotation_matrix().into_inner();
    let r_1 = rotation.to_rotation_matrix().into_inner();
    let w_x = un_gyr.cross_matrix();
    let a_0_x = acc_0.cross_matrix();
    let a_1_x = acc_1.cross_matrix();
    let eye = Matrix3::<f64>::identity();
    let att_step = eye - w_x * dt;
    let dt2 = dt * dt;

    let mut f = Matrix15::zeros();
    put(&mut f, Position, Position, &eye);
    put(&mut f, Position, Velocity, &(eye * dt));
    put(
        &mut f,
        Position,
        Attitude,
        &(-0.25 * r_0 * a_0_x * dt2 - 0.25 * r_1 * a_1_x * att_step * dt2),
    );
    put(&mut f, Position, AccBias, &(-0.25 * (r_0 + r_1) * dt2));
    put(&mut f, Position, GyrBias, &(0.25 * r_1 * a_1_x * dt2 * dt));

    put(&mut f, Attitude, Attitude, &att_step);
    put(&mut f, Attitude, GyrBias, &(-eye * dt));

    put(
        &mut f,
        Velocity,
        Attitude,
        &(-0.5 * r_0 * a_0_x * dt - 0.5 * r_1 * a_1_x * att_step * dt),
    );
    put(&mut f, Velocity, Velocity, &eye);
    put(&mut f, Velocity, AccBias, &(-0.5 * (r_0 + r_1) * dt));
    put(&mut f, Velocity, GyrBias, &(0.5 * r_1 * a_1_x * dt2));

    put(&mut f, AccBias, AccBias, &eye);
    put(&mut f, GyrBias, GyrBias, &eye);

    let gyr_to_pos = -0.25 * r_1 * a_1_x * dt2 * 0.5 * dt;
    let gyr_to_vel = -0.5 * r_1 * a_1_x * dt * 0.5 * dt;

    let mut v = NoiseGain::zeros();
    put_noise(&mut v, Position, NoiseBlock::Acc0, &(0.25 * r_0 * dt2));
    put_noise(&mut v, Position, NoiseBlock::Gyr0, &gyr_to_pos);
    put_noise(&mut v, Position, NoiseBlock::Acc1, &(0.25 * r_1 * dt2));
    put_noise(&mut v, Position, NoiseBlock::Gyr1, &gyr_to_pos);
    put_noise(&mut v, Attitude, NoiseBlock::Gyr0, &(0.5 * eye * dt));
    put_noise(&mut v, Attitude, NoiseBlock::Gyr1, &(0.5 * eye * dt));
    put_noise(&mut v, Velocity, NoiseBlock::Acc0, &(0.5 * r_0 * dt));
    put_noise(&mut v, Velocity, NoiseBlock::Gyr0, &gyr_to_vel);
    put_noise(&mut v, Velocity, NoiseBlock::Acc1, &(0.5 * r_1 * dt));
    put_noise(&mut v, Velocity, NoiseBlock::Gyr1, &gyr_to_vel);
    put_noise(&mut v, AccBias, NoiseBlock::AccWalk, &(eye * dt));
    put_noise(&mut v, GyrBias, NoiseBlock::GyrWalk, &(eye * dt));

    MidpointStep {
        motion: next,
        transition: f,
        noise_gain: v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pair(acc: Vector3<f64>, gyr: Vector3<f64>) -> SamplePair {
        SamplePair {
            acc_0: acc,
            gyr_0: gyr,
            acc_1: acc,
            gyr_1: gyr,
        }
    }

    #[test]
    fn test_constant_acceleration_step() {
        let step = midpoint_step(
            &Motion::identity(),
            &pair(Vector3::new(1.0, 0.0, 0.0), Vector3::zeros()),
            &ImuBias::zero(),
            0.5,
        );
        assert_relative_eq!(step.motion.velocity, Vector3::new(0.5, 0.0, 0.0));
        assert_relative_eq!(step.motion.position, Vector3::new(0.125, 0.0, 0.0));
        assert_relative_eq!(step.motion.rotation.angle(), 0.0);
    }

    #[test]
    fn test_constant_rate_rotation() {
        let step = midpoint_step(
            &Motion::identity(),
            &pair(Vector3::zeros(), Vector3::new(0.0, 0.0, 0.2)),
            &ImuBias::zero(),
            0.01,
        );
        let (_, _, yaw) = step.motion.rotation.euler_angles();
        assert_relative_eq!(yaw, 0.002, epsilon = 1e-9);
    }

    #[test]
    fn test_transition_diagonal_blocks() {
        let step = midpoint_step(
            &Motion::identity(),
            &pair(Vector3::new(0.0, 0.0, 9.8), Vector3::new(0.1, -0.2, 0.3)),
            &ImuBias::zero(),
            0.01,
        );
        let f = step.transition;
        for block in [StateBlock::Position, StateBlock::Velocity, StateBlock::AccBias] {
            let o = block.offset();
            assert_relative_eq!(
                f.fixed_view::<3, 3>(o, o).into_owned(),
                Matrix3::identity()
            );
        }
        let g = StateBlock::GyrBias.offset();
        let a = StateBlock::Attitude.offset();
        assert_relative_eq!(
            f.fixed_view::<3, 3>(a, g).into_owned(),
            -Matrix3::identity() * 0.01
        );
    }
}
