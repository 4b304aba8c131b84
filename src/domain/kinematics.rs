//! Differential-drive kinematics.
//!
//! A move is computed from the distance travelled by each wheel during one tick. Unequal wheel
//! displacements rotate the robot around the instantaneous center of rotation (ICR), which lies
//! on the wheel axle.

use thiserror::Error;

use super::{Angle, Field, Pose, Position};

#[derive(Error, Debug, PartialEq)]
pub enum KinematicsError {
    #[error("wheelbase must be positive, got {0}")]
    InvalidWheelbase(f64),
}

/// Kinematics of one robot geometry on one field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Kinematics {
    wheelbase: f64,
    field: Field,
}

impl Kinematics {
    pub fn new(wheelbase: f64, field: Field) -> Result<Self, KinematicsError> {
        if wheelbase > 0.0 && wheelbase.is_finite() {
            Ok(Self { wheelbase, field })
        } else {
            Err(KinematicsError::InvalidWheelbase(wheelbase))
        }
    }

    /// Moves the robot and clamps the resulting position into the field.
    pub fn advance(&self, pose: Pose, left_delta: f64, right_delta: f64) -> Pose {
        self.field
            .clamp(build_move(pose, left_delta, right_delta, self.wheelbase))
    }
}

/// Below this rotation in radians the ICR is too far away to rotate around it precisely.
const MIN_ARC_ROTATION: f64 = 1e-9;

/// New pose after the left and right wheels travelled `left_delta` and `right_delta` meters.
///
/// `wheelbase` is the distance between the wheel contact points and must be positive.
pub fn build_move(pose: Pose, left_delta: f64, right_delta: f64, wheelbase: f64) -> Pose {
    debug_assert!(wheelbase > 0.0);

    if left_delta == right_delta {
        let heading = Position::new(pose.orientation().cos(), pose.orientation().sin());
        return pose.with_position(pose.position() + heading * left_delta);
    }

    let turn = (right_delta - left_delta) / wheelbase;
    let rotation = Angle::new(turn);

    if turn.abs() < MIN_ARC_ROTATION {
        // Chord of a nearly straight arc, (sin θ / θ, (1 - cos θ) / θ) to first order.
        let travelled = (left_delta + right_delta) / 2.0;
        let chord = Position::new(travelled, travelled * turn / 2.0);
        return Pose::new(pose.to_field(chord), pose.orientation() + rotation);
    }

    let center = instantaneous_center_of_rotation(pose, left_delta, right_delta, wheelbase);

    Pose::new(
        pose.position().rotate_around(center, rotation),
        pose.orientation() + rotation,
    )
}

/// The outer wheel is the one travelling further. It runs on the big circle whose radius
/// follows from the ratio of the inner to the outer displacement.
fn instantaneous_center_of_rotation(
    pose: Pose,
    left_delta: f64,
    right_delta: f64,
    wheelbase: f64,
) -> Position {
    let half_axle = wheelbase / 2.0;
    let (outer, inner, outer_side) = if right_delta.abs() >= left_delta.abs() {
        (right_delta, left_delta, -1.0)
    } else {
        (left_delta, right_delta, 1.0)
    };

    let big_circle_radius = wheelbase / (1.0 - inner / outer);

    // Lateral offsets along the left-pointing axle, positive towards the left wheel.
    let outer_wheel = outer_side * half_axle;
    let center = outer_wheel - outer_side * big_circle_radius;

    pose.to_field(Position::new(0.0, center))
}
