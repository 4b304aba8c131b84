//! Basic building blocks.

use std::{
    f64::consts::PI,
    ops::{Add, Mul, Neg, Sub},
};

use nalgebra::{Point2, Rotation2, Vector2};

#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Position {
    x: f64,
    y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn distance(&self, position: Self) -> f64 {
        ((self.x - position.x).powi(2) + (self.y - position.y).powi(2)).sqrt()
    }

    pub fn length(&self) -> f64 {
        self.distance(Position::default())
    }

    pub fn dot(&self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn rotate_vector(&self, angle: Angle) -> Position {
        (Rotation2::new(angle.0) * Vector2::new(self.x, self.y)).into()
    }

    /// Rotates the position around `center` by `angle`.
    pub fn rotate_around(&self, center: Position, angle: Angle) -> Position {
        let rotation = Rotation2::new(angle.0);
        let center = Point2::<f64>::from(center);
        (center + rotation * (Point2::from(*self) - center)).into()
    }
}

impl From<Position> for (f64, f64) {
    fn from(value: Position) -> Self {
        (value.x, value.y)
    }
}

impl From<Position> for Vector2<f64> {
    fn from(value: Position) -> Self {
        Vector2::new(value.x, value.y)
    }
}

impl From<Vector2<f64>> for Position {
    fn from(value: Vector2<f64>) -> Self {
        Position::new(value.x, value.y)
    }
}

impl From<Position> for Point2<f64> {
    fn from(value: Position) -> Self {
        Point2::new(value.x, value.y)
    }
}

impl From<Point2<f64>> for Position {
    fn from(value: Point2<f64>) -> Self {
        Position::new(value.x, value.y)
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<f64> for Position {
    type Output = Position;

    fn mul(self, rhs: f64) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

/// Orientation in radians, counter-clockwise from the positive x-axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Angle(f64);

impl Angle {
    pub const fn new(radians: f64) -> Self {
        Self(radians)
    }

    pub fn from_deg(degree: f64) -> Self {
        Self(degree * PI / 180.0)
    }

    /// Degrees wrapped into `[0, 360)`.
    pub fn to_deg(self) -> f64 {
        (self.0 * (180.0 / PI)).rem_euclid(360.0)
    }

    pub fn radians(self) -> f64 {
        self.0
    }

    /// Same direction, wrapped into `(-PI, PI]`.
    pub fn normalized(self) -> Self {
        let wrapped = self.0.rem_euclid(2.0 * PI);
        Self(if wrapped > PI { wrapped - 2.0 * PI } else { wrapped })
    }

    pub fn cos(self) -> f64 {
        self.0.cos()
    }

    pub fn sin(self) -> f64 {
        self.0.sin()
    }
}

impl Neg for Angle {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Angle(-self.0)
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl From<Angle> for f64 {
    fn from(value: Angle) -> Self {
        value.0
    }
}

/// Position and orientation of a robot on the field.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Pose {
    position: Position,
    orientation: Angle,
}

impl Pose {
    pub const fn new(position: Position, orientation: Angle) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn orientation(&self) -> Angle {
        self.orientation
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn with_position(&self, position: Position) -> Self {
        Self { position, ..*self }
    }

    pub fn with_orientation(&self, orientation: Angle) -> Self {
        Self {
            orientation,
            ..*self
        }
    }

    /// Converts an offset given in the robot frame (x forward, y left) into field coordinates.
    pub fn to_field(&self, local: Position) -> Position {
        self.position + local.rotate_vector(self.orientation)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::{assert_abs_diff_eq, AbsDiffEq};
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_position() {
        let position = Position::new(1.0, 2.0);
        assert_abs_diff_eq!(position.x(), 1.0);
        assert_abs_diff_eq!(position.y(), 2.0);
    }

    #[rstest]
    #[case(Angle::new(0.0), 0.0)]
    #[case(Angle::new(0.5 * PI), 90.0)]
    #[case(Angle::new(1.0 * PI), 180.0)]
    #[case(Angle::new(1.5 * PI), 270.0)]
    #[case(Angle::new(2.0 * PI), 0.0)]
    #[case(Angle::new(-0.5 * PI), 270.0)]
    #[case(Angle::new(-4.5 * PI), 270.0)]
    fn test_angle_to_deg(#[case] angle: Angle, #[case] expected: f64) {
        assert_abs_diff_eq!(angle.to_deg(), expected, epsilon = 1e-9);
    }

    #[rstest]
    #[case(1.5 * PI, -0.5 * PI)]
    #[case(-1.5 * PI, 0.5 * PI)]
    #[case(PI, PI)]
    #[case(0.25 * PI, 0.25 * PI)]
    fn test_angle_normalized(#[case] radians: f64, #[case] expected: f64) {
        assert_abs_diff_eq!(Angle::new(radians).normalized(), Angle::new(expected), epsilon = 1e-12);
    }

    #[test]
    fn test_position_rotate_around() {
        let rotated = Position::new(2.0, 1.0).rotate_around(Position::new(1.0, 1.0), Angle::new(0.5 * PI));
        assert_abs_diff_eq!(rotated, Position::new(1.0, 2.0), epsilon = 1e-12);
    }

    #[rstest]
    #[case(Angle::new(0.0), Position::new(1.2, 2.1))]
    #[case(Angle::new(0.5 * PI), Position::new(0.9, 2.2))]
    #[case(Angle::new(PI), Position::new(0.8, 1.9))]
    #[case(Angle::new(1.5 * PI), Position::new(1.1, 1.8))]
    fn test_pose_to_field(#[case] angle: Angle, #[case] position: Position) {
        let pose = Pose::new(Position::new(1.0, 2.0), angle);
        assert_abs_diff_eq!(pose.to_field(Position::new(0.2, 0.1)), position, epsilon = 1e-12);
    }

    impl AbsDiffEq for Position {
        type Epsilon = f64;

        fn default_epsilon() -> f64 {
            f64::EPSILON
        }

        fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
            f64::abs_diff_eq(&self.x, &other.x, epsilon)
                && f64::abs_diff_eq(&self.y, &other.y, epsilon)
        }
    }

    impl AbsDiffEq for Angle {
        type Epsilon = f64;

        fn default_epsilon() -> f64 {
            f64::EPSILON
        }

        fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
            f64::abs_diff_eq(&self.0, &other.0, epsilon)
        }
    }

    impl AbsDiffEq for Pose {
        type Epsilon = f64;

        fn default_epsilon() -> f64 {
            f64::EPSILON
        }

        fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
            Position::abs_diff_eq(&self.position, &other.position, epsilon)
                && Angle::abs_diff_eq(&self.orientation, &other.orientation, epsilon)
        }
    }
}
