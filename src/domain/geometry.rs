//! Closed-form 2D geometry used for virtual sensing and collision checks.
//!
//! All functions are total: degenerate input (parallel segments, zero-length segments, missing
//! roots) yields `None` or `false` instead of panicking.

use nalgebra::{Matrix2, Vector2};

use super::{Angle, Position};

const DETERMINANT_EPSILON: f64 = 1e-12;

/// Oriented rectangle given by its center, heading and extents along and across the heading.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Rectangle {
    pub center: Position,
    pub heading: Angle,
    pub length: f64,
    pub width: f64,
}

impl Rectangle {
    pub fn new(center: Position, heading: Angle, length: f64, width: f64) -> Self {
        Self {
            center,
            heading,
            length,
            width,
        }
    }

    /// Corners in counter-clockwise order starting at front left.
    pub fn corners(&self) -> [Position; 4] {
        let half_length = self.length / 2.0;
        let half_width = self.width / 2.0;
        [
            Position::new(half_length, half_width),
            Position::new(-half_length, half_width),
            Position::new(-half_length, -half_width),
            Position::new(half_length, -half_width),
        ]
        .map(|corner| self.center + corner.rotate_vector(self.heading))
    }

    pub fn edges(&self) -> [(Position, Position); 4] {
        let [c0, c1, c2, c3] = self.corners();
        [(c0, c1), (c1, c2), (c2, c3), (c3, c0)]
    }

    /// Radius of the smallest circle around the center containing the rectangle.
    pub fn bounding_radius(&self) -> f64 {
        (self.length.powi(2) + self.width.powi(2)).sqrt() / 2.0
    }

    /// Unit normals of the four faces.
    fn face_normals(&self) -> [Position; 4] {
        self.edges().map(|(p1, p2)| {
            let edge = p2 - p1;
            let length = edge.length();
            if length > 0.0 {
                Position::new(edge.y(), -edge.x()) * length.recip()
            } else {
                Position::default()
            }
        })
    }

    fn project(&self, axis: Position) -> (f64, f64) {
        self.corners()
            .iter()
            .map(|corner| corner.dot(axis))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), p| {
                (min.min(p), max.max(p))
            })
    }
}

/// Distance from `a1` to the intersection of segments `a1 a2` and `b1 b2`.
pub fn distance_segment_segment(
    a1: Position,
    a2: Position,
    b1: Position,
    b2: Position,
) -> Option<f64> {
    let r = a2 - a1;
    let s = b2 - b1;
    let system = Matrix2::new(r.x(), -s.x(), r.y(), -s.y());

    if system.determinant().abs() < DETERMINANT_EPSILON {
        return None;
    }

    let parameters = system.try_inverse()? * Vector2::from(b1 - a1);
    let (t, u) = (parameters.x, parameters.y);

    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return None;
    }

    Some(r.length() * t)
}

/// Distance from `a` along segment `a b` to the first point on the circle.
pub fn distance_segment_circle(
    a: Position,
    b: Position,
    center: Position,
    radius: f64,
) -> Option<f64> {
    let d = b - a;
    let f = a - center;

    let qa = d.dot(d);
    let qb = 2.0 * f.dot(d);
    let qc = f.dot(f) - radius.powi(2);

    if qa < DETERMINANT_EPSILON {
        return None;
    }

    let discriminant = qb.powi(2) - 4.0 * qa * qc;
    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    [(-qb - root) / (2.0 * qa), (-qb + root) / (2.0 * qa)]
        .into_iter()
        .find(|t| (0.0..=1.0).contains(t))
        .map(|t| t * d.length())
}

pub fn circles_overlap(
    center: Position,
    radius: f64,
    other_center: Position,
    other_radius: f64,
) -> bool {
    center.distance(other_center) < radius + other_radius
}

pub fn rectangle_circle_overlap(rectangle: &Rectangle, center: Position, radius: f64) -> bool {
    let local = (center - rectangle.center).rotate_vector(-rectangle.heading);
    let half_length = rectangle.length / 2.0;
    let half_width = rectangle.width / 2.0;
    let nearest = Position::new(
        local.x().clamp(-half_length, half_length),
        local.y().clamp(-half_width, half_width),
    );

    local == nearest || local.distance(nearest) < radius
}

pub fn rectangle_rectangle_overlap(rectangle: &Rectangle, other: &Rectangle) -> bool {
    if !circles_overlap(
        rectangle.center,
        rectangle.bounding_radius(),
        other.center,
        other.bounding_radius(),
    ) {
        return false;
    }

    rectangle
        .face_normals()
        .into_iter()
        .chain(other.face_normals())
        .filter(|axis| axis.length() > 0.0)
        .all(|axis| {
            let (min, max) = rectangle.project(axis);
            let (other_min, other_max) = other.project(axis);
            max >= other_min && other_max >= min
        })
}
