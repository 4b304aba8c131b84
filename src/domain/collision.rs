//! Collision detection based on basic shapes.

use super::{
    geometry::{
        circles_overlap, distance_segment_circle, distance_segment_segment,
        rectangle_circle_overlap, rectangle_rectangle_overlap,
    },
    Position, Rectangle,
};

pub trait HasCollision {
    fn has_collision(&self, other: &dyn HasCollision) -> bool {
        self.shape().has_intersection(&other.shape())
    }

    fn shape(&self) -> Shape;
}

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum Shape {
    Rectangle(Rectangle),
    Circle { position: Position, radius: f64 },
}

impl Shape {
    pub fn has_intersection(&self, other: &Shape) -> bool {
        match (self, other) {
            (
                Shape::Circle { position, radius },
                Shape::Circle {
                    position: other_position,
                    radius: other_radius,
                },
            ) => circles_overlap(*position, *radius, *other_position, *other_radius),
            (Shape::Circle { position, radius }, Shape::Rectangle(rectangle))
            | (Shape::Rectangle(rectangle), Shape::Circle { position, radius }) => {
                rectangle_circle_overlap(rectangle, *position, *radius)
            }
            (Shape::Rectangle(rectangle), Shape::Rectangle(other)) => {
                rectangle_rectangle_overlap(rectangle, other)
            }
        }
    }

    /// Distance from `origin` along the segment to `end` until the shape's outline is hit.
    pub fn distance_along(&self, origin: Position, end: Position) -> Option<f64> {
        match self {
            Shape::Circle { position, radius } => {
                distance_segment_circle(origin, end, *position, *radius)
            }
            Shape::Rectangle(rectangle) => rectangle
                .edges()
                .into_iter()
                .filter_map(|(p1, p2)| distance_segment_segment(origin, end, p1, p2))
                .min_by(|a, b| a.total_cmp(b)),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::super::Angle;
    use super::*;

    fn robot_like(x: f64, y: f64) -> Shape {
        Shape::Rectangle(Rectangle::new(Position::new(x, y), Angle::new(0.0), 0.3, 0.2))
    }

    fn object_like(x: f64, y: f64) -> Shape {
        Shape::Circle {
            position: Position::new(x, y),
            radius: 0.05,
        }
    }

    #[rstest]
    #[case::rectangles_apart(robot_like(0.0, 0.0), robot_like(1.0, 0.0), false)]
    #[case::rectangles_overlapping(robot_like(0.0, 0.0), robot_like(0.2, 0.1), true)]
    #[case::rectangle_circle(robot_like(0.0, 0.0), object_like(0.18, 0.0), true)]
    #[case::circle_rectangle(object_like(0.18, 0.0), robot_like(0.0, 0.0), true)]
    #[case::circle_rectangle_apart(object_like(0.3, 0.0), robot_like(0.0, 0.0), false)]
    #[case::circles(object_like(0.0, 0.0), object_like(0.09, 0.0), true)]
    fn test_shape_has_intersection(
        #[case] shape: Shape,
        #[case] other: Shape,
        #[case] expected: bool,
    ) {
        assert_eq!(shape.has_intersection(&other), expected);
    }

    #[test]
    fn test_shape_distance_along_rectangle_takes_nearest_edge() {
        let distance = robot_like(1.0, 0.0)
            .distance_along(Position::new(0.0, 0.0), Position::new(2.0, 0.0))
            .unwrap();
        assert_abs_diff_eq!(distance, 0.85, epsilon = 1e-9);
    }

    #[test]
    fn test_shape_distance_along_circle() {
        let distance = object_like(1.0, 0.0)
            .distance_along(Position::new(0.0, 0.0), Position::new(2.0, 0.0))
            .unwrap();
        assert_abs_diff_eq!(distance, 0.95, epsilon = 1e-9);
    }

    #[test]
    fn test_shape_distance_along_misses() {
        assert_eq!(
            robot_like(1.0, 1.0).distance_along(Position::new(0.0, 0.0), Position::new(2.0, 0.0)),
            None
        );
    }
}
