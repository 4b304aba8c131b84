//! Playing field with loose objects.

use serde::Deserialize;

use super::{
    geometry::distance_segment_segment, Angle, HasCollision, Pose, Position, Shape,
};

/// Rectangular field spanning `[0, width] x [0, height]`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Field {
    width: f64,
    height: f64,
}

impl Field {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn contains(&self, position: Position) -> bool {
        (0.0..=self.width).contains(&position.x()) && (0.0..=self.height).contains(&position.y())
    }

    /// Clamps the position of the pose into the field. The orientation is kept.
    pub fn clamp(&self, pose: Pose) -> Pose {
        pose.with_position(Position::new(
            pose.x().clamp(0.0, self.width),
            pose.y().clamp(0.0, self.height),
        ))
    }

    pub fn walls(&self) -> [(Position, Position); 4] {
        let bottom_left = Position::new(0.0, 0.0);
        let bottom_right = Position::new(self.width, 0.0);
        let top_right = Position::new(self.width, self.height);
        let top_left = Position::new(0.0, self.height);
        [
            (bottom_left, bottom_right),
            (bottom_right, top_right),
            (top_right, top_left),
            (top_left, bottom_left),
        ]
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Ord, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Plant,
    Pot,
}

impl ObjectKind {
    pub fn radius(&self) -> f64 {
        match self {
            ObjectKind::Plant => 0.025,
            ObjectKind::Pot => 0.04,
        }
    }
}

/// Loose object lying on the field or held by a robot.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct FieldObject {
    id: usize,
    kind: ObjectKind,
    position: Position,
}

impl FieldObject {
    pub fn new(id: usize, kind: ObjectKind, position: Position) -> Self {
        Self { id, kind, position }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn radius(&self) -> f64 {
        self.kind.radius()
    }

    /// Copy of the object placed at `position`.
    pub fn moved_to(&self, position: Position) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }
}

impl HasCollision for FieldObject {
    fn shape(&self) -> Shape {
        Shape::Circle {
            position: self.position,
            radius: self.radius(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Environment {
    field: Field,
    objects: Vec<FieldObject>,
    initial_objects: Vec<FieldObject>,
}

impl Environment {
    pub fn new(field: Field, objects: Vec<FieldObject>) -> Self {
        Self {
            field,
            initial_objects: objects.clone(),
            objects,
        }
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    /// Objects currently lying on the field.
    pub fn objects(&self) -> &[FieldObject] {
        &self.objects
    }

    /// Removes and returns the first free object overlapping the circle.
    pub fn take_object_at(&mut self, position: Position, radius: f64) -> Option<FieldObject> {
        let probe = Shape::Circle { position, radius };
        let idx = self
            .objects
            .iter()
            .position(|o| o.shape().has_intersection(&probe))?;
        Some(self.objects.remove(idx))
    }

    pub fn put_object(&mut self, object: FieldObject) {
        let position = self.field.clamp(Pose::new(object.position(), Angle::default()));
        self.objects.push(object.moved_to(position.position()));
    }

    /// Puts every object back to where it was at construction.
    pub fn reset(&mut self) {
        self.objects = self.initial_objects.clone();
    }

    /// Distance to the nearest wall, free object or one of the given obstacles along a ray of
    /// length `range`. `None` if nothing is hit within range.
    pub fn distance_to_next_obstacle(
        &self,
        position: Position,
        angle: Angle,
        range: f64,
        obstacles: &[Shape],
    ) -> Option<f64> {
        let end = position + Position::new(angle.cos(), angle.sin()) * range;

        let walls = self
            .field
            .walls()
            .into_iter()
            .filter_map(|(p1, p2)| distance_segment_segment(position, end, p1, p2));
        let objects = self
            .objects
            .iter()
            .filter_map(|o| o.shape().distance_along(position, end));
        let others = obstacles
            .iter()
            .filter_map(|s| s.distance_along(position, end));

        walls.chain(objects).chain(others).min_by(|a, b| a.total_cmp(b))
    }
}
