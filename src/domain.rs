//! The domain module encapsulates the core rules of the arena. It defines robots, the field
//! they move on and the geometry and kinematics governing their interactions.
//!
//! Apart from the control module boundary, nothing here depends on how the simulation is driven.

mod basis;
mod collision;
mod environment;
pub mod geometry;
mod history;
pub mod kinematics;
mod robot;

pub use basis::{Angle, Pose, Position};
pub use collision::{HasCollision, Shape};
pub use environment::{Environment, Field, FieldObject, ObjectKind};
pub use geometry::Rectangle;
pub use history::{ControlRecord, HistoryError, StepHistory, Tick, TickEdit};
pub use kinematics::{build_move, Kinematics, KinematicsError};
pub use robot::{
    Behavior, Color, Dimensions, Robot, RobotId, RobotKind, RobotRegistry, Sequence, SequenceStep,
};
