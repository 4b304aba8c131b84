//! Differential-drive robots.
//!
//! Both kinds of robots share geometry and trajectory handling. They only differ in how they
//! decide on their wheel commands: controlled robots ask their control module, sequential robots
//! replay a fixed motion sequence.

use std::fmt;

use serde::Deserialize;

use super::{
    FieldObject, HasCollision, HistoryError, Pose, Position, Rectangle, Shape, StepHistory, Tick,
    TickEdit,
};
use crate::controller::{ControlHandle, ControlLoopAdapter, ControllerError};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RobotId(u32);

impl fmt::Display for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out robot ids that are unique within one arena.
#[derive(Clone, Debug, Default)]
pub struct RobotRegistry {
    next: u32,
}

impl RobotRegistry {
    pub fn next_id(&mut self) -> RobotId {
        let id = RobotId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Blue,
    Yellow,
}

impl Color {
    pub fn bit(&self) -> bool {
        *self == Color::Yellow
    }

    pub fn from_bit(bit: bool) -> Self {
        if bit {
            Color::Yellow
        } else {
            Color::Blue
        }
    }

    pub fn opponent(&self) -> Self {
        match self {
            Color::Blue => Color::Yellow,
            Color::Yellow => Color::Blue,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Ord, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum RobotKind {
    Controlled,
    Sequential,
}

/// Footprint and drive geometry. The robot's front is facing along its heading; all offsets are
/// measured from the center of the wheel axle.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub wheelbase: f64,
    /// Distance from the axle center to the point where carried objects are held.
    pub shovel_offset: f64,
}

impl RobotKind {
    pub const fn dimensions(&self) -> Dimensions {
        match self {
            RobotKind::Controlled => Dimensions {
                length: 0.30,
                width: 0.25,
                wheelbase: 0.22,
                shovel_offset: 0.19,
            },
            RobotKind::Sequential => Dimensions {
                length: 0.15,
                width: 0.12,
                wheelbase: 0.10,
                shovel_offset: 0.09,
            },
        }
    }
}

/// One leg of a motion sequence: motor ratios held for a number of ticks.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct SequenceStep {
    pub left: f64,
    pub right: f64,
    pub ticks: u32,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Sequence(Vec<SequenceStep>);

impl Sequence {
    pub fn new(steps: Vec<SequenceStep>) -> Self {
        Self(steps)
    }

    /// Motor ratios commanded during tick `tick_index`. Standing still once the sequence ends.
    pub fn ratios_at(&self, tick_index: u64) -> (f64, f64) {
        let mut start = 0u64;
        for step in &self.0 {
            let end = start + u64::from(step.ticks);
            if tick_index < end {
                return (step.left, step.right);
            }
            start = end;
        }
        (0.0, 0.0)
    }
}

#[derive(Debug)]
pub enum Behavior {
    Controlled {
        adapter: ControlLoopAdapter,
        handle: Option<ControlHandle>,
    },
    Sequential(Sequence),
}

#[derive(Debug)]
pub struct Robot {
    id: RobotId,
    color: Color,
    kind: RobotKind,
    history: StepHistory,
    behavior: Behavior,
}

impl Robot {
    /// Creates a controlled robot and initializes its control module. Returns the boot log.
    pub fn controlled(
        id: RobotId,
        color: Color,
        start: Pose,
        mut adapter: ControlLoopAdapter,
    ) -> Result<(Self, Vec<String>), ControllerError> {
        let (handle, logs) = adapter.init()?;
        let robot = Self {
            id,
            color,
            kind: RobotKind::Controlled,
            history: StepHistory::new(Tick::initial(start)),
            behavior: Behavior::Controlled {
                adapter,
                handle: Some(handle),
            },
        };
        Ok((robot, logs))
    }

    pub fn sequential(id: RobotId, color: Color, start: Pose, sequence: Sequence) -> Self {
        Self {
            id,
            color,
            kind: RobotKind::Sequential,
            history: StepHistory::new(Tick::initial(start)),
            behavior: Behavior::Sequential(sequence),
        }
    }

    pub fn id(&self) -> RobotId {
        self.id
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn kind(&self) -> RobotKind {
        self.kind
    }

    pub fn dimensions(&self) -> Dimensions {
        self.kind.dimensions()
    }

    pub fn history(&self) -> &StepHistory {
        &self.history
    }

    /// Last committed pose.
    pub fn pose(&self) -> Pose {
        self.history.last().pose
    }

    pub fn carried(&self) -> Option<&FieldObject> {
        self.history.last().carried.as_ref()
    }

    pub fn footprint(&self, pose: Pose) -> Rectangle {
        let dimensions = self.dimensions();
        Rectangle::new(
            pose.position(),
            pose.orientation(),
            dimensions.length,
            dimensions.width,
        )
    }

    pub fn shovel_point(&self, pose: Pose) -> Position {
        pose.to_field(Position::new(self.dimensions().shovel_offset, 0.0))
    }

    /// Where the time-of-flight sensor sits: the middle of the front face.
    pub fn distance_sensor_position(&self, pose: Pose) -> Position {
        pose.to_field(Position::new(self.dimensions().length / 2.0, 0.0))
    }

    pub fn behavior_mut(&mut self) -> &mut Behavior {
        &mut self.behavior
    }

    pub fn commit(&mut self, tick: Tick) {
        self.history.append(tick);
    }

    pub fn update_start_pose(&mut self, edit: TickEdit) -> Result<(), HistoryError> {
        self.history.update_tick0(edit)
    }

    /// Drops every tick but the first and restarts the control module. Returns its boot log.
    pub fn reset(&mut self) -> Result<Vec<String>, ControllerError> {
        self.history.reset();
        match &mut self.behavior {
            Behavior::Controlled { adapter, handle } => {
                *handle = None;
                adapter.reset();
                let (new_handle, logs) = adapter.init()?;
                *handle = Some(new_handle);
                Ok(logs)
            }
            Behavior::Sequential(_) => Ok(Vec::new()),
        }
    }
}

impl HasCollision for Robot {
    fn shape(&self) -> Shape {
        Shape::Rectangle(self.footprint(self.pose()))
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{
        controller::{NativeModule, ServoCalibration, Wanderer},
        domain::Angle,
    };

    fn start() -> Pose {
        Pose::new(Position::new(1.0, 1.0), Angle::new(0.5 * PI))
    }

    fn controlled() -> Robot {
        let adapter = ControlLoopAdapter::new(
            Box::new(NativeModule::new(Wanderer::default())),
            ServoCalibration::default(),
        );
        Robot::controlled(RobotId(0), Color::Blue, start(), adapter)
            .unwrap()
            .0
    }

    #[test]
    fn test_registry_hands_out_unique_ids() {
        let mut registry = RobotRegistry::default();
        let ids = (0..3).map(|_| registry.next_id()).collect::<Vec<_>>();
        assert_eq!(ids, vec![RobotId(0), RobotId(1), RobotId(2)]);
    }

    #[rstest]
    #[case(0, (0.5, 0.5))]
    #[case(9, (0.5, 0.5))]
    #[case(10, (0.3, -0.3))]
    #[case(14, (0.3, -0.3))]
    #[case(15, (0.0, 0.0))]
    #[case(1000, (0.0, 0.0))]
    fn test_sequence_ratios_at(#[case] tick_index: u64, #[case] expected: (f64, f64)) {
        let sequence = Sequence::new(vec![
            SequenceStep {
                left: 0.5,
                right: 0.5,
                ticks: 10,
            },
            SequenceStep {
                left: 0.3,
                right: -0.3,
                ticks: 5,
            },
        ]);
        assert_eq!(sequence.ratios_at(tick_index), expected);
    }

    #[test]
    fn test_robot_shovel_point_and_sensor() {
        let robot = controlled();
        assert_abs_diff_eq!(
            robot.shovel_point(robot.pose()),
            Position::new(1.0, 1.19),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            robot.distance_sensor_position(robot.pose()),
            Position::new(1.0, 1.15),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_robot_reset_restores_start_and_reinitializes() {
        let mut robot = controlled();
        let Behavior::Controlled {
            handle: Some(first), ..
        } = robot.behavior_mut()
        else {
            panic!("controlled robot without handle");
        };
        let first = *first;

        robot.commit(Tick::initial(Pose::new(Position::new(2.0, 1.0), Angle::new(0.0))));
        let logs = robot.reset().unwrap();

        assert_eq!(robot.history().len(), 1);
        assert_eq!(robot.pose(), start());
        assert_eq!(logs.len(), 1);
        let Behavior::Controlled {
            handle: Some(second),
            ..
        } = robot.behavior_mut()
        else {
            panic!("controlled robot without handle");
        };
        assert_ne!(*second, first);
    }

    #[test]
    fn test_robot_update_start_pose_only_before_first_tick() {
        let mut robot = Robot::sequential(RobotId(1), Color::Yellow, start(), Sequence::default());
        robot
            .update_start_pose(TickEdit {
                position: Some(Position::new(0.2, 0.3)),
                orientation: None,
            })
            .unwrap();
        assert_eq!(robot.pose().position(), Position::new(0.2, 0.3));

        robot.commit(Tick::initial(robot.pose()));
        assert_eq!(
            robot.update_start_pose(TickEdit::default()),
            Err(HistoryError::NotEditable { len: 2 })
        );
    }

    #[test]
    fn test_color_bits() {
        assert_eq!(Color::from_bit(Color::Yellow.bit()), Color::Yellow);
        assert_eq!(Color::from_bit(Color::Blue.bit()), Color::Blue);
        assert_eq!(Color::Blue.opponent(), Color::Yellow);
    }
}
