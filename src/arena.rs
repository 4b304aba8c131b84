//! Tick-based orchestration of all robots in the arena.
//!
//! One call to [`Arena::step`] advances every robot by exactly one tick, in the order the robots
//! were added. Sensing and telemetry only ever read committed ticks, so a robot stepped later in
//! the same tick already sees where earlier robots moved to.

use std::time::Duration;

use thiserror::Error;

use crate::{
    config::{RobotSetup, SimulationConfig},
    controller::{ControlLoopAdapter, ControlModule, ControllerError, StepInput},
    domain::{
        Behavior, Color, ControlRecord, Environment, FieldObject, HasCollision, HistoryError,
        Kinematics, KinematicsError, Pose, Position, Robot, RobotId, RobotKind, RobotRegistry, Sequence,
        Shape, Tick, TickEdit,
    },
    telemetry::{TelemetryEncoder, WireFrame},
};

/// Reach of the shovel when picking up objects.
const SHOVEL_RADIUS: f64 = 0.03;
/// Calibrated actuator ratio above which the shovel holds objects.
const SHOVEL_LOWERED: f64 = 0.5;

#[derive(Error, Debug, PartialEq)]
pub enum ArenaError {
    #[error("robot {0} does not exist")]
    UnknownRobot(RobotId),
    #[error("the arena can only be edited before the first tick (current tick {0})")]
    NotAtTickZero(u64),
    #[error("start pose ({0:?}) lies outside the field")]
    OutsideField(Pose),
    #[error(transparent)]
    Controller(#[from] ControllerError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Kinematics(#[from] KinematicsError),
}

/// Outcome of one [`Arena::step`].
#[derive(Debug, Default, PartialEq)]
pub struct StepReport {
    /// Index of the tick that was produced.
    pub tick_index: u64,
    /// Number of telemetry frames handed to control modules.
    pub frames_sent: usize,
    /// Robots that could not commit a tick. They keep their last committed pose.
    pub failures: Vec<(RobotId, ArenaError)>,
}

struct Command {
    left: f64,
    right: f64,
    control: Option<ControlRecord>,
}

pub struct Arena {
    config: SimulationConfig,
    environment: Environment,
    robots: Vec<Robot>,
    registry: RobotRegistry,
    encoder: TelemetryEncoder,
    tick_index: u64,
}

impl Arena {
    /// Empty arena with the objects of the configuration. Robots are added separately.
    pub fn new(config: SimulationConfig) -> Self {
        let field = config.field();
        let objects = config
            .objects
            .iter()
            .enumerate()
            .map(|(id, o)| FieldObject::new(id, o.kind, Position::new(o.x, o.y)))
            .collect();
        Self {
            environment: Environment::new(field, objects),
            encoder: TelemetryEncoder::new(field, config.telemetry.seed),
            robots: Vec::new(),
            registry: RobotRegistry::default(),
            tick_index: 0,
            config,
        }
    }

    /// Arena populated with the robots of the configuration. `modules` provides the control
    /// module of each controlled robot.
    pub fn from_config(
        config: SimulationConfig,
        mut modules: impl FnMut(&RobotSetup) -> Box<dyn ControlModule>,
    ) -> Result<Self, ArenaError> {
        let setups = config.robots.clone();
        let mut arena = Self::new(config);
        for setup in &setups {
            match setup.kind {
                RobotKind::Controlled => {
                    arena.add_controlled(setup.color, setup.start_pose(), modules(setup))?
                }
                RobotKind::Sequential => arena.add_sequential(
                    setup.color,
                    setup.start_pose(),
                    setup.sequence.clone(),
                )?,
            };
        }
        Ok(arena)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    pub fn robot(&self, id: RobotId) -> Option<&Robot> {
        self.robots.iter().find(|r| r.id() == id)
    }

    pub fn current_tick_index(&self) -> u64 {
        self.tick_index
    }

    /// Simulated time since the start of the match.
    pub fn elapsed(&self) -> Duration {
        self.config.tick_duration() * u32::try_from(self.tick_index).unwrap_or(u32::MAX)
    }

    pub fn add_controlled(
        &mut self,
        color: Color,
        start: Pose,
        module: Box<dyn ControlModule>,
    ) -> Result<RobotId, ArenaError> {
        self.check_editable(start)?;
        let adapter = ControlLoopAdapter::new(module, self.config.servo_calibration);
        let id = self.registry.next_id();
        let (robot, boot_logs) = Robot::controlled(id, color, start, adapter)?;
        for line in &boot_logs {
            log::debug!("robot {id} boot: {line}");
        }
        log::info!("added controlled {color:?} robot {id}");
        self.robots.push(robot);
        Ok(id)
    }

    pub fn add_sequential(
        &mut self,
        color: Color,
        start: Pose,
        sequence: Sequence,
    ) -> Result<RobotId, ArenaError> {
        self.check_editable(start)?;
        let id = self.registry.next_id();
        self.robots
            .push(Robot::sequential(id, color, start, sequence));
        log::info!("added sequential {color:?} robot {id}");
        Ok(id)
    }

    pub fn remove_robot(&mut self, id: RobotId) -> Result<Robot, ArenaError> {
        if self.tick_index != 0 {
            return Err(ArenaError::NotAtTickZero(self.tick_index));
        }
        let idx = self
            .robots
            .iter()
            .position(|r| r.id() == id)
            .ok_or(ArenaError::UnknownRobot(id))?;
        log::info!("removed robot {id}");
        Ok(self.robots.remove(idx))
    }

    pub fn update_start_pose(&mut self, id: RobotId, edit: TickEdit) -> Result<(), ArenaError> {
        if self.tick_index != 0 {
            return Err(ArenaError::NotAtTickZero(self.tick_index));
        }
        let field = *self.environment.field();
        let robot = self
            .robots
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(ArenaError::UnknownRobot(id))?;
        if let Some(position) = edit.position {
            if !field.contains(position) {
                return Err(ArenaError::OutsideField(robot.pose().with_position(position)));
            }
        }
        Ok(robot.update_start_pose(edit)?)
    }

    /// Frame describing the first controlled robot of `color` and the first robot of the other
    /// color, with their real poses. `None` if there is no controlled robot of that color.
    ///
    /// Previewing a frame does not affect the frames handed to control modules.
    pub fn telemetry_frame(&self, color: Color) -> Option<WireFrame> {
        let (own, opponent) = self.telemetry_poses(color);
        TelemetryEncoder::exact(own.as_ref(), opponent.as_ref(), color)
    }

    /// Frame handed to a control module of `color`, randomized if configured.
    fn send_telemetry(&mut self, color: Color) -> Option<WireFrame> {
        let (own, opponent) = self.telemetry_poses(color);
        self.encoder.encode(
            own.as_ref(),
            opponent.as_ref(),
            color,
            self.config.telemetry.randomize,
        )
    }

    fn telemetry_poses(&self, color: Color) -> (Option<Pose>, Option<Pose>) {
        let own = self
            .robots
            .iter()
            .find(|r| r.kind() == RobotKind::Controlled && r.color() == color)
            .map(Robot::pose);
        let opponent = self
            .robots
            .iter()
            .find(|r| r.color() == color.opponent())
            .map(Robot::pose);
        (own, opponent)
    }

    pub fn step(&mut self) -> StepReport {
        let tick_index = self.tick_index;
        let mut report = StepReport {
            tick_index: tick_index + 1,
            ..Default::default()
        };

        for idx in 0..self.robots.len() {
            match self.step_robot(idx, tick_index) {
                Ok(frame_sent) => report.frames_sent += usize::from(frame_sent),
                Err(e) => {
                    let id = self.robots[idx].id();
                    log::warn!("robot {id} skipped tick {}: {e}", tick_index + 1);
                    report.failures.push((id, e));
                }
            }
        }

        self.tick_index += 1;
        log::trace!("tick {} done", self.tick_index);
        report
    }

    /// Back to tick 0: robots return to their start poses, control modules restart and objects
    /// are put back.
    pub fn reset(&mut self) -> Result<(), ArenaError> {
        self.tick_index = 0;
        self.environment.reset();
        self.encoder.reseed();

        let mut result = Ok(());
        for robot in &mut self.robots {
            match robot.reset() {
                Ok(logs) => {
                    for line in &logs {
                        log::debug!("robot {} boot: {line}", robot.id());
                    }
                }
                Err(e) => {
                    log::warn!("robot {} failed to restart: {e}", robot.id());
                    if result.is_ok() {
                        result = Err(e.into());
                    }
                }
            }
        }
        log::info!("arena reset");
        result
    }

    fn check_editable(&self, start: Pose) -> Result<(), ArenaError> {
        if self.tick_index != 0 {
            return Err(ArenaError::NotAtTickZero(self.tick_index));
        }
        if !self.environment.field().contains(start.position()) {
            return Err(ArenaError::OutsideField(start));
        }
        Ok(())
    }

    /// Returns whether a telemetry frame was handed to the robot.
    fn step_robot(&mut self, idx: usize, tick_index: u64) -> Result<bool, ArenaError> {
        let frame = match self.robots[idx].kind() {
            RobotKind::Controlled => self.send_telemetry(self.robots[idx].color()),
            RobotKind::Sequential => None,
        };

        let (before, rest) = self.robots.split_at_mut(idx);
        let Some((robot, after)) = rest.split_first_mut() else {
            return Ok(false);
        };
        let obstacles = before
            .iter()
            .chain(after.iter())
            .map(|r| r.shape())
            .collect::<Vec<_>>();

        let id = robot.id();
        let last = robot.history().last().clone();
        let previous = robot.history().previous().clone();
        let sensor_position = robot.distance_sensor_position(last.pose);

        let command = match robot.behavior_mut() {
            Behavior::Sequential(sequence) => {
                let (left, right) = sequence.ratios_at(tick_index);
                Command {
                    left,
                    right,
                    control: None,
                }
            }
            Behavior::Controlled { adapter, handle } => {
                let handle = handle.as_ref().ok_or(ControllerError::NotInitialized)?;
                // Pressed against a wall, the sensor sits beyond it.
                let tof_distance = if self.environment.field().contains(sensor_position) {
                    self.environment
                        .distance_to_next_obstacle(
                            sensor_position,
                            last.pose.orientation(),
                            self.config.tof_range,
                            &obstacles,
                        )
                        .unwrap_or(self.config.tof_range)
                } else {
                    0.0
                };
                let meters_per_impulse = self.config.meters_per_impulse();
                let clock_ms = tick_index * u64::from(self.config.tick_duration_ms);
                let input = StepInput {
                    jack: tick_index >= self.config.jack_release_tick,
                    tof_distance,
                    yaw_delta: (last.pose.orientation() - previous.pose.orientation())
                        .normalized()
                        .into(),
                    left_encoder: (last.left_odometer - previous.left_odometer)
                        / meters_per_impulse,
                    right_encoder: (last.right_odometer - previous.right_odometer)
                        / meters_per_impulse,
                    yaw: last.pose.orientation().into(),
                    acceleration: [0.0; 3],
                    button: false,
                    clock_ms: u32::try_from(clock_ms).unwrap_or(u32::MAX),
                };

                let (output, logs) = adapter.step(handle, &input, frame.as_ref())?;
                for line in &logs {
                    log::debug!("robot {id}: {line}");
                }
                Command {
                    left: output.left_motor,
                    right: output.right_motor,
                    control: Some(ControlRecord {
                        input,
                        output,
                        logs,
                    }),
                }
            }
        };

        let max_delta = self.config.max_wheel_delta();
        let left_delta = command.left.clamp(-1.0, 1.0) * max_delta;
        let right_delta = command.right.clamp(-1.0, 1.0) * max_delta;

        let kinematics = Kinematics::new(robot.dimensions().wheelbase, *self.environment.field())?;
        let moved = kinematics.advance(last.pose, left_delta, right_delta);
        let pose = if blocked(&obstacles, robot, last.pose, moved) {
            log::trace!("robot {id} blocked by another robot");
            last.pose
        } else {
            moved
        };

        let shovel_lowered = command
            .control
            .as_ref()
            .is_some_and(|c| c.output.actuators[0] > SHOVEL_LOWERED);
        let shovel = robot.shovel_point(pose);
        let carried = match last.carried {
            Some(object) if shovel_lowered => Some(object.moved_to(shovel)),
            Some(object) => {
                log::debug!("robot {id} released object {}", object.id());
                self.environment.put_object(object.moved_to(shovel));
                None
            }
            None if shovel_lowered => self
                .environment
                .take_object_at(shovel, SHOVEL_RADIUS)
                .map(|object| {
                    log::debug!("robot {id} picked up {:?} {}", object.kind(), object.id());
                    object.moved_to(shovel)
                }),
            None => None,
        };

        robot.commit(Tick {
            pose,
            left_odometer: last.left_odometer + left_delta,
            right_odometer: last.right_odometer + right_delta,
            control: command.control,
            carried,
        });

        Ok(frame.is_some())
    }
}

/// A move is blocked if it makes the robot overlap another robot it did not overlap before.
fn blocked(obstacles: &[Shape], robot: &Robot, from: Pose, to: Pose) -> bool {
    let before = Shape::Rectangle(robot.footprint(from));
    let after = Shape::Rectangle(robot.footprint(to));
    obstacles
        .iter()
        .any(|o| o.has_intersection(&after) && !o.has_intersection(&before))
}
