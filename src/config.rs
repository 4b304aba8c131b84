//! Simulation parameters, loaded from a JSON file or taken from the defaults.

use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    controller::ServoCalibration,
    domain::{Angle, Color, Field, ObjectKind, Pose, Position, RobotKind, Sequence, SequenceStep},
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid configuration file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Field extent in meters.
    pub field_width: f64,
    pub field_height: f64,
    pub tick_duration_ms: u32,
    /// Wheel speed at a motor ratio of 1, in m/s.
    pub max_speed: f64,
    pub wheel_circumference: f64,
    pub impulses_per_revolution: f64,
    pub servo_calibration: ServoCalibration,
    /// Reach of the time-of-flight sensor in meters.
    pub tof_range: f64,
    /// First tick at which the start cord is considered pulled.
    pub jack_release_tick: u64,
    /// Number of ticks the driver runs before stopping.
    pub match_ticks: u64,
    pub telemetry: TelemetryConfig,
    pub robots: Vec<RobotSetup>,
    pub objects: Vec<ObjectSetup>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Send synthetic coordinates instead of the real poses.
    pub randomize: bool,
    pub seed: u64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RobotSetup {
    pub kind: RobotKind,
    pub color: Color,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub orientation_deg: f64,
    /// Only used by sequential robots.
    #[serde(default)]
    pub sequence: Sequence,
}

impl RobotSetup {
    pub fn start_pose(&self) -> Pose {
        Pose::new(
            Position::new(self.x, self.y),
            Angle::from_deg(self.orientation_deg),
        )
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ObjectSetup {
    pub kind: ObjectKind,
    pub x: f64,
    pub y: f64,
}

impl SimulationConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("field_width", self.field_width),
            ("field_height", self.field_height),
            ("max_speed", self.max_speed),
            ("wheel_circumference", self.wheel_circumference),
            ("impulses_per_revolution", self.impulses_per_revolution),
            ("tof_range", self.tof_range),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, v)| !(*v > 0.0 && v.is_finite())) {
            return Err(ConfigError::Invalid(format!(
                "{name} must be positive, got {value}"
            )));
        }
        if self.tick_duration_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_duration_ms must be positive".to_string(),
            ));
        }
        if self.servo_calibration.max <= self.servo_calibration.min {
            return Err(ConfigError::Invalid(format!(
                "servo calibration window [{}, {}] is empty",
                self.servo_calibration.min, self.servo_calibration.max
            )));
        }
        let field = self.field();
        if let Some(robot) = self
            .robots
            .iter()
            .find(|r| !field.contains(r.start_pose().position()))
        {
            return Err(ConfigError::Invalid(format!(
                "{:?} robot starts outside the field at ({}, {})",
                robot.color, robot.x, robot.y
            )));
        }
        Ok(())
    }

    pub fn field(&self) -> Field {
        Field::new(self.field_width, self.field_height)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_duration_ms.into())
    }

    /// Distance a wheel travels per tick at a motor ratio of 1.
    pub fn max_wheel_delta(&self) -> f64 {
        self.max_speed * self.tick_duration().as_secs_f64()
    }

    pub fn meters_per_impulse(&self) -> f64 {
        self.wheel_circumference / self.impulses_per_revolution
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            field_width: 3.0,
            field_height: 2.0,
            tick_duration_ms: 4,
            max_speed: 0.5,
            wheel_circumference: 0.06 * std::f64::consts::PI,
            impulses_per_revolution: 1024.0,
            servo_calibration: ServoCalibration::default(),
            tof_range: 2.0,
            jack_release_tick: 250,
            match_ticks: 25_000,
            telemetry: TelemetryConfig {
                randomize: false,
                seed: 0x5EED,
            },
            robots: vec![
                RobotSetup {
                    kind: RobotKind::Controlled,
                    color: Color::Blue,
                    x: 0.3,
                    y: 1.0,
                    orientation_deg: 0.0,
                    sequence: Sequence::default(),
                },
                RobotSetup {
                    kind: RobotKind::Sequential,
                    color: Color::Yellow,
                    x: 2.7,
                    y: 1.0,
                    orientation_deg: 180.0,
                    sequence: Sequence::new(vec![
                        SequenceStep {
                            left: 0.0,
                            right: 0.0,
                            ticks: 250,
                        },
                        SequenceStep {
                            left: 0.8,
                            right: 0.8,
                            ticks: 500,
                        },
                        SequenceStep {
                            left: -0.4,
                            right: 0.4,
                            ticks: 200,
                        },
                        SequenceStep {
                            left: 0.8,
                            right: 0.8,
                            ticks: 500,
                        },
                    ]),
                },
            ],
            objects: [(1.0, 0.7), (1.0, 1.3), (1.5, 0.5), (1.5, 1.5), (2.0, 0.7), (2.0, 1.3)]
                .into_iter()
                .map(|(x, y)| ObjectSetup {
                    kind: ObjectKind::Plant,
                    x,
                    y,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_abs_diff_eq!(config.max_wheel_delta(), 0.002, epsilon = 1e-12);
        assert_eq!(config.tick_duration(), Duration::from_millis(4));
    }

    #[test]
    fn test_config_from_json_uses_defaults_for_missing_fields() {
        let config = SimulationConfig::from_json(
            r#"{
                "tick_duration_ms": 10,
                "telemetry": { "randomize": true },
                "robots": [
                    { "kind": "controlled", "color": "yellow", "x": 1.0, "y": 0.5 },
                    {
                        "kind": "sequential",
                        "color": "blue",
                        "x": 2.0,
                        "y": 1.5,
                        "orientation_deg": 90.0,
                        "sequence": [{ "left": 1.0, "right": 1.0, "ticks": 3 }]
                    }
                ],
                "objects": [{ "kind": "pot", "x": 1.5, "y": 1.0 }]
            }"#,
        )
        .unwrap();

        assert_eq!(config.tick_duration_ms, 10);
        assert_eq!(config.field_width, 3.0);
        assert!(config.telemetry.randomize);
        assert_eq!(config.telemetry.seed, 0);
        assert_eq!(config.robots.len(), 2);
        assert_eq!(config.robots[0].color, Color::Yellow);
        assert_eq!(config.robots[1].sequence.ratios_at(2), (1.0, 1.0));
        assert_eq!(config.objects[0].kind, ObjectKind::Pot);
    }

    #[rstest]
    #[case::zero_tick(r#"{ "tick_duration_ms": 0 }"#)]
    #[case::negative_speed(r#"{ "max_speed": -1.0 }"#)]
    #[case::empty_servo_window(r#"{ "servo_calibration": { "min": 0.1, "max": 0.1 } }"#)]
    #[case::robot_off_field(
        r#"{ "robots": [{ "kind": "controlled", "color": "blue", "x": 4.0, "y": 1.0 }] }"#
    )]
    fn test_config_validation(#[case] json: &str) {
        assert!(matches!(
            SimulationConfig::from_json(json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        assert!(matches!(
            SimulationConfig::from_json(r#"{ "field_depth": 1.0 }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_config_from_missing_file() {
        assert!(matches!(
            SimulationConfig::from_file("does/not/exist.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
