//! Control modules implemented in Rust and hosted in-process.

use super::{
    ControlModule, ControllerError, ExchangeMemory, ServoCalibration, StepInput, StepOutput,
};
use crate::telemetry::WireFrame;

/// Decision logic of an in-process control module.
pub trait Brain {
    fn boot(&mut self) -> Vec<String> {
        Vec::new()
    }

    fn think(&mut self, input: &StepInput, telemetry: Option<&WireFrame>)
        -> (StepOutput, Vec<String>);
}

/// Hosts a [`Brain`] behind the exchange memory boundary. Every instantiation starts from a
/// copy of the prototype.
#[derive(Clone, Debug)]
pub struct NativeModule<B> {
    prototype: B,
    instance: Option<B>,
}

impl<B: Brain + Clone> NativeModule<B> {
    pub fn new(prototype: B) -> Self {
        Self {
            prototype,
            instance: None,
        }
    }
}

impl<B: Brain + Clone> ControlModule for NativeModule<B> {
    fn instantiate(&mut self) -> Result<Vec<String>, ControllerError> {
        let mut brain = self.prototype.clone();
        let logs = brain.boot();
        self.instance = Some(brain);
        Ok(logs)
    }

    fn step(&mut self, memory: &mut ExchangeMemory) -> Result<Vec<String>, ControllerError> {
        let brain = self
            .instance
            .as_mut()
            .ok_or(ControllerError::NotInitialized)?;
        let (input, telemetry) = memory.read_input();
        let (output, logs) = brain.think(&input, telemetry.as_ref());
        memory.write_output(&output);
        Ok(logs)
    }

    fn release(&mut self) {
        self.instance = None;
    }
}

/// Drives straight ahead with the shovel lowered and turns away from anything the distance
/// sensor sees. Raising the shovel while turning drops whatever was collected.
#[derive(Clone, Debug)]
pub struct Wanderer {
    cruise: f64,
    obstacle_distance: f64,
    turn_duration_ms: u32,
    calibration: ServoCalibration,
    turning_until_ms: Option<u32>,
    started: bool,
}

impl Wanderer {
    pub fn new(calibration: ServoCalibration) -> Self {
        Self {
            cruise: 0.6,
            obstacle_distance: 0.2,
            turn_duration_ms: 600,
            calibration,
            turning_until_ms: None,
            started: false,
        }
    }

    fn shovel(&self, lowered: bool) -> [f64; 2] {
        let raw = if lowered {
            self.calibration.max
        } else {
            self.calibration.min
        };
        [raw, self.calibration.min]
    }
}

impl Default for Wanderer {
    fn default() -> Self {
        Self::new(ServoCalibration::default())
    }
}

impl Brain for Wanderer {
    fn boot(&mut self) -> Vec<String> {
        vec![format!(
            "wanderer ready (cruise {:.2}, obstacle distance {:.2} m)",
            self.cruise, self.obstacle_distance
        )]
    }

    fn think(
        &mut self,
        input: &StepInput,
        telemetry: Option<&WireFrame>,
    ) -> (StepOutput, Vec<String>) {
        let mut logs = vec![];

        if !input.jack {
            return (
                StepOutput {
                    actuators: self.shovel(false),
                    ..Default::default()
                },
                logs,
            );
        }

        if !self.started {
            self.started = true;
            logs.push(format!("jack pulled at {} ms", input.clock_ms));
        }

        if let Some(until) = self.turning_until_ms {
            if input.clock_ms < until {
                return (
                    StepOutput {
                        left_motor: -self.cruise / 2.0,
                        right_motor: self.cruise / 2.0,
                        actuators: self.shovel(false),
                    },
                    logs,
                );
            }
            self.turning_until_ms = None;
        }

        if input.tof_distance < self.obstacle_distance {
            self.turning_until_ms = Some(input.clock_ms + self.turn_duration_ms);
            let position = telemetry
                .and_then(WireFrame::payload)
                .and_then(|payload| payload.own)
                .map(|own| format!(" at ({} cm, {} cm)", own.x_cm, own.y_cm))
                .unwrap_or_default();
            logs.push(format!(
                "obstacle in {:.2} m{position}, turning",
                input.tof_distance
            ));
            return (
                StepOutput {
                    actuators: self.shovel(false),
                    ..Default::default()
                },
                logs,
            );
        }

        (
            StepOutput {
                left_motor: self.cruise,
                right_motor: self.cruise,
                actuators: self.shovel(true),
            },
            logs,
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    use super::*;

    fn input(jack: bool, tof_distance: f64, clock_ms: u32) -> StepInput {
        StepInput {
            jack,
            tof_distance,
            clock_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_wanderer_waits_for_jack() {
        let mut wanderer = Wanderer::default();
        let (output, logs) = wanderer.think(&input(false, 2.0, 0), None);
        assert_eq!(output.left_motor, 0.0);
        assert_eq!(output.right_motor, 0.0);
        assert!(logs.is_empty());
    }

    #[test]
    fn test_wanderer_cruises_with_shovel_lowered() {
        let mut wanderer = Wanderer::default();
        let (output, logs) = wanderer.think(&input(true, 2.0, 100), None);
        assert_abs_diff_eq!(output.left_motor, 0.6);
        assert_abs_diff_eq!(output.right_motor, 0.6);
        assert_abs_diff_eq!(output.actuators[0], ServoCalibration::default().max);
        assert_eq!(logs, vec!["jack pulled at 100 ms".to_string()]);
    }

    #[test]
    fn test_wanderer_turns_away_from_obstacle() {
        let mut wanderer = Wanderer::default();
        wanderer.think(&input(true, 2.0, 0), None);

        let (stop, logs) = wanderer.think(&input(true, 0.1, 4), None);
        assert_eq!(stop.left_motor, 0.0);
        assert_eq!(logs, vec!["obstacle in 0.10 m, turning".to_string()]);

        let (turn, _) = wanderer.think(&input(true, 2.0, 8), None);
        assert!(turn.left_motor < 0.0 && turn.right_motor > 0.0);

        let (cruise, _) = wanderer.think(&input(true, 2.0, 604), None);
        assert_abs_diff_eq!(cruise.left_motor, 0.6);
    }

    #[test]
    fn test_native_module_requires_instance() {
        let mut module = NativeModule::new(Wanderer::default());
        let mut memory = ExchangeMemory::default();
        assert_eq!(module.step(&mut memory), Err(ControllerError::NotInitialized));

        module.instantiate().unwrap();
        assert!(module.step(&mut memory).is_ok());

        module.release();
        assert_eq!(module.step(&mut memory), Err(ControllerError::NotInitialized));
    }
}
