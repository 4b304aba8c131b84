//! Control loop around an opaque control module.
//!
//! Every controlled robot owns one control module instance. The module only ever sees a flat
//! exchange memory (see [`marshal`]). The rest of the simulator works with [`StepInput`] and
//! [`StepOutput`].

use std::fmt;

use once_cell::unsync::OnceCell;
use serde::Deserialize;
use thiserror::Error;

use crate::telemetry::WireFrame;

#[cfg(feature = "native-controller")]
mod ffi;
mod marshal;
mod native;

#[cfg(feature = "native-controller")]
pub use ffi::ForeignModule;
pub use marshal::ExchangeMemory;
pub use native::{Brain, NativeModule, Wanderer};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControllerError {
    #[error("control module is not initialized")]
    NotInitialized,
    #[error("control module is already initialized")]
    AlreadyInitialized,
    #[error("control module failed: {0}")]
    Module(String),
}

/// Sensor values handed to the control module once per tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepInput {
    /// Start cord pulled.
    pub jack: bool,
    /// Time-of-flight distance in meters.
    pub tof_distance: f64,
    /// Yaw change since the previous tick in radians.
    pub yaw_delta: f64,
    /// Encoder impulses counted since the previous tick.
    pub left_encoder: f64,
    pub right_encoder: f64,
    /// Absolute yaw in radians.
    pub yaw: f64,
    /// Accelerometer in m/s². Always zero in simulation.
    pub acceleration: [f64; 3],
    pub button: bool,
    /// Simulated time since the start of the match.
    pub clock_ms: u32,
}

/// Commands produced by the control module.
///
/// Motor ratios are in `[-1, 1]`. Actuator ratios are raw servo duty cycles as written by the
/// module, and calibrated into `[0, 1]` by [`ControlLoopAdapter::step`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepOutput {
    pub left_motor: f64,
    pub right_motor: f64,
    pub actuators: [f64; 2],
}

impl StepOutput {
    fn calibrated(&self, calibration: &ServoCalibration) -> Self {
        Self {
            left_motor: motor_ratio(self.left_motor),
            right_motor: motor_ratio(self.right_motor),
            actuators: self.actuators.map(|raw| calibration.calibrate(raw)),
        }
    }
}

fn motor_ratio(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Window of raw servo ratios mapped onto `[0, 1]`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct ServoCalibration {
    pub min: f64,
    pub max: f64,
}

impl ServoCalibration {
    pub fn calibrate(&self, raw: f64) -> f64 {
        if !raw.is_finite() || self.max <= self.min {
            return 0.0;
        }
        (raw.clamp(self.min, self.max) - self.min) / (self.max - self.min)
    }
}

impl Default for ServoCalibration {
    /// 1 ms to 2 ms pulses in a 20 ms period.
    fn default() -> Self {
        Self {
            min: 0.05,
            max: 0.10,
        }
    }
}

/// Boundary to a control module implementation.
pub trait ControlModule {
    /// Creates a fresh module instance and returns its boot log.
    fn instantiate(&mut self) -> Result<Vec<String>, ControllerError>;

    /// Runs one step. Inputs are read from and outputs written to `memory`.
    fn step(&mut self, memory: &mut ExchangeMemory) -> Result<Vec<String>, ControllerError>;

    /// Drops the current instance.
    fn release(&mut self) {}
}

/// Proof of a completed [`ControlLoopAdapter::init`]. Invalidated by a reset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ControlHandle {
    generation: u64,
}

pub struct ControlLoopAdapter {
    module: Box<dyn ControlModule>,
    calibration: ServoCalibration,
    handle: OnceCell<ControlHandle>,
    generation: u64,
    memory: ExchangeMemory,
}

impl ControlLoopAdapter {
    pub fn new(module: Box<dyn ControlModule>, calibration: ServoCalibration) -> Self {
        Self {
            module,
            calibration,
            handle: OnceCell::new(),
            generation: 0,
            memory: ExchangeMemory::default(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.handle.get().is_some()
    }

    pub fn init(&mut self) -> Result<(ControlHandle, Vec<String>), ControllerError> {
        if self.is_initialized() {
            return Err(ControllerError::AlreadyInitialized);
        }

        let logs = self.module.instantiate()?;
        let handle = ControlHandle {
            generation: self.generation,
        };
        self.handle
            .set(handle)
            .map_err(|_| ControllerError::AlreadyInitialized)?;
        log::debug!("control module initialized (generation {})", self.generation);

        Ok((handle, logs))
    }

    pub fn step(
        &mut self,
        handle: &ControlHandle,
        input: &StepInput,
        telemetry: Option<&WireFrame>,
    ) -> Result<(StepOutput, Vec<String>), ControllerError> {
        if self.handle.get() != Some(handle) {
            return Err(ControllerError::NotInitialized);
        }

        self.memory.write_input(input, telemetry);
        self.memory.clear_output();
        let logs = self.module.step(&mut self.memory)?;
        let output = self.memory.read_output().calibrated(&self.calibration);

        Ok((output, logs))
    }

    /// Releases the module instance. Every handle issued so far becomes invalid.
    pub fn reset(&mut self) {
        if self.handle.take().is_some() {
            self.module.release();
        }
        self.generation += 1;
        self.memory = ExchangeMemory::default();
    }
}

impl fmt::Debug for ControlLoopAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlLoopAdapter")
            .field("calibration", &self.calibration)
            .field("handle", &self.handle.get())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[derive(Clone, Default)]
    struct Echo;

    impl Brain for Echo {
        fn boot(&mut self) -> Vec<String> {
            vec!["echo booted".to_string()]
        }

        fn think(
            &mut self,
            input: &StepInput,
            telemetry: Option<&WireFrame>,
        ) -> (StepOutput, Vec<String>) {
            (
                StepOutput {
                    left_motor: input.tof_distance,
                    right_motor: -2.0,
                    actuators: [0.075, 0.2],
                },
                vec![format!(
                    "clock {} telemetry {}",
                    input.clock_ms,
                    telemetry.is_some()
                )],
            )
        }
    }

    struct Broken;

    impl ControlModule for Broken {
        fn instantiate(&mut self) -> Result<Vec<String>, ControllerError> {
            Err(ControllerError::Module("missing symbol".to_string()))
        }

        fn step(&mut self, _: &mut ExchangeMemory) -> Result<Vec<String>, ControllerError> {
            Ok(vec![])
        }
    }

    fn adapter() -> ControlLoopAdapter {
        ControlLoopAdapter::new(
            Box::new(NativeModule::new(Echo)),
            ServoCalibration::default(),
        )
    }

    fn input() -> StepInput {
        StepInput {
            tof_distance: 0.5,
            clock_ms: 8,
            ..Default::default()
        }
    }

    #[test]
    fn test_adapter_step_marshals_input_and_output() {
        let mut adapter = adapter();
        let (handle, boot_logs) = adapter.init().unwrap();
        assert_eq!(boot_logs, vec!["echo booted".to_string()]);

        let (output, logs) = adapter.step(&handle, &input(), None).unwrap();
        assert_abs_diff_eq!(output.left_motor, 0.5);
        assert_abs_diff_eq!(output.right_motor, -1.0);
        assert_abs_diff_eq!(output.actuators[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(output.actuators[1], 1.0);
        assert_eq!(logs, vec!["clock 8 telemetry false".to_string()]);
    }

    #[test]
    fn test_adapter_step_before_init_fails() {
        let mut adapter = adapter();
        let stale = ControlHandle { generation: 0 };
        assert_eq!(
            adapter.step(&stale, &input(), None),
            Err(ControllerError::NotInitialized)
        );
    }

    #[test]
    fn test_adapter_reset_invalidates_handle() {
        let mut adapter = adapter();
        let (handle, _) = adapter.init().unwrap();
        adapter.reset();
        assert!(!adapter.is_initialized());
        assert_eq!(
            adapter.step(&handle, &input(), None),
            Err(ControllerError::NotInitialized)
        );

        let (new_handle, _) = adapter.init().unwrap();
        assert_ne!(new_handle, handle);
        assert_eq!(
            adapter.step(&handle, &input(), None),
            Err(ControllerError::NotInitialized)
        );
        assert!(adapter.step(&new_handle, &input(), None).is_ok());
    }

    #[test]
    fn test_adapter_init_twice_fails() {
        let mut adapter = adapter();
        adapter.init().unwrap();
        assert_eq!(adapter.init(), Err(ControllerError::AlreadyInitialized));
    }

    #[test]
    fn test_adapter_init_failure_leaves_adapter_uninitialized() {
        let mut adapter = ControlLoopAdapter::new(Box::new(Broken), ServoCalibration::default());
        assert_eq!(
            adapter.init(),
            Err(ControllerError::Module("missing symbol".to_string()))
        );
        assert!(!adapter.is_initialized());
    }

    #[rstest]
    #[case::below_window(0.01, 0.0)]
    #[case::lower_bound(0.05, 0.0)]
    #[case::middle(0.075, 0.5)]
    #[case::upper_bound(0.10, 1.0)]
    #[case::above_window(0.5, 1.0)]
    #[case::not_a_number(f64::NAN, 0.0)]
    fn test_servo_calibration(#[case] raw: f64, #[case] expected: f64) {
        assert_abs_diff_eq!(
            ServoCalibration::default().calibrate(raw),
            expected,
            epsilon = 1e-9
        );
    }

    #[rstest]
    #[case(0.3, 0.3)]
    #[case(1.7, 1.0)]
    #[case(-3.0, -1.0)]
    #[case(f64::INFINITY, 0.0)]
    fn test_motor_ratio(#[case] raw: f64, #[case] expected: f64) {
        assert_abs_diff_eq!(motor_ratio(raw), expected);
    }
}
