//! Byte layout of the memory shared with a control module.
//!
//! All values are little-endian. Floats are stored as `f32`.
//!
//! | offset | size | content                   |
//! |--------|------|---------------------------|
//! | 0      | 1    | jack                      |
//! | 1      | 1    | button                    |
//! | 2      | 1    | telemetry frame present   |
//! | 3      | 9    | telemetry frame           |
//! | 12     | 4    | time-of-flight distance   |
//! | 16     | 4    | yaw delta                 |
//! | 20     | 4    | yaw                       |
//! | 24     | 4    | left encoder impulses     |
//! | 28     | 4    | right encoder impulses    |
//! | 32     | 12   | acceleration x, y, z      |
//! | 44     | 4    | clock in ms (u32)         |
//! | 48     | 4    | left motor ratio          |
//! | 52     | 4    | right motor ratio         |
//! | 56     | 8    | raw servo ratios          |

use crate::telemetry::{WireFrame, FRAME_LEN};

use super::{StepInput, StepOutput};

const MEMORY_LEN: usize = 64;

const JACK: usize = 0;
const BUTTON: usize = 1;
const TELEMETRY_PRESENT: usize = 2;
const TELEMETRY: usize = 3;
const TOF_DISTANCE: usize = 12;
const YAW_DELTA: usize = 16;
const YAW: usize = 20;
const LEFT_ENCODER: usize = 24;
const RIGHT_ENCODER: usize = 28;
const ACCELERATION: usize = 32;
const CLOCK_MS: usize = 44;
const LEFT_MOTOR: usize = 48;
const RIGHT_MOTOR: usize = 52;
const ACTUATORS: usize = 56;
const OUTPUT: usize = LEFT_MOTOR;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeMemory([u8; MEMORY_LEN]);

impl Default for ExchangeMemory {
    fn default() -> Self {
        Self([0; MEMORY_LEN])
    }
}

impl ExchangeMemory {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    pub fn write_input(&mut self, input: &StepInput, telemetry: Option<&WireFrame>) {
        self.0[JACK] = input.jack.into();
        self.0[BUTTON] = input.button.into();
        self.0[TELEMETRY_PRESENT] = telemetry.is_some().into();
        match telemetry {
            Some(frame) => self.0[TELEMETRY..TELEMETRY + FRAME_LEN].copy_from_slice(frame.as_bytes()),
            None => self.0[TELEMETRY..TELEMETRY + FRAME_LEN].fill(0),
        }
        self.write_f32(TOF_DISTANCE, input.tof_distance);
        self.write_f32(YAW_DELTA, input.yaw_delta);
        self.write_f32(YAW, input.yaw);
        self.write_f32(LEFT_ENCODER, input.left_encoder);
        self.write_f32(RIGHT_ENCODER, input.right_encoder);
        for (i, value) in input.acceleration.iter().enumerate() {
            self.write_f32(ACCELERATION + 4 * i, *value);
        }
        self.0[CLOCK_MS..CLOCK_MS + 4].copy_from_slice(&input.clock_ms.to_le_bytes());
    }

    pub fn read_input(&self) -> (StepInput, Option<WireFrame>) {
        let mut acceleration = [0.0; 3];
        for (i, value) in acceleration.iter_mut().enumerate() {
            *value = self.read_f32(ACCELERATION + 4 * i);
        }
        let mut clock = [0; 4];
        clock.copy_from_slice(&self.0[CLOCK_MS..CLOCK_MS + 4]);

        let input = StepInput {
            jack: self.0[JACK] != 0,
            tof_distance: self.read_f32(TOF_DISTANCE),
            yaw_delta: self.read_f32(YAW_DELTA),
            left_encoder: self.read_f32(LEFT_ENCODER),
            right_encoder: self.read_f32(RIGHT_ENCODER),
            yaw: self.read_f32(YAW),
            acceleration,
            button: self.0[BUTTON] != 0,
            clock_ms: u32::from_le_bytes(clock),
        };

        let telemetry = (self.0[TELEMETRY_PRESENT] != 0).then(|| {
            let mut frame = [0; FRAME_LEN];
            frame.copy_from_slice(&self.0[TELEMETRY..TELEMETRY + FRAME_LEN]);
            WireFrame::from_bytes(frame)
        });

        (input, telemetry)
    }

    pub fn write_output(&mut self, output: &StepOutput) {
        self.write_f32(LEFT_MOTOR, output.left_motor);
        self.write_f32(RIGHT_MOTOR, output.right_motor);
        for (i, value) in output.actuators.iter().enumerate() {
            self.write_f32(ACTUATORS + 4 * i, *value);
        }
    }

    pub fn read_output(&self) -> StepOutput {
        StepOutput {
            left_motor: self.read_f32(LEFT_MOTOR),
            right_motor: self.read_f32(RIGHT_MOTOR),
            actuators: [self.read_f32(ACTUATORS), self.read_f32(ACTUATORS + 4)],
        }
    }

    pub fn clear_output(&mut self) {
        self.0[OUTPUT..].fill(0);
    }

    fn write_f32(&mut self, offset: usize, value: f64) {
        self.0[offset..offset + 4].copy_from_slice(&(value as f32).to_le_bytes());
    }

    fn read_f32(&self, offset: usize) -> f64 {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.0[offset..offset + 4]);
        f32::from_le_bytes(bytes).into()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_exchange_memory_input_layout() {
        let mut memory = ExchangeMemory::default();
        memory.write_input(
            &StepInput {
                jack: true,
                tof_distance: 1.5,
                left_encoder: -2.0,
                clock_ms: 0x0102_0304,
                ..Default::default()
            },
            None,
        );

        let bytes = memory.as_bytes();
        assert_eq!(bytes[JACK], 1);
        assert_eq!(bytes[TELEMETRY_PRESENT], 0);
        assert_eq!(&bytes[TOF_DISTANCE..TOF_DISTANCE + 4], &1.5f32.to_le_bytes());
        assert_eq!(&bytes[LEFT_ENCODER..LEFT_ENCODER + 4], &[0x00, 0x00, 0x00, 0xC0]);
        assert_eq!(&bytes[CLOCK_MS..CLOCK_MS + 4], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_exchange_memory_module_side_sees_engine_input() {
        let frame = WireFrame::from_bytes([0xFF, 1, 2, 3, 4, 5, 6, 7, 28]);
        let input = StepInput {
            jack: true,
            tof_distance: 0.25,
            yaw_delta: -0.5,
            left_encoder: 12.0,
            right_encoder: 13.0,
            yaw: 1.0,
            acceleration: [0.0; 3],
            button: true,
            clock_ms: 4000,
        };
        let mut memory = ExchangeMemory::default();
        memory.write_input(&input, Some(&frame));

        assert_eq!(memory.read_input(), (input, Some(frame)));
    }

    #[test]
    fn test_exchange_memory_clear_output_keeps_input() {
        let mut memory = ExchangeMemory::default();
        memory.write_input(
            &StepInput {
                jack: true,
                ..Default::default()
            },
            None,
        );
        memory.write_output(&StepOutput {
            left_motor: 0.5,
            right_motor: -0.5,
            actuators: [0.1, 0.2],
        });
        memory.clear_output();

        assert_eq!(memory.read_output(), StepOutput::default());
        assert!(memory.read_input().0.jack);
    }
}
