//! Radio telemetry frame describing robot positions.
//!
//! A frame is a start byte, a 7 byte bit-packed payload and a checksum byte. Payload fields
//! are packed least significant bit first, filling each byte from its least significant bit:
//!
//! | bits | field               |
//! |------|---------------------|
//! | 1    | color               |
//! | 1    | own robot detected  |
//! | 9    | own x in cm         |
//! | 8    | own y in cm         |
//! | 9    | own heading in deg  |
//! | 1    | opponent detected   |
//! | 9    | opponent x in cm    |
//! | 8    | opponent y in cm    |
//! | 9    | opponent heading    |
//! | 1    | padding             |

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::domain::{Color, Field, Pose};

pub const START_BYTE: u8 = 0xFF;
pub const PAYLOAD_LEN: usize = 7;
pub const FRAME_LEN: usize = PAYLOAD_LEN + 2;

const X_BITS: u32 = 9;
const Y_BITS: u32 = 8;
const THETA_BITS: u32 = 9;

/// Complete frame as sent over the air.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct WireFrame([u8; FRAME_LEN]);

impl WireFrame {
    pub fn new(payload: &Payload) -> Self {
        let packed = payload.pack();
        let mut bytes = [0; FRAME_LEN];
        bytes[0] = START_BYTE;
        bytes[1..=PAYLOAD_LEN].copy_from_slice(&packed);
        bytes[FRAME_LEN - 1] = checksum(&packed);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    pub fn payload_bytes(&self) -> &[u8] {
        &self.0[1..=PAYLOAD_LEN]
    }

    pub fn checksum(&self) -> u8 {
        self.0[FRAME_LEN - 1]
    }

    /// Decodes the payload, `None` if the start byte or the checksum do not match.
    pub fn payload(&self) -> Option<Payload> {
        if self.0[0] != START_BYTE || checksum(self.payload_bytes()) != self.checksum() {
            return None;
        }
        let mut packed = [0; PAYLOAD_LEN];
        packed.copy_from_slice(self.payload_bytes());
        Some(Payload::unpack(&packed))
    }
}

impl fmt::Display for WireFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Pose quantized for the wire.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EncodedPose {
    pub x_cm: u16,
    pub y_cm: u16,
    pub theta_deg: u16,
}

impl EncodedPose {
    /// Rounds to whole centimeters and degrees. Coordinates saturate at the field capacity,
    /// headings wrap into `[0, 360)`.
    pub fn from_pose(pose: &Pose) -> Self {
        Self {
            x_cm: to_centimeters(pose.x(), X_BITS),
            y_cm: to_centimeters(pose.y(), Y_BITS),
            theta_deg: (pose.orientation().to_deg().round() as u16) % 360,
        }
    }
}

fn to_centimeters(meters: f64, bits: u32) -> u16 {
    let max = (1u32 << bits) - 1;
    (meters * 100.0).round().clamp(0.0, max as f64) as u16
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Payload {
    pub color: Color,
    pub own: Option<EncodedPose>,
    pub opponent: Option<EncodedPose>,
}

impl Payload {
    pub fn pack(&self) -> [u8; PAYLOAD_LEN] {
        let mut writer = BitWriter::default();
        writer.write(u32::from(self.color.bit()), 1);
        for pose in [self.own, self.opponent] {
            let pose_or_zero = pose.unwrap_or_default();
            writer.write(u32::from(pose.is_some()), 1);
            writer.write(pose_or_zero.x_cm.into(), X_BITS);
            writer.write(pose_or_zero.y_cm.into(), Y_BITS);
            writer.write(pose_or_zero.theta_deg.into(), THETA_BITS);
        }
        writer.write(0, 1);
        writer.bytes
    }

    pub fn unpack(bytes: &[u8; PAYLOAD_LEN]) -> Self {
        let mut reader = BitReader::new(bytes);
        let color = Color::from_bit(reader.read(1) == 1);
        let mut poses = [None, None];
        for pose in poses.iter_mut() {
            let detected = reader.read(1) == 1;
            let encoded = EncodedPose {
                x_cm: reader.read(X_BITS) as u16,
                y_cm: reader.read(Y_BITS) as u16,
                theta_deg: reader.read(THETA_BITS) as u16,
            };
            *pose = detected.then_some(encoded);
        }
        let [own, opponent] = poses;
        Self {
            color,
            own,
            opponent,
        }
    }
}

#[derive(Default)]
struct BitWriter {
    bytes: [u8; PAYLOAD_LEN],
    position: usize,
}

impl BitWriter {
    fn write(&mut self, value: u32, bits: u32) {
        for i in 0..bits {
            if self.position >= PAYLOAD_LEN * 8 {
                return;
            }
            if (value >> i) & 1 == 1 {
                self.bytes[self.position / 8] |= 1 << (self.position % 8);
            }
            self.position += 1;
        }
    }
}

struct BitReader<'a> {
    bytes: &'a [u8; PAYLOAD_LEN],
    position: usize,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8; PAYLOAD_LEN]) -> Self {
        Self { bytes, position: 0 }
    }

    fn read(&mut self, bits: u32) -> u32 {
        let mut value = 0;
        for i in 0..bits {
            if self.position >= PAYLOAD_LEN * 8 {
                break;
            }
            let bit = (self.bytes[self.position / 8] >> (self.position % 8)) & 1;
            value |= u32::from(bit) << i;
            self.position += 1;
        }
        value
    }
}

/// Builds telemetry frames. Randomized frames draw from a seeded generator so that runs can be
/// reproduced.
#[derive(Clone, Debug)]
pub struct TelemetryEncoder {
    field: Field,
    seed: u64,
    rng: ChaCha8Rng,
}

impl TelemetryEncoder {
    pub fn new(field: Field, seed: u64) -> Self {
        Self {
            field,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Restarts the random sequence from the seed.
    pub fn reseed(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
    }

    /// Frame for the robot of `color`. Returns `None` when there is no such robot, meaning that
    /// nothing is sent this tick.
    pub fn encode(
        &mut self,
        own: Option<&Pose>,
        opponent: Option<&Pose>,
        color: Color,
        randomize: bool,
    ) -> Option<WireFrame> {
        if !randomize {
            return Self::exact(own, opponent, color);
        }
        let own = own.map(|_| self.random_pose())?;
        let opponent = opponent.map(|_| self.random_pose());

        Some(WireFrame::new(&Payload {
            color,
            own: Some(own),
            opponent,
        }))
    }

    /// Frame with the real poses. Does not draw from the random sequence.
    pub fn exact(own: Option<&Pose>, opponent: Option<&Pose>, color: Color) -> Option<WireFrame> {
        let own = own?;
        Some(WireFrame::new(&Payload {
            color,
            own: Some(EncodedPose::from_pose(own)),
            opponent: opponent.map(EncodedPose::from_pose),
        }))
    }

    fn random_pose(&mut self) -> EncodedPose {
        let max_x = to_centimeters(self.field.width(), X_BITS);
        let max_y = to_centimeters(self.field.height(), Y_BITS);
        EncodedPose {
            x_cm: self.rng.random_range(0..=max_x),
            y_cm: self.rng.random_range(0..=max_y),
            theta_deg: self.rng.random_range(0..360),
        }
    }
}
