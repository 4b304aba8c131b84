//! Append-only trajectory of a robot.

use thiserror::Error;

use super::{Angle, FieldObject, Pose, Position};
use crate::controller::{StepInput, StepOutput};

#[derive(Error, Debug, PartialEq)]
pub enum HistoryError {
    #[error("tick index {index} out of range for history of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("start pose can only be edited before the first step (history length {len})")]
    NotEditable { len: usize },
}

/// What the control module saw and answered during one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlRecord {
    pub input: StepInput,
    pub output: StepOutput,
    pub logs: Vec<String>,
}

/// State of a robot after one tick. Ticks are never modified once appended to a history.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tick {
    pub pose: Pose,
    pub left_odometer: f64,
    pub right_odometer: f64,
    pub control: Option<ControlRecord>,
    pub carried: Option<FieldObject>,
}

impl Tick {
    pub fn initial(pose: Pose) -> Self {
        Self {
            pose,
            ..Default::default()
        }
    }
}

/// Partial update of the editable start tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickEdit {
    pub position: Option<Position>,
    pub orientation: Option<Angle>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepHistory {
    ticks: Vec<Tick>,
}

impl StepHistory {
    pub fn new(initial: Tick) -> Self {
        Self {
            ticks: vec![initial],
        }
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// Always false, a history holds at least its start tick.
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn append(&mut self, tick: Tick) {
        self.ticks.push(tick);
    }

    pub fn last(&self) -> &Tick {
        // The start tick is never removed.
        &self.ticks[self.ticks.len() - 1]
    }

    /// Tick before the last one, or the start tick if nothing was appended yet.
    pub fn previous(&self) -> &Tick {
        &self.ticks[self.ticks.len().saturating_sub(2)]
    }

    pub fn get(&self, index: usize) -> Result<&Tick, HistoryError> {
        self.ticks.get(index).ok_or(HistoryError::IndexOutOfRange {
            index,
            len: self.ticks.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tick> {
        self.ticks.iter()
    }

    pub fn reset(&mut self) {
        self.ticks.truncate(1);
    }

    pub fn update_tick0(&mut self, edit: TickEdit) -> Result<(), HistoryError> {
        if self.ticks.len() != 1 {
            return Err(HistoryError::NotEditable {
                len: self.ticks.len(),
            });
        }

        let start = &mut self.ticks[0];
        if let Some(position) = edit.position {
            start.pose = start.pose.with_position(position);
        }
        if let Some(orientation) = edit.orientation {
            start.pose = start.pose.with_orientation(orientation);
        }
        Ok(())
    }
}
