//! The resource module encapsulates domain entities for use with Bevy.

use std::ops::{Deref, DerefMut};

use crate::arena::Arena;

/// The arena as a non-send resource. Control modules may wrap foreign instances that must stay
/// on the thread that created them.
pub struct ArenaRes(Arena);

impl Deref for ArenaRes {
    type Target = Arena;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ArenaRes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Arena> for ArenaRes {
    fn from(value: Arena) -> Self {
        Self(value)
    }
}
