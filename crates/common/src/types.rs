use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A 2D cell coordinate in the index grid (ignoring Y axis for partitioning).
///
/// Ordered lexicographically by `(x, z)`; the order is what transfers use to
/// lock two partitions without deadlocking.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellId {
    pub x: i32,
    pub z: i32,
}

impl CellId {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Cell holding the horizontal coordinate `(x, z)` for square tiles of `tile_size`.
    ///
    /// Uses floor division, so `-0.5` with a tile size of `1.0` lands in cell `-1`.
    pub fn containing(x: f64, z: f64, tile_size: f64) -> Self {
        Self {
            x: (x / tile_size).floor() as i32,
            z: (z / tile_size).floor() as i32,
        }
    }

    /// Cell holding a world position. The Y component is ignored.
    pub fn from_position(position: DVec3, tile_size: f64) -> Self {
        Self::containing(position.x, position.z, tile_size)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}
