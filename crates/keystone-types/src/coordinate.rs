//! Integer grid coordinates and axis directions.
//!
//! All coordinate math is checked: an offset that would leave the `i32`
//! range yields `None` rather than wrapping. Callers treat such positions
//! the same way they treat a missing node.

use core::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A cell address in the voxel grid.
///
/// Also used for offsets inside a template's bounding box, where every
/// component is non-negative.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct GridCoordinate {
    /// East-west axis.
    pub x: i32,
    /// Vertical axis.
    pub y: i32,
    /// North-south axis.
    pub z: i32,
}

impl GridCoordinate {
    /// The origin, `(0, 0, 0)`.
    pub const ORIGIN: Self = Self::new(0, 0, 0);

    /// Create a coordinate from its components.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Component-wise sum, or `None` on overflow.
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        let Some(x) = self.x.checked_add(other.x) else {
            return None;
        };
        let Some(y) = self.y.checked_add(other.y) else {
            return None;
        };
        let Some(z) = self.z.checked_add(other.z) else {
            return None;
        };
        Some(Self { x, y, z })
    }

    /// Component-wise difference, or `None` on overflow.
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        let Some(x) = self.x.checked_sub(other.x) else {
            return None;
        };
        let Some(y) = self.y.checked_sub(other.y) else {
            return None;
        };
        let Some(z) = self.z.checked_sub(other.z) else {
            return None;
        };
        Some(Self { x, y, z })
    }

    /// The adjacent coordinate one step in `direction`.
    pub const fn neighbor(self, direction: Direction) -> Option<Self> {
        self.checked_add(direction.unit())
    }
}

impl fmt::Display for GridCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One of the six axis-aligned directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Negative y.
    Down,
    /// Positive y.
    Up,
    /// Negative z.
    North,
    /// Positive z.
    South,
    /// Negative x.
    West,
    /// Positive x.
    East,
}

impl Direction {
    /// Every direction, in a fixed order.
    pub const ALL: [Self; 6] = [
        Self::Down,
        Self::Up,
        Self::North,
        Self::South,
        Self::West,
        Self::East,
    ];

    /// The unit step for this direction.
    pub const fn unit(self) -> GridCoordinate {
        match self {
            Self::Down => GridCoordinate::new(0, -1, 0),
            Self::Up => GridCoordinate::new(0, 1, 0),
            Self::North => GridCoordinate::new(0, 0, -1),
            Self::South => GridCoordinate::new(0, 0, 1),
            Self::West => GridCoordinate::new(-1, 0, 0),
            Self::East => GridCoordinate::new(1, 0, 0),
        }
    }
}
