//! Movement Directions
//!
//! The four directions a vehicle can be steered in. Each maps through a
//! lookup table to a unit vector and the canonical facing angle, so there
//! is no fallthrough path for unknown input: anything that does not parse
//! is rejected before it reaches the engine.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::engine::ActionError;

/// A steering direction.
///
/// Screen coordinates: +Y points down, so `Up` is -Y.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Direction {
    /// -Y
    Up = 0,
    /// +Y
    Down = 1,
    /// -X
    Left = 2,
    /// +X
    Right = 3,
}

/// Unit vector and facing angle per direction, indexed by discriminant.
pub static DIRECTION_LUT: [(Vec2, f64); 4] = [
    (Vec2::new(0.0, -1.0), -FRAC_PI_2),
    (Vec2::new(0.0, 1.0), FRAC_PI_2),
    (Vec2::new(-1.0, 0.0), PI),
    (Vec2::new(1.0, 0.0), 0.0),
];

impl Direction {
    /// All directions, in discriminant order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit vector for this direction.
    #[inline]
    pub fn unit(self) -> Vec2 {
        DIRECTION_LUT[self as usize].0
    }

    /// Canonical facing angle in radians.
    #[inline]
    pub fn angle(self) -> f64 {
        DIRECTION_LUT[self as usize].1
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl FromStr for Direction {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(ActionError::InvalidDirection(other.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
