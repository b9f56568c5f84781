//! Movement commands consumed by submarines.
//!
//! A command is a `(direction, distance)` pair. Directions form a closed set
//! ([`Direction`]), so every place that turns a direction into a displacement
//! is an exhaustive `match` rather than a lookup table.
//!
//! # Grid orientation
//!
//! | Direction | Effect on `(x, y)` |
//! |-----------|--------------------|
//! | `up`      | `y -= distance`    |
//! | `down`    | `y += distance`    |
//! | `forward` | `x += distance`    |
//!
//! There is no backward move: the horizontal coordinate never decreases.
//!
//! # Example
//!
//! ```
//! use subfleet_core::command::{Command, Direction};
//!
//! let cmd = Command::parse("forward", 5).unwrap();
//! assert_eq!(cmd.direction, Direction::Forward);
//! assert_eq!(cmd.distance, 5);
//!
//! assert!(Command::parse("backward", 5).is_err());
//! assert!(Command::parse("up", -1).is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::error::InvalidCommand;

/// One of the three directions a submarine can move or fire in.
///
/// The declaration order is the canonical report order used by fire control.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Decreases the vertical coordinate.
    Up,
    /// Increases the vertical coordinate.
    Down,
    /// Increases the horizontal coordinate.
    Forward,
}

impl Direction {
    /// All directions in canonical order.
    pub const ALL: [Direction; 3] = [Direction::Up, Direction::Down, Direction::Forward];

    /// Returns the lowercase command word for this direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Forward => "forward",
        }
    }

    /// Position of this direction within [`Direction::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Up => 0,
            Self::Down => 1,
            Self::Forward => 2,
        }
    }

    /// Unit step on the grid for this direction.
    #[must_use]
    pub const fn unit(self) -> IVec2 {
        match self {
            Self::Up => IVec2::new(0, -1),
            Self::Down => IVec2::new(0, 1),
            Self::Forward => IVec2::new(1, 0),
        }
    }

    /// Moves `from` by `distance` in this direction.
    ///
    /// Returns `None` if the result does not fit in `i32` coordinates.
    #[must_use]
    pub fn offset(self, from: IVec2, distance: u32) -> Option<IVec2> {
        let step = i32::try_from(distance).ok()?;
        match self {
            Self::Up => from.y.checked_sub(step).map(|y| IVec2::new(from.x, y)),
            Self::Down => from.y.checked_add(step).map(|y| IVec2::new(from.x, y)),
            Self::Forward => from.x.checked_add(step).map(|x| IVec2::new(x, from.y)),
        }
    }

    /// Distance from `origin` to `target` if `target` lies strictly along
    /// this direction on the same grid line.
    ///
    /// Returns `None` for targets off the line, behind, or on the origin.
    #[must_use]
    pub fn distance_along(self, origin: IVec2, target: IVec2) -> Option<u64> {
        let (along, across_equal) = match self {
            Self::Up => (i64::from(origin.y) - i64::from(target.y), origin.x == target.x),
            Self::Down => (i64::from(target.y) - i64::from(origin.y), origin.x == target.x),
            Self::Forward => (i64::from(target.x) - i64::from(origin.x), origin.y == target.y),
        };
        if across_equal && along > 0 {
            u64::try_from(along).ok()
        } else {
            None
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = InvalidCommand;

    /// Parses the exact lowercase command words.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "forward" => Ok(Self::Forward),
            other => Err(InvalidCommand::UnknownDirection(other.to_string())),
        }
    }
}

/// A validated movement command.
///
/// The distance is stored unsigned and is guaranteed to fit in an `i32`
/// when built through [`Command::new`] or [`Command::parse`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    /// Direction of travel
    pub direction: Direction,
    /// Number of grid cells to travel
    pub distance: u32,
}

impl Command {
    /// Creates a command, validating the distance.
    ///
    /// # Errors
    ///
    /// - [`InvalidCommand::NegativeDistance`] if `distance < 0`
    /// - [`InvalidCommand::DistanceTooLarge`] if `distance > i32::MAX`
    pub fn new(direction: Direction, distance: i64) -> Result<Self, InvalidCommand> {
        if distance < 0 {
            return Err(InvalidCommand::NegativeDistance(distance));
        }
        if distance > i64::from(i32::MAX) {
            return Err(InvalidCommand::DistanceTooLarge(distance));
        }
        let distance =
            u32::try_from(distance).map_err(|_| InvalidCommand::DistanceTooLarge(distance))?;
        Ok(Self {
            direction,
            distance,
        })
    }

    /// Parses a raw `(direction, distance)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCommand::UnknownDirection`] for anything other than
    /// `up`, `down` or `forward`, plus the distance errors of [`Command::new`].
    pub fn parse(direction: &str, distance: i64) -> Result<Self, InvalidCommand> {
        let direction: Direction = direction.parse()?;
        Self::new(direction, distance)
    }

    /// Shorthand for an `up` command of `distance` cells.
    #[must_use]
    pub fn up(distance: u16) -> Self {
        Self {
            direction: Direction::Up,
            distance: u32::from(distance),
        }
    }

    /// Shorthand for a `down` command.
    #[must_use]
    pub fn down(distance: u16) -> Self {
        Self {
            direction: Direction::Down,
            distance: u32::from(distance),
        }
    }

    /// Shorthand for a `forward` command.
    #[must_use]
    pub fn forward(distance: u16) -> Self {
        Self {
            direction: Direction::Forward,
            distance: u32::from(distance),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.direction, self.distance)
    }
}
