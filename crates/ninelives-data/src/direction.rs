//! Cardinal directions and the authoring angle convention.
//!
//! Level files store rotations in degrees where 0 points up and angles grow
//! counter-clockwise, so 90 is left, 180 is down and 270 is right. Lasers,
//! mirrors, spikes and doors all derive their [`Direction`] from that angle.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::DataError;

/// One of the four axis-aligned directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// +y.
    Up,
    /// -y.
    Down,
    /// -x.
    Left,
    /// +x.
    Right,
}

impl Direction {
    /// All four directions in declaration order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Map an authoring angle (degrees, counter-clockwise from up) to a
    /// direction. Negative angles and angles past a full turn are normalized.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnsupportedAngle`] when the angle is not a multiple
    /// of 90.
    pub fn from_angle(angle: i32) -> Result<Self, DataError> {
        match angle.rem_euclid(360) {
            0 => Ok(Direction::Up),
            90 => Ok(Direction::Left),
            180 => Ok(Direction::Down),
            270 => Ok(Direction::Right),
            _ => Err(DataError::UnsupportedAngle { angle }),
        }
    }

    /// Inverse of [`from_angle`](Self::from_angle), in `[0, 360)`.
    pub fn angle_degrees(self) -> i32 {
        match self {
            Direction::Up => 0,
            Direction::Left => 90,
            Direction::Down => 180,
            Direction::Right => 270,
        }
    }

    /// The angle in radians, as used for body rotation.
    pub fn angle_radians(self) -> f32 {
        (self.angle_degrees() as f32).to_radians()
    }

    /// Unit vector pointing in this direction.
    pub fn unit(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::Y,
            Direction::Down => Vec2::NEG_Y,
            Direction::Left => Vec2::NEG_X,
            Direction::Right => Vec2::X,
        }
    }

    /// The direction pointing the other way.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// `true` for [`Up`](Direction::Up) and [`Down`](Direction::Down).
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    /// Rotate an offset authored for an up-facing object so it matches this
    /// direction (quarter turns counter-clockwise).
    pub fn rotate(self, offset: Vec2) -> Vec2 {
        match self {
            Direction::Up => offset,
            Direction::Left => Vec2::new(-offset.y, offset.x),
            Direction::Down => Vec2::new(-offset.x, -offset.y),
            Direction::Right => Vec2::new(offset.y, -offset.x),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turns_map_counter_clockwise_from_up() {
        assert_eq!(Direction::from_angle(0).unwrap(), Direction::Up);
        assert_eq!(Direction::from_angle(90).unwrap(), Direction::Left);
        assert_eq!(Direction::from_angle(180).unwrap(), Direction::Down);
        assert_eq!(Direction::from_angle(270).unwrap(), Direction::Right);
    }

    #[test]
    fn angles_outside_one_turn_are_normalized() {
        assert_eq!(Direction::from_angle(360).unwrap(), Direction::Up);
        assert_eq!(Direction::from_angle(-90).unwrap(), Direction::Right);
        assert_eq!(Direction::from_angle(450).unwrap(), Direction::Left);
    }

    #[test]
    fn non_quarter_angle_is_rejected() {
        let err = Direction::from_angle(45).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedAngle { angle: 45 }));
        assert!(err.to_string().contains("45"));
    }

    #[test]
    fn angle_roundtrips_for_every_direction() {
        for dir in Direction::ALL {
            assert_eq!(Direction::from_angle(dir.angle_degrees()).unwrap(), dir);
        }
    }

    #[test]
    fn rotate_matches_unit_vectors() {
        for dir in Direction::ALL {
            let rotated = dir.rotate(Vec2::Y);
            assert!((rotated - dir.unit()).length() < 1e-6, "{dir}: {rotated}");
        }
    }

    #[test]
    fn opposite_is_an_involution() {
        for dir in Direction::ALL {
            assert_ne!(dir.opposite(), dir);
            assert_eq!(dir.opposite().opposite(), dir);
        }
    }
}
