//! Static terrain and trigger areas: walls, checkpoints, spirit regions,
//! camera tiles and exits.

use glam::Vec2;
use ninelives_data::constants::CheckpointConfig;
use serde::{Deserialize, Serialize};

use crate::physics::{BodyKind, BodySpec, ColliderSpec, FixtureRole, ShapeSpec};

/// Static terrain. Climbable walls register with the cat's side sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wall {
    climbable: bool,
}

impl Wall {
    /// A wall.
    pub fn new(climbable: bool) -> Self {
        Self { climbable }
    }

    /// Whether the cat can climb it.
    pub fn is_climbable(&self) -> bool {
        self.climbable
    }
}

/// Fixed convex polygon.
pub(crate) fn wall_body(points: Vec<Vec2>) -> (BodySpec, Vec<ColliderSpec>) {
    let spec = BodySpec::new(BodyKind::Fixed, Vec2::ZERO);
    let colliders = vec![ColliderSpec::solid(
        FixtureRole::Body,
        ShapeSpec::ConvexPolygon { points },
    )];
    (spec, colliders)
}

// ---------------------------------------------------------------------------
// Checkpoint
// ---------------------------------------------------------------------------

/// Snapshot of a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Whether this is the level's current checkpoint.
    pub current: bool,
}

/// A respawn point activated by touching it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    respawn: Vec2,
    current: bool,
}

impl Checkpoint {
    /// A checkpoint respawning the cat at `respawn`.
    pub fn new(respawn: Vec2) -> Self {
        Self {
            respawn,
            current: false,
        }
    }

    /// Where the cat reappears.
    pub fn respawn_position(&self) -> Vec2 {
        self.respawn
    }

    /// Whether this is the current checkpoint.
    pub fn is_current(&self) -> bool {
        self.current
    }

    /// Mark as (not) current.
    pub fn set_current(&mut self, current: bool) {
        self.current = current;
    }

    /// Capture state.
    pub fn state(&self) -> CheckpointState {
        CheckpointState {
            current: self.current,
        }
    }

    /// Restore state.
    pub fn restore(&mut self, state: &CheckpointState) {
        self.current = state.current;
    }
}

/// Fixed sensor.
pub(crate) fn checkpoint_body(position: Vec2, angle: f32, config: &CheckpointConfig) -> (BodySpec, Vec<ColliderSpec>) {
    let spec = BodySpec::new(BodyKind::Fixed, position).angle(angle);
    let colliders = vec![ColliderSpec::sensor(
        FixtureRole::CheckpointSensor,
        ShapeSpec::rect(config.width, config.height),
    )];
    (spec, colliders)
}

// ---------------------------------------------------------------------------
// Trigger areas
// ---------------------------------------------------------------------------

/// An area where the cat's spirit can reach dead bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiritRegion {
    color: String,
}

impl SpiritRegion {
    /// A region drawn in `color`.
    pub fn new(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
        }
    }

    /// Display color.
    pub fn color(&self) -> &str {
        &self.color
    }
}

/// An area that asks the camera for a zoom level while the cat is inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTile {
    zoom: f32,
}

impl CameraTile {
    /// A tile requesting `zoom`.
    pub fn new(zoom: f32) -> Self {
        Self { zoom }
    }

    /// Requested zoom.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }
}

/// What reaching an exit does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitKind {
    /// Completes the level.
    Goal,
    /// Returns to the previous level.
    Return,
}

impl ExitKind {
    /// Parse the level-file type string.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "goal" => Some(ExitKind::Goal),
            "return" => Some(ExitKind::Return),
            _ => None,
        }
    }
}

/// A level exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exit {
    kind: ExitKind,
}

impl Exit {
    /// An exit.
    pub fn new(kind: ExitKind) -> Self {
        Self { kind }
    }

    /// What it does.
    pub fn kind(&self) -> ExitKind {
        self.kind
    }
}

/// Fixed rectangular sensor for regions, camera tiles and exits.
pub(crate) fn area_body(position: Vec2, size: Vec2) -> (BodySpec, Vec<ColliderSpec>) {
    let spec = BodySpec::new(BodyKind::Fixed, position);
    let colliders = vec![ColliderSpec::sensor(
        FixtureRole::Body,
        ShapeSpec::rect(size.x, size.y),
    )];
    (spec, colliders)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
