//! Walking enemies. Steering lives in [`crate::ai`].

use glam::Vec2;
use ninelives_data::constants::MobConfig;
use serde::{Deserialize, Serialize};

use crate::physics::{BodyKind, BodySpec, ColliderSpec, FixtureRole, ShapeSpec};

/// Snapshot of a mob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobState {
    /// Facing.
    pub facing_right: bool,
}

/// An enemy that walks until it bumps into something, and chases the cat
/// if aggressive.
#[derive(Debug, Clone)]
pub struct Mob {
    aggressive: bool,
    facing_right: bool,
}

impl Mob {
    /// A mob.
    pub fn new(aggressive: bool, facing_right: bool) -> Self {
        Self {
            aggressive,
            facing_right,
        }
    }

    /// Whether the mob hunts the cat.
    pub fn is_aggressive(&self) -> bool {
        self.aggressive
    }

    /// Facing.
    pub fn is_facing_right(&self) -> bool {
        self.facing_right
    }

    /// Turn around.
    pub fn flip(&mut self) {
        self.facing_right = !self.facing_right;
    }

    /// The side sensor on the facing side.
    pub fn front_sensor(&self) -> FixtureRole {
        if self.facing_right {
            FixtureRole::RightSensor
        } else {
            FixtureRole::LeftSensor
        }
    }

    /// Capture state.
    pub fn state(&self) -> MobState {
        MobState {
            facing_right: self.facing_right,
        }
    }

    /// Restore state.
    pub fn restore(&mut self, state: &MobState) {
        self.facing_right = state.facing_right;
    }
}

/// Dynamic, rotation-locked body with side sensors.
pub(crate) fn body(position: Vec2, config: &MobConfig) -> (BodySpec, Vec<ColliderSpec>) {
    let (w, h) = (config.width, config.height);
    let spec = BodySpec::new(BodyKind::Dynamic, position).fixed_rotation();
    let side = ShapeSpec::rect(config.sensor_width, h * 0.6);
    let colliders = vec![
        ColliderSpec::solid(FixtureRole::Body, ShapeSpec::rect(w, h)).density(config.density),
        ColliderSpec::sensor(FixtureRole::LeftSensor, side.clone()).at(Vec2::new(-w * 0.5, 0.0)),
        ColliderSpec::sensor(FixtureRole::RightSensor, side).at(Vec2::new(w * 0.5, 0.0)),
    ];
    (spec, colliders)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
