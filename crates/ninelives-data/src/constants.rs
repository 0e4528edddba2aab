//! Tuning constants, one struct per object kind.
//!
//! Every struct is `#[serde(default)]`, so a constants file may override any
//! subset of fields:
//!
//! ```
//! use ninelives_data::constants::GameConstants;
//!
//! let constants = GameConstants::from_json_str(r#"{ "dead_body": { "burn_ticks": 30 } }"#).unwrap();
//! assert_eq!(constants.dead_body.burn_ticks, 30);
//! assert_eq!(constants.max_lives, 9);
//! ```
//!
//! Constants are handed to each object at construction time. There is no
//! global or static configuration.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::DataError;

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Simulation-wide parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Gravity vector in m/s^2.
    pub gravity: Vec2,
    /// Solver iterations per step.
    pub solver_iterations: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.8),
            solver_iterations: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Player and dead bodies
// ---------------------------------------------------------------------------

/// Player body and movement tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatConfig {
    /// Body width.
    pub width: f32,
    /// Body height.
    pub height: f32,
    /// Body density.
    pub density: f32,
    /// Body friction. Non-zero values make the cat stick to walls.
    pub friction: f32,
    /// Multiplier applied to raw horizontal/vertical input.
    pub force: f32,
    /// Vertical speed cap applied when a dash ends moving upward.
    pub max_speed: f32,
    /// Initial jump impulse, damped every tick the jump is held.
    pub jump_force: f32,
    /// Per-tick jump impulse multiplier.
    pub jump_damping: f32,
    /// Gravity scale outside of climbing and dashing.
    pub gravity_scale: f32,
    /// Length of a dash in ticks.
    pub dash_ticks: u32,
    /// Length of a wall jump in ticks.
    pub wall_jump_ticks: u32,
    /// Ticks after leaving the ground during which a jump is still allowed.
    pub coyote_ticks: u32,
    /// Ground sensor width as a fraction of the body width.
    pub ground_sensor_shrink: f32,
    /// Ground sensor height.
    pub ground_sensor_height: f32,
    /// Side sensor width.
    pub side_sensor_width: f32,
    /// Side sensor height as a fraction of the body height.
    pub side_sensor_shrink: f32,
    /// Extra margin of the hazard hitbox around the body.
    pub hitbox_margin: f32,
}

impl Default for CatConfig {
    fn default() -> Self {
        Self {
            width: 0.8,
            height: 0.9,
            density: 1.0,
            friction: 0.0,
            force: 20.0,
            max_speed: 5.0,
            jump_force: 1.0,
            jump_damping: 0.85,
            gravity_scale: 2.0,
            dash_ticks: 7,
            wall_jump_ticks: 5,
            coyote_ticks: 6,
            ground_sensor_shrink: 0.6,
            ground_sensor_height: 0.05,
            side_sensor_width: 0.05,
            side_sensor_shrink: 0.6,
            hitbox_margin: 0.05,
        }
    }
}

/// Dead body tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadBodyConfig {
    /// Body width.
    pub width: f32,
    /// Body height.
    pub height: f32,
    /// Body density.
    pub density: f32,
    /// Body friction.
    pub friction: f32,
    /// Ticks a body burns before it is removed.
    pub burn_ticks: u32,
    /// Horizontal velocity divisor applied every update.
    pub damping: f32,
    /// Half extent of the center sensor used for spike welding.
    pub center_sensor_size: f32,
    /// Extra margin of the hazard hitbox around the body.
    pub hitbox_margin: f32,
}

impl Default for DeadBodyConfig {
    fn default() -> Self {
        Self {
            width: 0.8,
            height: 0.6,
            density: 1.0,
            friction: 0.5,
            burn_ticks: 60,
            damping: 1.05,
            center_sensor_size: 0.1,
            hitbox_margin: 0.05,
        }
    }
}

// ---------------------------------------------------------------------------
// Activators and activatables
// ---------------------------------------------------------------------------

/// Buttons, switches and timed buttons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivatorConfig {
    /// Base width.
    pub width: f32,
    /// Base height.
    pub height: f32,
    /// Height of the pressing sensor above the base.
    pub sensor_height: f32,
    /// Countdown for timed buttons without an explicit duration.
    pub default_duration: u32,
}

impl Default for ActivatorConfig {
    fn default() -> Self {
        Self {
            width: 0.8,
            height: 0.2,
            sensor_height: 0.3,
            default_duration: 120,
        }
    }
}

/// Spikes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikesConfig {
    /// Full width.
    pub width: f32,
    /// Full height.
    pub height: f32,
    /// Height of the solid base as a fraction of the full height.
    pub solid_fraction: f32,
    /// Half extent of the center sensor used for welding dead bodies.
    pub center_sensor_size: f32,
}

impl Default for SpikesConfig {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 0.5,
            solid_fraction: 0.4,
            center_sensor_size: 0.1,
        }
    }
}

/// Flamethrowers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlamethrowerConfig {
    /// Base width.
    pub base_width: f32,
    /// Base height.
    pub base_height: f32,
    /// Flame width.
    pub flame_width: f32,
    /// Flame height.
    pub flame_height: f32,
}

impl Default for FlamethrowerConfig {
    fn default() -> Self {
        Self {
            base_width: 1.0,
            base_height: 0.5,
            flame_width: 0.6,
            flame_height: 1.5,
        }
    }
}

/// Doors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorConfig {
    /// Ticks to fully open or close when the level does not say otherwise.
    pub total_ticks: u32,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self { total_ticks: 60 }
    }
}

/// Moving platforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Travel speed when the level does not say otherwise.
    pub speed: f32,
    /// Fraction of the remaining velocity error corrected each update.
    pub response: f32,
    /// Distance at which the platform snaps onto its target.
    pub arrive_epsilon: f32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            speed: 3.0,
            response: 0.2,
            arrive_epsilon: 0.01,
        }
    }
}

/// Pushable boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxConfig {
    /// Side length.
    pub size: f32,
    /// Body density.
    pub density: f32,
    /// Body friction.
    pub friction: f32,
}

impl Default for BoxConfig {
    fn default() -> Self {
        Self {
            size: 1.0,
            density: 1.0,
            friction: 0.6,
        }
    }
}

// ---------------------------------------------------------------------------
// Lasers and mirrors
// ---------------------------------------------------------------------------

/// Laser emitters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaserConfig {
    /// Emitter width.
    pub width: f32,
    /// Emitter height.
    pub height: f32,
    /// Beam origin relative to an up-facing emitter's center.
    pub beam_offset: Vec2,
}

impl Default for LaserConfig {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 0.5,
            beam_offset: Vec2::new(0.0, 0.3),
        }
    }
}

/// Mirrors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Side length.
    pub size: f32,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self { size: 1.0 }
    }
}

// ---------------------------------------------------------------------------
// Mobs and checkpoints
// ---------------------------------------------------------------------------

/// Mobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobConfig {
    /// Body width.
    pub width: f32,
    /// Body height.
    pub height: f32,
    /// Body density.
    pub density: f32,
    /// Horizontal displacement per tick while wandering.
    pub move_speed: f32,
    /// Multiplier on `move_speed` while chasing.
    pub chase_multiplier: f32,
    /// Width of the front sensors that detect walls.
    pub sensor_width: f32,
}

impl Default for MobConfig {
    fn default() -> Self {
        Self {
            width: 0.9,
            height: 0.7,
            density: 1.0,
            move_speed: 0.02,
            chase_multiplier: 2.0,
            sensor_width: 0.05,
        }
    }
}

/// Checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Sensor width.
    pub width: f32,
    /// Sensor height.
    pub height: f32,
    /// Respawn position relative to the checkpoint center.
    pub respawn_offset: Vec2,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 2.0,
            respawn_offset: Vec2::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// GameConstants
// ---------------------------------------------------------------------------

/// All tuning for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConstants {
    /// Lives at full health. Life snapshots are indexed against this.
    pub max_lives: u32,
    /// Simulation parameters.
    pub world: WorldConfig,
    /// Player.
    pub cat: CatConfig,
    /// Dead bodies.
    pub dead_body: DeadBodyConfig,
    /// Activators.
    pub activator: ActivatorConfig,
    /// Spikes.
    pub spikes: SpikesConfig,
    /// Flamethrowers.
    pub flamethrower: FlamethrowerConfig,
    /// Doors.
    pub door: DoorConfig,
    /// Platforms.
    pub platform: PlatformConfig,
    /// Boxes.
    pub pushable_box: BoxConfig,
    /// Lasers.
    pub laser: LaserConfig,
    /// Mirrors.
    pub mirror: MirrorConfig,
    /// Mobs.
    pub mob: MobConfig,
    /// Checkpoints.
    pub checkpoint: CheckpointConfig,
}

impl Default for GameConstants {
    fn default() -> Self {
        Self {
            max_lives: 9,
            world: WorldConfig::default(),
            cat: CatConfig::default(),
            dead_body: DeadBodyConfig::default(),
            activator: ActivatorConfig::default(),
            spikes: SpikesConfig::default(),
            flamethrower: FlamethrowerConfig::default(),
            door: DoorConfig::default(),
            platform: PlatformConfig::default(),
            pushable_box: BoxConfig::default(),
            laser: LaserConfig::default(),
            mirror: MirrorConfig::default(),
            mob: MobConfig::default(),
            checkpoint: CheckpointConfig::default(),
        }
    }
}

impl GameConstants {
    /// Parse constants from JSON text. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a constants file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
