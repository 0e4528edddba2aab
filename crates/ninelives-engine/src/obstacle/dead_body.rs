//! Corpses left behind by the cat.
//!
//! A dead body is switchable while nothing hazardous touches it: no spikes,
//! no flame and no laser beam. Hazard contacts are counted because a body
//! can rest on several spikes at once.

use std::collections::BTreeSet;

use glam::Vec2;
use ninelives_data::constants::DeadBodyConfig;
use rapier2d::prelude::ImpulseJointHandle;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::obstacle::{GroundContacts, ObstacleId};
use crate::physics::{BodyContext, BodyKind, BodySpec, ColliderSpec, FixtureRole, PhysicsWorld, ShapeSpec};

const GROUND_SENSOR_SHRINK: f32 = 0.6;
const GROUND_SENSOR_HEIGHT: f32 = 0.05;

/// A weld pinning a dead body to spikes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weld {
    /// The spikes.
    pub spikes: ObstacleId,
    /// The joint.
    pub joint: ImpulseJointHandle,
    /// Weld point in the dead body's local frame.
    pub local_anchor: Vec2,
}

/// Snapshot of the fields that contacts do not re-derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadBodyState {
    /// Facing.
    pub facing_right: bool,
    /// Whether the body is burning away.
    pub burning: bool,
    /// Ticks spent burning.
    pub burn_ticks: u32,
}

/// A switchable corpse.
#[derive(Debug, Clone)]
pub struct DeadBody {
    config: DeadBodyConfig,
    facing_right: bool,
    ground: GroundContacts,
    hazards: u32,
    touching_laser: bool,
    burning: bool,
    burn_ticks: u32,
    spirit_regions: BTreeSet<ObstacleId>,
    welds: Vec<Weld>,
}

impl DeadBody {
    /// A fresh, unharmed body.
    pub fn new(config: DeadBodyConfig, facing_right: bool) -> Self {
        Self {
            config,
            facing_right,
            ground: GroundContacts::default(),
            hazards: 0,
            touching_laser: false,
            burning: false,
            burn_ticks: 0,
            spirit_regions: BTreeSet::new(),
            welds: Vec::new(),
        }
    }

    /// Facing.
    pub fn is_facing_right(&self) -> bool {
        self.facing_right
    }

    /// Ground contacts.
    pub fn ground(&self) -> &GroundContacts {
        &self.ground
    }

    /// Mutable ground contacts.
    pub fn ground_mut(&mut self) -> &mut GroundContacts {
        &mut self.ground
    }

    /// Whether the cat may switch into this body.
    pub fn is_switchable(&self) -> bool {
        self.hazards == 0 && !self.touching_laser
    }

    /// Number of hazard fixtures touching the body.
    pub fn hazards(&self) -> u32 {
        self.hazards
    }

    /// A hazard started touching.
    pub fn add_hazard(&mut self) {
        self.hazards += 1;
    }

    /// A hazard stopped touching. Unbalanced calls are logged and ignored.
    pub fn remove_hazard(&mut self) {
        match self.hazards.checked_sub(1) {
            Some(hazards) => self.hazards = hazards,
            None => warn!("dead body hazard released more often than touched"),
        }
    }

    /// Whether a laser beam ended on this body during the current tick.
    pub fn is_touching_laser(&self) -> bool {
        self.touching_laser
    }

    /// Set by the laser pass; cleared at the start of the next one.
    pub fn set_touching_laser(&mut self, touching: bool) {
        self.touching_laser = touching;
    }

    /// Whether the body is burning away.
    pub fn is_burning(&self) -> bool {
        self.burning
    }

    /// Start or stop burning. The burn counter is kept when burning stops.
    pub fn set_burning(&mut self, burning: bool) {
        self.burning = burning;
    }

    /// Ticks spent burning.
    pub fn burn_ticks(&self) -> u32 {
        self.burn_ticks
    }

    /// Spirit regions currently occupied.
    pub fn spirit_regions(&self) -> &BTreeSet<ObstacleId> {
        &self.spirit_regions
    }

    /// Entered a spirit region.
    pub fn enter_region(&mut self, region: ObstacleId) {
        self.spirit_regions.insert(region);
    }

    /// Left a spirit region.
    pub fn leave_region(&mut self, region: ObstacleId) {
        self.spirit_regions.remove(&region);
    }

    /// Whether this body shares at least one spirit region with `regions`.
    pub fn shares_region(&self, regions: &BTreeSet<ObstacleId>) -> bool {
        !self.spirit_regions.is_disjoint(regions)
    }

    /// Welds attached to this body.
    pub fn welds(&self) -> &[Weld] {
        &self.welds
    }

    /// Record a weld created for this body.
    pub fn add_weld(&mut self, weld: Weld) {
        self.welds.push(weld);
    }

    /// Whether the body is already welded to `spikes`.
    pub fn is_welded_to(&self, spikes: ObstacleId) -> bool {
        self.welds.iter().any(|w| w.spikes == spikes)
    }

    /// Forget welds whose joint no longer exists.
    pub fn prune_welds(&mut self, physics: &PhysicsWorld) {
        self.welds.retain(|w| physics.contains_joint(w.joint));
    }

    /// Advance one tick. Returns `true` once the body has burnt away.
    pub fn update(&mut self, ctx: &mut BodyContext<'_>) -> bool {
        if self.burning {
            self.burn_ticks += 1;
            if self.burn_ticks >= self.config.burn_ticks {
                return true;
            }
        }
        let v = ctx.linvel();
        ctx.set_linvel(Vec2::new(v.x / self.config.damping, v.y));
        false
    }

    /// Capture the fields contacts do not re-derive.
    pub fn state(&self) -> DeadBodyState {
        DeadBodyState {
            facing_right: self.facing_right,
            burning: self.burning,
            burn_ticks: self.burn_ticks,
        }
    }

    /// Restore a captured state.
    pub fn restore(&mut self, state: &DeadBodyState) {
        self.facing_right = state.facing_right;
        self.burning = state.burning;
        self.burn_ticks = state.burn_ticks;
    }
}

/// Dynamic, rotation-locked body with ground, hitbox and center sensors.
pub(crate) fn body(position: Vec2, linvel: Vec2, config: &DeadBodyConfig) -> (BodySpec, Vec<ColliderSpec>) {
    let (w, h) = (config.width, config.height);
    let spec = BodySpec::new(BodyKind::Dynamic, position)
        .linvel(linvel)
        .fixed_rotation();
    let colliders = vec![
        ColliderSpec::solid(FixtureRole::Body, ShapeSpec::rect(w, h))
            .density(config.density)
            .friction(config.friction),
        ColliderSpec::sensor(
            FixtureRole::GroundSensor,
            ShapeSpec::rect(w * GROUND_SENSOR_SHRINK, GROUND_SENSOR_HEIGHT),
        )
        .at(Vec2::new(0.0, -h * 0.5)),
        ColliderSpec::sensor(
            FixtureRole::Hitbox,
            ShapeSpec::rect(w + 2.0 * config.hitbox_margin, h + 2.0 * config.hitbox_margin),
        ),
        ColliderSpec::sensor(
            FixtureRole::CenterSensor,
            ShapeSpec::rect(config.center_sensor_size, config.center_sensor_size),
        ),
    ];
    (spec, colliders)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
