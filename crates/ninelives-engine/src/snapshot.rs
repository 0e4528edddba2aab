//! Point-in-time level snapshots used by undo.
//!
//! A [`LevelState`] holds one [`ObstacleSnapshot`] per live obstacle other
//! than dead bodies, keyed by [`ObstacleId`], plus a list of dead-body
//! records, the life count and the current checkpoint. Kind-specific fields
//! live in the tagged [`KindState`] union, so a snapshot can only be applied
//! to an obstacle of the same kind.
//!
//! # Restore contract
//!
//! Obstacles are never rebuilt from a snapshot: state is written back into
//! the *same* ids. Dead bodies are the exception. They are all removed and
//! rebuilt from their records (see [`crate::level::Level::load_level_state`]).
//!
//! Contact-derived data (ground sets, wall counters, press counts, hazard
//! counts, spirit regions) is deliberately absent: contacts re-derive it
//! during the following steps.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::obstacle::activator::ActivatorState;
use crate::obstacle::cat::CatSnapshot;
use crate::obstacle::dead_body::DeadBodyState;
use crate::obstacle::door::DoorState;
use crate::obstacle::hazard::{FlamethrowerState, SpikesState};
use crate::obstacle::laser::LaserState;
use crate::obstacle::mob::MobState;
use crate::obstacle::platform::{PlatformState, PushableBoxState};
use crate::obstacle::region::CheckpointState;
use crate::obstacle::{Obstacle, ObstacleId, ObstacleKind};
use crate::physics::{BodyContext, BodyState, PhysicsWorld};

// ---------------------------------------------------------------------------
// KindState
// ---------------------------------------------------------------------------

/// Kind-specific part of an obstacle snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KindState {
    /// The player.
    Cat(CatSnapshot),
    /// Button, switch or timed button.
    Activator(ActivatorState),
    /// Door.
    Door(DoorState),
    /// Spikes.
    Spikes(SpikesState),
    /// Flamethrower, including its flame body.
    Flamethrower(FlamethrowerState),
    /// Laser emitter.
    Laser(LaserState),
    /// Moving platform.
    Platform(PlatformState),
    /// Pushable box.
    PushableBox(PushableBoxState),
    /// Enemy.
    Mob(MobState),
    /// Checkpoint.
    Checkpoint(CheckpointState),
    /// Kinds with nothing beyond their body state.
    Static,
}

impl KindState {
    /// Capture the kind-specific state of `kind`.
    ///
    /// Returns `None` for dead bodies, which are snapshotted separately, and
    /// for flamethrowers whose flame body is gone.
    pub fn capture(kind: &ObstacleKind, physics: &PhysicsWorld) -> Option<Self> {
        Some(match kind {
            ObstacleKind::Cat(cat) => KindState::Cat(cat.state_snapshot()),
            ObstacleKind::DeadBody(_) => return None,
            ObstacleKind::Activator(activator) => KindState::Activator(activator.state()),
            ObstacleKind::Door(door) => KindState::Door(door.state()),
            ObstacleKind::Spikes(spikes) => KindState::Spikes(spikes.state()),
            ObstacleKind::Flamethrower(flamethrower) => {
                KindState::Flamethrower(flamethrower.state(physics)?)
            }
            ObstacleKind::Laser(laser) => KindState::Laser(laser.state()),
            ObstacleKind::Platform(platform) => KindState::Platform(platform.state()),
            ObstacleKind::PushableBox(pushable) => KindState::PushableBox(pushable.state()),
            ObstacleKind::Mob(mob) => KindState::Mob(mob.state()),
            ObstacleKind::Checkpoint(checkpoint) => KindState::Checkpoint(checkpoint.state()),
            ObstacleKind::Wall(_)
            | ObstacleKind::Mirror(_)
            | ObstacleKind::SpiritRegion(_)
            | ObstacleKind::CameraTile(_)
            | ObstacleKind::Exit(_) => KindState::Static,
        })
    }

    /// Write this state into `kind`. Returns `false` (and changes nothing)
    /// if the kinds do not match.
    pub fn apply(&self, kind: &mut ObstacleKind, ctx: &mut BodyContext<'_>) -> bool {
        match (self, kind) {
            (KindState::Cat(state), ObstacleKind::Cat(cat)) => cat.restore(state, ctx),
            (KindState::Activator(state), ObstacleKind::Activator(activator)) => activator.restore(state),
            (KindState::Door(state), ObstacleKind::Door(door)) => door.restore(state, ctx),
            (KindState::Spikes(state), ObstacleKind::Spikes(spikes)) => spikes.restore(state, ctx),
            (KindState::Flamethrower(state), ObstacleKind::Flamethrower(flamethrower)) => {
                flamethrower.restore(state, ctx)
            }
            (KindState::Laser(state), ObstacleKind::Laser(laser)) => laser.restore(state),
            (KindState::Platform(state), ObstacleKind::Platform(platform)) => platform.restore(state, ctx),
            (KindState::PushableBox(state), ObstacleKind::PushableBox(pushable)) => {
                pushable.restore(state, ctx)
            }
            (KindState::Mob(state), ObstacleKind::Mob(mob)) => mob.restore(state),
            (KindState::Checkpoint(state), ObstacleKind::Checkpoint(checkpoint)) => {
                checkpoint.restore(state)
            }
            (
                KindState::Static,
                ObstacleKind::Wall(_)
                | ObstacleKind::Mirror(_)
                | ObstacleKind::SpiritRegion(_)
                | ObstacleKind::CameraTile(_)
                | ObstacleKind::Exit(_),
            ) => {}
            _ => return false,
        }
        true
    }

    /// Activation recorded in this state, for activatable kinds.
    pub fn activated(&self) -> Option<bool> {
        match self {
            KindState::Door(s) => Some(s.activation.activated),
            KindState::Spikes(s) => Some(s.activation.activated),
            KindState::Flamethrower(s) => Some(s.activation.activated),
            KindState::Laser(s) => Some(s.activation.activated),
            KindState::Platform(s) => Some(s.activation.activated),
            KindState::PushableBox(s) => Some(s.activation.activated),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Snapshot of one obstacle other than a dead body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleSnapshot {
    /// Debug name.
    pub name: String,
    /// Main body.
    pub body: BodyState,
    /// Kind-specific state.
    pub kind: KindState,
}

impl ObstacleSnapshot {
    /// Capture `obstacle`. `None` for dead bodies and obstacles whose body
    /// is gone.
    pub fn capture(obstacle: &Obstacle, physics: &PhysicsWorld) -> Option<Self> {
        Some(Self {
            name: obstacle.name.clone(),
            body: physics.body_state(obstacle.body)?,
            kind: KindState::capture(&obstacle.kind, physics)?,
        })
    }

    /// Write the snapshot back into `obstacle`: kind state first, then the
    /// body, so the saved velocity wins over any the kind sets.
    /// Returns `false` if the kinds do not match.
    pub fn apply(&self, obstacle: &mut Obstacle, physics: &mut PhysicsWorld) -> bool {
        let mut ctx = BodyContext::new(physics, obstacle.body);
        if !self.kind.apply(&mut obstacle.kind, &mut ctx) {
            return false;
        }
        ctx.physics.apply_body_state(obstacle.body, &self.body);
        obstacle.removed = false;
        obstacle.base_velocity = Vec2::ZERO;
        true
    }
}

/// Record from which a dead body is rebuilt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadBodySnapshot {
    /// Body state.
    pub body: BodyState,
    /// Persistent dead-body fields.
    pub state: DeadBodyState,
    /// Welds as (spikes, anchor in the dead body's local frame).
    pub welds: Vec<(ObstacleId, Vec2)>,
}

impl DeadBodySnapshot {
    /// Capture a dead body. `None` for other kinds or a missing body.
    pub fn capture(obstacle: &Obstacle, physics: &PhysicsWorld) -> Option<Self> {
        let dead = obstacle.kind.as_dead_body()?;
        Some(Self {
            body: physics.body_state(obstacle.body)?,
            state: dead.state(),
            welds: dead
                .welds()
                .iter()
                .filter(|w| physics.contains_joint(w.joint))
                .map(|w| (w.spikes, w.local_anchor))
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// LevelState
// ---------------------------------------------------------------------------

/// Immutable capture of a level at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelState {
    /// Every live obstacle except dead bodies.
    pub obstacles: BTreeMap<ObstacleId, ObstacleSnapshot>,
    /// Dead bodies, in arena order.
    pub dead_bodies: Vec<DeadBodySnapshot>,
    /// Lives remaining.
    pub lives: u32,
    /// Current checkpoint, if any was reached.
    pub checkpoint: Option<ObstacleId>,
}

impl LevelState {
    /// Capture every obstacle in the arena. Obstacles already marked removed
    /// are skipped.
    pub fn capture<'a>(
        obstacles: impl IntoIterator<Item = (ObstacleId, &'a Obstacle)>,
        physics: &PhysicsWorld,
        lives: u32,
        checkpoint: Option<ObstacleId>,
    ) -> Self {
        let mut state = Self {
            obstacles: BTreeMap::new(),
            dead_bodies: Vec::new(),
            lives,
            checkpoint,
        };
        for (id, obstacle) in obstacles {
            if obstacle.removed {
                continue;
            }
            if let Some(dead) = DeadBodySnapshot::capture(obstacle, physics) {
                state.dead_bodies.push(dead);
            } else if let Some(snapshot) = ObstacleSnapshot::capture(obstacle, physics) {
                state.obstacles.insert(id, snapshot);
            }
        }
        state
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Whether an activatable's live state matches `state`.
pub(crate) fn activation_matches(kind: &ObstacleKind, state: &KindState) -> bool {
    match (kind.as_activatable(), state.activated()) {
        (Some(live), Some(saved)) => live.is_activated() == saved,
        (None, None) => true,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
