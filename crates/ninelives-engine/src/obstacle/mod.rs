//! Obstacles: identifiers, the arena and the closed set of kinds.
//!
//! An [`ObstacleId`] is a 64-bit handle that packs a *generation* counter in
//! the high 32 bits and an *index* in the low 32 bits. The generation is
//! bumped every time a slot is recycled, so ids held by queued commands or
//! stale contact events never resolve to a newer obstacle.
//!
//! Every obstacle owns one rapier body (plus, for flamethrowers, the flame
//! body) and one [`ObstacleKind`] variant carrying the kind-specific state.
//! Capabilities that cut across kinds, activation and ground contacts, are
//! exposed through [`ObstacleKind::as_activatable_mut`] and
//! [`ObstacleKind::ground_contacts_mut`].

pub mod activator;
pub mod cat;
pub mod dead_body;
pub mod door;
pub mod hazard;
pub mod laser;
pub mod mob;
pub mod platform;
pub mod region;

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use glam::Vec2;
use rapier2d::prelude::RigidBodyHandle;
use serde::{Deserialize, Serialize};

use crate::activation::Activatable;
use crate::physics::{BodyContext, FixtureTag};

pub use activator::{Activator, ActivatorKind};
pub use cat::{Cat, CatState};
pub use dead_body::{DeadBody, Weld};
pub use door::{Door, DoorMotion};
pub use hazard::{Flamethrower, Spikes};
pub use laser::{Laser, Mirror};
pub use mob::Mob;
pub use platform::{Platform, PushableBox};
pub use region::{CameraTile, Checkpoint, Exit, ExitKind, SpiritRegion, Wall};

// ---------------------------------------------------------------------------
// ObstacleId
// ---------------------------------------------------------------------------

/// A generational obstacle identifier.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId(u64);

impl ObstacleId {
    /// Construct an id from an index and generation.
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// The index portion (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// The generation portion (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ObstacleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObstacleId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for ObstacleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// GroundContacts
// ---------------------------------------------------------------------------

/// The set of fixtures a movable object's ground sensor is touching.
///
/// The object is grounded while the set is non-empty, so standing across two
/// overlapping grounds only ends when the last one is left.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundContacts {
    fixtures: BTreeSet<FixtureTag>,
}

impl GroundContacts {
    /// Record a ground contact. Returns `true` if this one grounded the
    /// object (the set was empty).
    pub fn add(&mut self, fixture: FixtureTag) -> bool {
        let was_empty = self.fixtures.is_empty();
        self.fixtures.insert(fixture) && was_empty
    }

    /// Forget a ground contact. Returns `true` if the object is no longer
    /// grounded because of it.
    pub fn remove(&mut self, fixture: FixtureTag) -> bool {
        self.fixtures.remove(&fixture) && self.fixtures.is_empty()
    }

    /// Whether any ground is being touched.
    pub fn is_grounded(&self) -> bool {
        !self.fixtures.is_empty()
    }

    /// Number of distinct ground fixtures.
    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    /// `true` when not grounded.
    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// Ground fixtures in tag order.
    pub fn iter(&self) -> impl Iterator<Item = &FixtureTag> {
        self.fixtures.iter()
    }

    /// Drop every contact.
    pub fn clear(&mut self) {
        self.fixtures.clear();
    }
}

// ---------------------------------------------------------------------------
// ObstacleKind
// ---------------------------------------------------------------------------

/// Every kind of obstacle a level can contain.
#[derive(Debug, Clone)]
pub enum ObstacleKind {
    /// The player.
    Cat(Cat),
    /// A corpse the player can switch into.
    DeadBody(DeadBody),
    /// Static terrain.
    Wall(Wall),
    /// Kinematic moving platform.
    Platform(Platform),
    /// Button, switch or timed button.
    Activator(Activator),
    /// Laser emitter.
    Laser(Laser),
    /// Laser mirror.
    Mirror(Mirror),
    /// Spikes.
    Spikes(Spikes),
    /// Flamethrower.
    Flamethrower(Flamethrower),
    /// Door.
    Door(Door),
    /// Pushable box.
    PushableBox(PushableBox),
    /// Checkpoint.
    Checkpoint(Checkpoint),
    /// Spirit region.
    SpiritRegion(SpiritRegion),
    /// Camera zoom trigger.
    CameraTile(CameraTile),
    /// Enemy.
    Mob(Mob),
    /// Level exit.
    Exit(Exit),
}

/// Data-less mirror of [`ObstacleKind`], used for contact dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleClass {
    /// See [`ObstacleKind::Cat`].
    Cat,
    /// See [`ObstacleKind::DeadBody`].
    DeadBody,
    /// See [`ObstacleKind::Wall`].
    Wall,
    /// See [`ObstacleKind::Platform`].
    Platform,
    /// See [`ObstacleKind::Activator`].
    Activator,
    /// See [`ObstacleKind::Laser`].
    Laser,
    /// See [`ObstacleKind::Mirror`].
    Mirror,
    /// See [`ObstacleKind::Spikes`].
    Spikes,
    /// See [`ObstacleKind::Flamethrower`].
    Flamethrower,
    /// See [`ObstacleKind::Door`].
    Door,
    /// See [`ObstacleKind::PushableBox`].
    PushableBox,
    /// See [`ObstacleKind::Checkpoint`].
    Checkpoint,
    /// See [`ObstacleKind::SpiritRegion`].
    SpiritRegion,
    /// See [`ObstacleKind::CameraTile`].
    CameraTile,
    /// See [`ObstacleKind::Mob`].
    Mob,
    /// See [`ObstacleKind::Exit`].
    Exit,
}

macro_rules! kind_accessors {
    ($($variant:ident => $ty:ty, $get:ident, $get_mut:ident;)*) => {
        impl ObstacleKind {
            /// Data-less class of this kind.
            pub fn class(&self) -> ObstacleClass {
                match self {
                    $(ObstacleKind::$variant(_) => ObstacleClass::$variant,)*
                }
            }

            $(
                #[doc = concat!("The [`", stringify!($ty), "`] payload, if this is one.")]
                pub fn $get(&self) -> Option<&$ty> {
                    match self {
                        ObstacleKind::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                #[doc = concat!("Mutable [`", stringify!($ty), "`] payload, if this is one.")]
                pub fn $get_mut(&mut self) -> Option<&mut $ty> {
                    match self {
                        ObstacleKind::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            )*
        }
    };
}

kind_accessors! {
    Cat => Cat, as_cat, as_cat_mut;
    DeadBody => DeadBody, as_dead_body, as_dead_body_mut;
    Wall => Wall, as_wall, as_wall_mut;
    Platform => Platform, as_platform, as_platform_mut;
    Activator => Activator, as_activator, as_activator_mut;
    Laser => Laser, as_laser, as_laser_mut;
    Mirror => Mirror, as_mirror, as_mirror_mut;
    Spikes => Spikes, as_spikes, as_spikes_mut;
    Flamethrower => Flamethrower, as_flamethrower, as_flamethrower_mut;
    Door => Door, as_door, as_door_mut;
    PushableBox => PushableBox, as_pushable_box, as_pushable_box_mut;
    Checkpoint => Checkpoint, as_checkpoint, as_checkpoint_mut;
    SpiritRegion => SpiritRegion, as_spirit_region, as_spirit_region_mut;
    CameraTile => CameraTile, as_camera_tile, as_camera_tile_mut;
    Mob => Mob, as_mob, as_mob_mut;
    Exit => Exit, as_exit, as_exit_mut;
}

impl ObstacleKind {
    /// The activation capability, for kinds an activator can drive.
    pub fn as_activatable(&self) -> Option<&dyn Activatable> {
        match self {
            ObstacleKind::Door(door) => Some(door),
            ObstacleKind::Spikes(spikes) => Some(spikes),
            ObstacleKind::Flamethrower(flamethrower) => Some(flamethrower),
            ObstacleKind::Laser(laser) => Some(laser),
            ObstacleKind::Platform(platform) => Some(platform),
            ObstacleKind::PushableBox(pushable) => Some(pushable),
            _ => None,
        }
    }

    /// Mutable activation capability.
    pub fn as_activatable_mut(&mut self) -> Option<&mut dyn Activatable> {
        match self {
            ObstacleKind::Door(door) => Some(door),
            ObstacleKind::Spikes(spikes) => Some(spikes),
            ObstacleKind::Flamethrower(flamethrower) => Some(flamethrower),
            ObstacleKind::Laser(laser) => Some(laser),
            ObstacleKind::Platform(platform) => Some(platform),
            ObstacleKind::PushableBox(pushable) => Some(pushable),
            _ => None,
        }
    }

    /// Ground contacts of movable kinds (cat, dead bodies, boxes).
    pub fn ground_contacts(&self) -> Option<&GroundContacts> {
        match self {
            ObstacleKind::Cat(cat) => Some(cat.ground()),
            ObstacleKind::DeadBody(body) => Some(body.ground()),
            ObstacleKind::PushableBox(pushable) => Some(pushable.ground()),
            _ => None,
        }
    }

    /// Mutable ground contacts of movable kinds.
    pub fn ground_contacts_mut(&mut self) -> Option<&mut GroundContacts> {
        match self {
            ObstacleKind::Cat(cat) => Some(cat.ground_mut()),
            ObstacleKind::DeadBody(body) => Some(body.ground_mut()),
            ObstacleKind::PushableBox(pushable) => Some(pushable.ground_mut()),
            _ => None,
        }
    }

    /// Whether objects standing on this kind inherit its velocity.
    pub fn carries_riders(&self) -> bool {
        matches!(
            self,
            ObstacleKind::Platform(_)
                | ObstacleKind::PushableBox(_)
                | ObstacleKind::DeadBody(_)
                | ObstacleKind::Cat(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Obstacle
// ---------------------------------------------------------------------------

/// One physical entity in the level.
#[derive(Debug, Clone)]
pub struct Obstacle {
    /// Debug name, e.g. `"door3"`.
    pub name: String,
    /// Main rapier body.
    pub body: RigidBodyHandle,
    /// Set to schedule removal at the next garbage-collection pass.
    pub removed: bool,
    /// Velocity inherited from whatever this obstacle stands on.
    pub base_velocity: Vec2,
    /// Kind-specific state.
    pub kind: ObstacleKind,
}

impl Obstacle {
    /// Wrap a kind around a freshly created body.
    pub fn new(name: impl Into<String>, body: RigidBodyHandle, kind: ObstacleKind) -> Self {
        Self {
            name: name.into(),
            body,
            removed: false,
            base_velocity: Vec2::ZERO,
            kind,
        }
    }

    /// Bodies other than [`body`](Self::body) owned by this obstacle.
    pub fn extra_bodies(&self) -> Vec<RigidBodyHandle> {
        match &self.kind {
            ObstacleKind::Flamethrower(flamethrower) => vec![flamethrower.flame_body()],
            _ => Vec::new(),
        }
    }

    /// Per-tick update after the physics step. Marks the obstacle removed
    /// when its kind says it has expired.
    pub fn update(&mut self, ctx: &mut BodyContext<'_>, dt: f32) {
        let expired = match &mut self.kind {
            ObstacleKind::DeadBody(body) => body.update(ctx),
            ObstacleKind::Door(door) => {
                door.update(ctx);
                false
            }
            ObstacleKind::Platform(platform) => {
                platform.update(ctx, dt);
                false
            }
            _ => false,
        };
        if expired {
            self.removed = true;
        }
    }
}

// ---------------------------------------------------------------------------
// ObstacleArena
// ---------------------------------------------------------------------------

/// Slot storage for obstacles with generational ids.
///
/// Free slots are kept in a FIFO queue so that generations are spread out
/// over time rather than concentrated on a hot index. Removal is O(1).
#[derive(Debug, Default)]
pub struct ObstacleArena {
    slots: Vec<Option<Obstacle>>,
    generations: Vec<u32>,
    free_indices: VecDeque<u32>,
    len: usize,
}

impl ObstacleArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> ObstacleId {
        if let Some(index) = self.free_indices.pop_front() {
            ObstacleId::new(index, self.generations[index as usize])
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(None);
            self.generations.push(0);
            ObstacleId::new(index, 0)
        }
    }

    fn release(&mut self, index: u32) {
        let slot = index as usize;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free_indices.push_back(index);
    }

    /// Insert an obstacle built by `make`, which receives the id the
    /// obstacle will have (colliders need it for their tags). If `make`
    /// fails the id is released and the error returned.
    pub fn try_insert_with<E>(
        &mut self,
        make: impl FnOnce(ObstacleId) -> Result<Obstacle, E>,
    ) -> Result<ObstacleId, E> {
        let id = self.allocate();
        match make(id) {
            Ok(obstacle) => {
                self.slots[id.index() as usize] = Some(obstacle);
                self.len += 1;
                Ok(id)
            }
            Err(err) => {
                self.release(id.index());
                Err(err)
            }
        }
    }

    /// Remove an obstacle, returning it. Stale ids return `None`.
    pub fn remove(&mut self, id: ObstacleId) -> Option<Obstacle> {
        if !self.contains(id) {
            return None;
        }
        let obstacle = self.slots[id.index() as usize].take();
        self.release(id.index());
        self.len -= 1;
        obstacle
    }

    /// Returns `true` if `id` refers to a live obstacle.
    pub fn contains(&self, id: ObstacleId) -> bool {
        let idx = id.index() as usize;
        idx < self.slots.len()
            && self.generations[idx] == id.generation()
            && self.slots[idx].is_some()
    }

    /// Look up an obstacle.
    pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
        if !self.contains(id) {
            return None;
        }
        self.slots[id.index() as usize].as_ref()
    }

    /// Look up an obstacle mutably.
    pub fn get_mut(&mut self, id: ObstacleId) -> Option<&mut Obstacle> {
        if !self.contains(id) {
            return None;
        }
        self.slots[id.index() as usize].as_mut()
    }

    /// Number of live obstacles.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if the arena holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live obstacles in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ObstacleId, &Obstacle)> {
        let generations = &self.generations;
        self.slots.iter().enumerate().filter_map(move |(i, slot)| {
            slot.as_ref()
                .map(|o| (ObstacleId::new(i as u32, generations[i]), o))
        })
    }

    /// Live obstacles in slot order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ObstacleId, &mut Obstacle)> {
        let generations = &self.generations;
        self.slots.iter_mut().enumerate().filter_map(move |(i, slot)| {
            slot.as_mut()
                .map(|o| (ObstacleId::new(i as u32, generations[i]), o))
        })
    }

    /// Ids of live obstacles in slot order.
    pub fn ids(&self) -> Vec<ObstacleId> {
        self.iter().map(|(id, _)| id).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
