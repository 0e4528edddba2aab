//! Contact filtering and contact response.
//!
//! [`should_collide`] is the static pair filter installed into rapier. The
//! [`ContactController`] consumes the started/stopped events of one physics
//! step and mutates per-obstacle counters and sets: ground contacts, wall
//! contacts, hazard counts, spirit regions and activator presses.
//!
//! Every event is handled twice, once per ordering of its two fixtures, so
//! each rule only has to look at "my fixture is X, the other one is Y".
//!
//! Anything that needs a new body or joint is queued on the
//! [`CommandQueue`]; anything that needs level-wide state (death,
//! checkpoints, exits, the camera) is reported as a [`ContactOutcome`].
//!
//! A malformed or stale fixture only loses its own contact: the error is
//! logged and the remaining events are still processed.

use glam::Vec2;
use tracing::{debug, warn};

use crate::command::{CommandQueue, CommandReason, LevelCommand};
use crate::obstacle::{ExitKind, ObstacleArena, ObstacleClass, ObstacleId, ObstacleKind};
use crate::physics::{BodyContext, ContactEvent, FixtureRole, FixtureTag, PhysicsWorld, RawFixture};
use crate::ContactError;

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Whether two fixtures may interact at all.
///
/// Flames never press activators, and the solid base of spikes lets hazard
/// sensors through so that bodies resting on spikes still register the
/// lethal part.
pub fn should_collide(a: FixtureRole, b: FixtureRole) -> bool {
    use FixtureRole::{ActivatorSensor, FlameSensor, Hitbox, SpikesSolid};
    !matches!(
        (a, b),
        (FlameSensor, ActivatorSensor)
            | (ActivatorSensor, FlameSensor)
            | (SpikesSolid, Hitbox)
            | (Hitbox, SpikesSolid)
    )
}

// ---------------------------------------------------------------------------
// ContactOutcome
// ---------------------------------------------------------------------------

/// Level-wide consequences of a contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactOutcome {
    /// The cat touched something lethal.
    CatDied,
    /// The cat touched a checkpoint.
    CheckpointReached(ObstacleId),
    /// The cat reached an exit.
    ExitReached(ExitKind),
    /// The cat entered a camera tile.
    CameraZoom(f32),
}

/// Counters over the lifetime of a controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactStats {
    /// Events handled.
    pub processed: u64,
    /// Events (or halves of events) dropped because of an error.
    pub failed: u64,
}

// ---------------------------------------------------------------------------
// ContactController
// ---------------------------------------------------------------------------

/// One side of a contact, decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureRef {
    /// Owner and role.
    pub tag: FixtureTag,
    /// Whether the fixture is a sensor.
    pub sensor: bool,
}

impl FixtureRef {
    fn decode(raw: RawFixture) -> Result<Self, ContactError> {
        Ok(Self {
            tag: FixtureTag::decode(raw.user_data)?,
            sensor: raw.sensor,
        })
    }
}

/// What a rule needs to know about the other side, read before the own
/// side is borrowed mutably. `class` is `None` if the owner is gone.
#[derive(Debug, Clone, Copy)]
struct Peer {
    fixture: FixtureRef,
    class: Option<ObstacleClass>,
    climbable: bool,
    zoom: Option<f32>,
    exit: Option<ExitKind>,
}

impl Peer {
    fn read(fixture: FixtureRef, arena: &ObstacleArena) -> Self {
        let kind = arena.get(fixture.tag.obstacle).map(|o| &o.kind);
        Self {
            fixture,
            class: kind.map(ObstacleKind::class),
            climbable: kind
                .and_then(ObstacleKind::as_wall)
                .is_some_and(|w| w.is_climbable()),
            zoom: kind.and_then(ObstacleKind::as_camera_tile).map(|t| t.zoom()),
            exit: kind.and_then(ObstacleKind::as_exit).map(|e| e.kind()),
        }
    }

    fn role(&self) -> FixtureRole {
        self.fixture.tag.role
    }

    fn is(&self, class: ObstacleClass) -> bool {
        self.class == Some(class)
    }

    fn is_lethal(&self) -> bool {
        matches!(self.role(), FixtureRole::SpikesPointy | FixtureRole::FlameSensor)
            || (self.is(ObstacleClass::Mob) && self.role() == FixtureRole::Body)
    }
}

/// Turns physics contact events into gameplay state changes.
#[derive(Debug, Default)]
pub struct ContactController {
    stats: ContactStats,
}

impl ContactController {
    /// Create a controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifetime counters.
    pub fn stats(&self) -> ContactStats {
        self.stats
    }

    /// Handle the events of one physics step, in order.
    pub fn process(
        &mut self,
        events: &[ContactEvent],
        arena: &mut ObstacleArena,
        physics: &mut PhysicsWorld,
        commands: &mut CommandQueue,
    ) -> Vec<ContactOutcome> {
        let mut outcomes = Vec::new();
        for event in events {
            self.stats.processed += 1;
            let (first, second) = match (FixtureRef::decode(event.first), FixtureRef::decode(event.second)) {
                (Ok(first), Ok(second)) => (first, second),
                (Err(error), _) | (_, Err(error)) => {
                    self.stats.failed += 1;
                    warn!(%error, started = event.started, "dropping contact");
                    continue;
                }
            };
            for (me, other) in [(first, second), (second, first)] {
                let result = if event.started {
                    self.begin_contact(me, other, arena, physics, commands, &mut outcomes)
                } else {
                    self.end_contact(me, other, arena);
                    Ok(())
                };
                if let Err(error) = result {
                    self.stats.failed += 1;
                    warn!(%error, "dropping half of a contact");
                }
            }
        }
        outcomes
    }

    /// Apply the begin rules for `me` touching `other`.
    ///
    /// # Errors
    ///
    /// [`ContactError::StaleObstacle`] if `me` no longer exists.
    pub fn begin_contact(
        &mut self,
        me: FixtureRef,
        other: FixtureRef,
        arena: &mut ObstacleArena,
        physics: &mut PhysicsWorld,
        commands: &mut CommandQueue,
        outcomes: &mut Vec<ContactOutcome>,
    ) -> Result<(), ContactError> {
        let peer = Peer::read(other, arena);
        let me_id = me.tag.obstacle;
        let same_obstacle = other.tag.obstacle == me_id;
        let obstacle = arena
            .get_mut(me_id)
            .ok_or(ContactError::StaleObstacle { obstacle: me_id })?;
        let body = obstacle.body;

        // Ground sensors of movable objects.
        if me.tag.role == FixtureRole::GroundSensor && !other.sensor && !same_obstacle {
            if let Some(ground) = obstacle.kind.ground_contacts_mut() {
                let landed = ground.add(other.tag);
                if landed {
                    if let ObstacleKind::Cat(cat) = &mut obstacle.kind {
                        cat.land(&mut BodyContext::new(physics, body));
                        debug!(ground = %other.tag.obstacle, "cat landed");
                    }
                }
            }
        }

        match &mut obstacle.kind {
            ObstacleKind::Cat(cat) => match me.tag.role {
                FixtureRole::LeftSensor | FixtureRole::RightSensor
                    if peer.climbable && !other.sensor =>
                {
                    cat.add_wall(me.tag.role);
                }
                FixtureRole::Body | FixtureRole::Hitbox => {
                    if peer.is_lethal() {
                        outcomes.push(ContactOutcome::CatDied);
                    }
                    if peer.role() == FixtureRole::CheckpointSensor {
                        outcomes.push(ContactOutcome::CheckpointReached(other.tag.obstacle));
                    }
                    if me.tag.role == FixtureRole::Body {
                        if peer.is(ObstacleClass::SpiritRegion) {
                            cat.enter_region(other.tag.obstacle);
                        }
                        if let Some(zoom) = peer.zoom {
                            outcomes.push(ContactOutcome::CameraZoom(zoom));
                        }
                        if let Some(exit) = peer.exit {
                            outcomes.push(ContactOutcome::ExitReached(exit));
                        }
                    }
                }
                _ => {}
            },
            ObstacleKind::DeadBody(dead) => match me.tag.role {
                FixtureRole::CenterSensor
                    if peer.role() == FixtureRole::SpikesCenter && peer.is(ObstacleClass::Spikes) =>
                {
                    // Anchored at the body's origin, where its center sensor sits.
                    let anchor = physics.position(body).unwrap_or(Vec2::ZERO);
                    commands.push(
                        LevelCommand::WeldToSpikes {
                            dead_body: me_id,
                            spikes: other.tag.obstacle,
                            anchor,
                        },
                        CommandReason::SpikesContact,
                    );
                }
                FixtureRole::Body => {
                    match peer.role() {
                        FixtureRole::SpikesPointy => dead.add_hazard(),
                        FixtureRole::FlameSensor => {
                            dead.add_hazard();
                            dead.set_burning(true);
                        }
                        _ => {}
                    }
                    if peer.is(ObstacleClass::SpiritRegion) {
                        dead.enter_region(other.tag.obstacle);
                    }
                }
                _ => {}
            },
            ObstacleKind::Mob(mob) => {
                let blocks = !other.sensor
                    && !same_obstacle
                    && !peer.is(ObstacleClass::Activator)
                    && !peer.is(ObstacleClass::Checkpoint)
                    && !peer.is(ObstacleClass::Cat);
                if me.tag.role == mob.front_sensor() && blocks {
                    mob.flip();
                }
            }
            ObstacleKind::Activator(activator) => {
                if me.tag.role == FixtureRole::ActivatorSensor && !other.sensor && !same_obstacle {
                    activator.add_press();
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Apply the end rules for `me` no longer touching `other`. Stale owners
    /// on either side are tolerated: removal ends every contact of a body.
    pub fn end_contact(
        &mut self,
        me: FixtureRef,
        other: FixtureRef,
        arena: &mut ObstacleArena,
    ) {
        let peer = Peer::read(other, arena);
        let me_id = me.tag.obstacle;
        let same_obstacle = other.tag.obstacle == me_id;
        let Some(obstacle) = arena.get_mut(me_id) else {
            debug!(obstacle = %me_id, "contact ended on a removed obstacle");
            return;
        };

        if me.tag.role == FixtureRole::GroundSensor && !other.sensor && !same_obstacle {
            if let Some(ground) = obstacle.kind.ground_contacts_mut() {
                let left = ground.remove(other.tag);
                if left {
                    if let ObstacleKind::Cat(cat) = &mut obstacle.kind {
                        cat.leave_ground();
                    }
                }
            }
        }

        match &mut obstacle.kind {
            ObstacleKind::Cat(cat) => match me.tag.role {
                FixtureRole::LeftSensor | FixtureRole::RightSensor
                    if peer.climbable && !other.sensor =>
                {
                    cat.remove_wall(me.tag.role);
                }
                FixtureRole::Body if peer.is(ObstacleClass::SpiritRegion) => {
                    cat.leave_region(other.tag.obstacle);
                }
                _ => {}
            },
            ObstacleKind::DeadBody(dead) if me.tag.role == FixtureRole::Body => {
                match peer.role() {
                    FixtureRole::SpikesPointy => dead.remove_hazard(),
                    FixtureRole::FlameSensor => {
                        dead.remove_hazard();
                        dead.set_burning(false);
                    }
                    _ => {}
                }
                if peer.is(ObstacleClass::SpiritRegion) {
                    dead.leave_region(other.tag.obstacle);
                }
            }
            ObstacleKind::Activator(activator) => {
                if me.tag.role == FixtureRole::ActivatorSensor && !other.sensor && !same_obstacle {
                    activator.remove_press();
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacle::{Activator, ActivatorKind, Cat, DeadBody, Flamethrower, Obstacle, Spikes, Wall};
    use ninelives_data::constants::{CatConfig, DeadBodyConfig};
    use ninelives_data::Direction;
    use rapier2d::prelude::RigidBodyHandle;

    struct Scene {
        arena: ObstacleArena,
        physics: PhysicsWorld,
        commands: CommandQueue,
        controller: ContactController,
    }

    impl Scene {
        fn new() -> Self {
            Self {
                arena: ObstacleArena::new(),
                physics: PhysicsWorld::new(Vec2::ZERO),
                commands: CommandQueue::new(),
                controller: ContactController::new(),
            }
        }

        fn add(&mut self, kind: ObstacleKind) -> ObstacleId {
            self.arena
                .try_insert_with(|_| Ok::<_, ()>(Obstacle::new("o", RigidBodyHandle::invalid(), kind)))
                .unwrap()
        }

        fn event(&mut self, a: (ObstacleId, FixtureRole, bool), b: (ObstacleId, FixtureRole, bool), started: bool) -> Vec<ContactOutcome> {
            let raw = |(id, role, sensor): (ObstacleId, FixtureRole, bool)| RawFixture {
                user_data: FixtureTag::new(id, role).encode(),
                sensor,
            };
            let event = ContactEvent {
                first: raw(a),
                second: raw(b),
                started,
            };
            self.controller
                .process(&[event], &mut self.arena, &mut self.physics, &mut self.commands)
        }
    }

    #[test]
    fn filter_rules() {
        use FixtureRole::*;
        assert!(!should_collide(FlameSensor, ActivatorSensor));
        assert!(!should_collide(ActivatorSensor, FlameSensor));
        assert!(!should_collide(SpikesSolid, Hitbox));
        assert!(!should_collide(Hitbox, SpikesSolid));
        assert!(should_collide(Body, ActivatorSensor));
        assert!(should_collide(SpikesSolid, Body));
        assert!(should_collide(Hitbox, SpikesPointy));
    }

    #[test]
    fn ground_needs_every_contact_to_end() {
        let mut scene = Scene::new();
        let cat = scene.add(ObstacleKind::Cat(Cat::new(CatConfig::default())));
        let floor_a = scene.add(ObstacleKind::Wall(Wall::new(false)));
        let floor_b = scene.add(ObstacleKind::Wall(Wall::new(false)));
        let sensor = (cat, FixtureRole::GroundSensor, true);
        scene.event(sensor, (floor_a, FixtureRole::Body, false), true);
        scene.event((floor_b, FixtureRole::Body, false), sensor, true);
        let grounded = |s: &Scene| s.arena.get(cat).unwrap().kind.as_cat().unwrap().is_grounded();
        assert!(grounded(&scene));
        scene.event(sensor, (floor_a, FixtureRole::Body, false), false);
        assert!(grounded(&scene));
        scene.event(sensor, (floor_b, FixtureRole::Body, false), false);
        assert!(!grounded(&scene));
    }

    #[test]
    fn ground_sensor_ignores_sensors_and_self() {
        let mut scene = Scene::new();
        let cat = scene.add(ObstacleKind::Cat(Cat::new(CatConfig::default())));
        let region = scene.add(ObstacleKind::Wall(Wall::new(false)));
        scene.event((cat, FixtureRole::GroundSensor, true), (region, FixtureRole::Body, true), true);
        scene.event((cat, FixtureRole::GroundSensor, true), (cat, FixtureRole::Body, false), true);
        assert!(!scene.arena.get(cat).unwrap().kind.as_cat().unwrap().is_grounded());
    }

    #[test]
    fn climbable_walls_count_per_side() {
        let mut scene = Scene::new();
        let cat = scene.add(ObstacleKind::Cat(Cat::new(CatConfig::default())));
        let climbable = scene.add(ObstacleKind::Wall(Wall::new(true)));
        let plain = scene.add(ObstacleKind::Wall(Wall::new(false)));
        scene.event((cat, FixtureRole::RightSensor, true), (climbable, FixtureRole::Body, false), true);
        scene.event((cat, FixtureRole::LeftSensor, true), (plain, FixtureRole::Body, false), true);
        let walls = scene.arena.get(cat).unwrap().kind.as_cat().unwrap().wall_contacts();
        assert_eq!(walls, (0, 1));
    }

    #[test]
    fn lethal_contact_reports_death() {
        let mut scene = Scene::new();
        let cat = scene.add(ObstacleKind::Cat(Cat::new(CatConfig::default())));
        let spikes = scene.add(ObstacleKind::Spikes(Spikes::new(Direction::Up, true)));
        let outcomes = scene.event(
            (spikes, FixtureRole::SpikesPointy, true),
            (cat, FixtureRole::Hitbox, true),
            true,
        );
        assert_eq!(outcomes, vec![ContactOutcome::CatDied]);
    }

    #[test]
    fn dead_body_hazards_and_weld_request() {
        let mut scene = Scene::new();
        let dead = scene.add(ObstacleKind::DeadBody(DeadBody::new(DeadBodyConfig::default(), true)));
        let spikes = scene.add(ObstacleKind::Spikes(Spikes::new(Direction::Up, true)));
        scene.event((dead, FixtureRole::Body, false), (spikes, FixtureRole::SpikesPointy, true), true);
        scene.event((dead, FixtureRole::CenterSensor, true), (spikes, FixtureRole::SpikesCenter, true), true);
        let body = scene.arena.get(dead).unwrap().kind.as_dead_body().unwrap();
        assert!(!body.is_switchable());
        assert_eq!(scene.commands.len(), 1);
        assert!(matches!(
            scene.commands.iter().next().map(|c| c.command),
            Some(LevelCommand::WeldToSpikes { spikes: s, .. }) if s == spikes
        ));

        scene.event((dead, FixtureRole::Body, false), (spikes, FixtureRole::SpikesPointy, true), false);
        let body = scene.arena.get(dead).unwrap().kind.as_dead_body().unwrap();
        assert!(body.is_switchable());
    }

    #[test]
    fn leaving_a_flame_stops_burning() {
        let mut scene = Scene::new();
        let dead = scene.add(ObstacleKind::DeadBody(DeadBody::new(DeadBodyConfig::default(), true)));
        let flame = scene.add(ObstacleKind::Flamethrower(Flamethrower::new(
            Direction::Up,
            RigidBodyHandle::invalid(),
            Vec2::new(0.0, 1.0),
            true,
        )));
        let contact = |scene: &mut Scene, started| {
            scene.event((dead, FixtureRole::Body, false), (flame, FixtureRole::FlameSensor, true), started);
        };
        let body = |s: &Scene| s.arena.get(dead).unwrap().kind.as_dead_body().unwrap().clone();

        contact(&mut scene, true);
        assert!(body(&scene).is_burning());
        assert_eq!(body(&scene).hazards(), 1);

        contact(&mut scene, false);
        assert!(!body(&scene).is_burning());
        assert_eq!(body(&scene).hazards(), 0);
        assert!(body(&scene).is_switchable());
    }

    #[test]
    fn activator_counts_solid_presses_only() {
        let mut scene = Scene::new();
        let button = scene.add(ObstacleKind::Activator(Activator::new("b", ActivatorKind::Button, 0)));
        let cat = scene.add(ObstacleKind::Cat(Cat::new(CatConfig::default())));
        let sensor = (button, FixtureRole::ActivatorSensor, true);
        scene.event(sensor, (cat, FixtureRole::Body, false), true);
        scene.event(sensor, (cat, FixtureRole::Hitbox, true), true);
        let presses = |s: &Scene| s.arena.get(button).unwrap().kind.as_activator().unwrap().presses();
        assert_eq!(presses(&scene), 1);
        scene.event(sensor, (cat, FixtureRole::Body, false), false);
        assert_eq!(presses(&scene), 0);
    }

    #[test]
    fn removed_presser_still_releases() {
        let mut scene = Scene::new();
        let button = scene.add(ObstacleKind::Activator(Activator::new("b", ActivatorKind::Button, 0)));
        let dead = scene.add(ObstacleKind::DeadBody(DeadBody::new(DeadBodyConfig::default(), true)));
        scene.event((button, FixtureRole::ActivatorSensor, true), (dead, FixtureRole::Body, false), true);
        scene.arena.remove(dead);
        scene.event((button, FixtureRole::ActivatorSensor, true), (dead, FixtureRole::Body, false), false);
        assert_eq!(scene.arena.get(button).unwrap().kind.as_activator().unwrap().presses(), 0);
    }

    #[test]
    fn malformed_contact_is_logged_and_skipped() {
        let mut scene = Scene::new();
        let event = ContactEvent {
            first: RawFixture { user_data: u128::MAX, sensor: false },
            second: RawFixture { user_data: 0, sensor: false },
            started: true,
        };
        let outcomes = scene
            .controller
            .process(&[event], &mut scene.arena, &mut scene.physics, &mut scene.commands);
        assert!(outcomes.is_empty());
        assert_eq!(scene.controller.stats().failed, 1);
    }
}
