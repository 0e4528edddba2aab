//! rapier2d integration.
//!
//! The [`PhysicsWorld`] owns the rapier simulation. Gameplay code never sees
//! rapier types except body and joint handles; everything else crosses the
//! boundary as [`glam::Vec2`] and the small descriptor types defined here.
//!
//! # Fixture tags
//!
//! Every collider carries a [`FixtureTag`] (owning obstacle + role) packed
//! into its `user_data`. The contact controller and the laser engine decode
//! it to find out *what* was touched. The adapter also caches the raw tag per
//! collider handle so that stop events for colliders removed before a step
//! still resolve.
//!
//! # Determinism
//!
//! rapier2d is compiled with `enhanced-determinism`. Contact events are
//! sorted by their (min, max) user data before they are handed out, so the
//! dispatch order does not depend on channel delivery order.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;

use glam::Vec2;
use ninelives_data::constants::WorldConfig;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::contact::should_collide;
use crate::obstacle::ObstacleId;
use crate::ContactError;

// ---------------------------------------------------------------------------
// FixtureRole / FixtureTag
// ---------------------------------------------------------------------------

/// What a collider is for, within its obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FixtureRole {
    /// The main solid (or, for region objects, the main sensor).
    Body,
    /// Thin sensor under the feet of a movable object.
    GroundSensor,
    /// Sensor on the left flank.
    LeftSensor,
    /// Sensor on the right flank.
    RightSensor,
    /// Hazard sensor slightly larger than the body.
    Hitbox,
    /// Small sensor at a dead body's center, used for welding to spikes.
    CenterSensor,
    /// The pressing area of an activator.
    ActivatorSensor,
    /// The solid base of spikes.
    SpikesSolid,
    /// The lethal part of spikes.
    SpikesPointy,
    /// Small sensor at the tip of spikes, used for welding dead bodies.
    SpikesCenter,
    /// The lethal flame of a flamethrower.
    FlameSensor,
    /// Checkpoint trigger area.
    CheckpointSensor,
}

impl FixtureRole {
    const ALL: [FixtureRole; 12] = [
        FixtureRole::Body,
        FixtureRole::GroundSensor,
        FixtureRole::LeftSensor,
        FixtureRole::RightSensor,
        FixtureRole::Hitbox,
        FixtureRole::CenterSensor,
        FixtureRole::ActivatorSensor,
        FixtureRole::SpikesSolid,
        FixtureRole::SpikesPointy,
        FixtureRole::SpikesCenter,
        FixtureRole::FlameSensor,
        FixtureRole::CheckpointSensor,
    ];

    /// Stable one-byte code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

/// Identity of one collider: which obstacle owns it and what it is for.
///
/// Layout in `user_data`: `[obstacle id: 64 bits | role: 8 bits]`, upper
/// bits zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FixtureTag {
    /// Owning obstacle.
    pub obstacle: ObstacleId,
    /// Role within the obstacle.
    pub role: FixtureRole,
}

impl FixtureTag {
    /// Construct a tag.
    pub fn new(obstacle: ObstacleId, role: FixtureRole) -> Self {
        Self { obstacle, role }
    }

    /// Pack into collider user data.
    pub fn encode(self) -> u128 {
        ((self.obstacle.to_raw() as u128) << 8) | self.role.code() as u128
    }

    /// Unpack collider user data.
    ///
    /// # Errors
    ///
    /// [`ContactError::MalformedUserData`] if the high bits are set or the
    /// role code is unknown.
    pub fn decode(raw: u128) -> Result<Self, ContactError> {
        if raw >> 72 != 0 {
            return Err(ContactError::MalformedUserData { raw });
        }
        let role = FixtureRole::from_code((raw & 0xff) as u8)
            .ok_or(ContactError::MalformedUserData { raw })?;
        Ok(Self {
            obstacle: ObstacleId::from_raw((raw >> 8) as u64),
            role,
        })
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// How rapier treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Simulated.
    Dynamic,
    /// Velocity-driven by game logic.
    Kinematic,
    /// Immovable.
    Fixed,
}

impl BodyKind {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyKind::Dynamic => RigidBodyType::Dynamic,
            BodyKind::Kinematic => RigidBodyType::KinematicVelocityBased,
            BodyKind::Fixed => RigidBodyType::Fixed,
        }
    }

    fn from_rapier(body_type: RigidBodyType) -> Self {
        match body_type {
            RigidBodyType::Dynamic => BodyKind::Dynamic,
            RigidBodyType::Fixed => BodyKind::Fixed,
            RigidBodyType::KinematicVelocityBased | RigidBodyType::KinematicPositionBased => {
                BodyKind::Kinematic
            }
        }
    }
}

/// Collider geometry in body-local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeSpec {
    /// Box with half extents.
    Cuboid {
        /// Half width and half height.
        half_extents: Vec2,
    },
    /// Circle.
    Ball {
        /// Radius.
        radius: f32,
    },
    /// Vertical capsule.
    CapsuleY {
        /// Half length of the straight segment.
        half_height: f32,
        /// Cap radius.
        radius: f32,
    },
    /// Convex hull of the given points.
    ConvexPolygon {
        /// Hull vertices.
        points: Vec<Vec2>,
    },
}

impl ShapeSpec {
    /// Box from full width and height.
    pub fn rect(width: f32, height: f32) -> Self {
        ShapeSpec::Cuboid {
            half_extents: Vec2::new(width * 0.5, height * 0.5),
        }
    }

    fn to_shared(&self) -> Option<SharedShape> {
        match self {
            ShapeSpec::Cuboid { half_extents } => {
                Some(SharedShape::cuboid(half_extents.x, half_extents.y))
            }
            ShapeSpec::Ball { radius } => Some(SharedShape::ball(*radius)),
            ShapeSpec::CapsuleY {
                half_height,
                radius,
            } => Some(SharedShape::capsule_y(*half_height, *radius)),
            ShapeSpec::ConvexPolygon { points } => {
                let points: Vec<Point<Real>> = points.iter().map(|p| point![p.x, p.y]).collect();
                SharedShape::convex_hull(&points)
            }
        }
    }
}

/// One collider to attach to a body.
#[derive(Debug, Clone, PartialEq)]
pub struct ColliderSpec {
    /// Role used in the fixture tag.
    pub role: FixtureRole,
    /// Geometry.
    pub shape: ShapeSpec,
    /// Offset from the body origin.
    pub offset: Vec2,
    /// Sensors report overlaps but never push.
    pub sensor: bool,
    /// Density; sensors carry no mass.
    pub density: f32,
    /// Friction coefficient.
    pub friction: f32,
}

impl ColliderSpec {
    /// A solid collider with unit density.
    pub fn solid(role: FixtureRole, shape: ShapeSpec) -> Self {
        Self {
            role,
            shape,
            offset: Vec2::ZERO,
            sensor: false,
            density: 1.0,
            friction: 0.5,
        }
    }

    /// A massless sensor.
    pub fn sensor(role: FixtureRole, shape: ShapeSpec) -> Self {
        Self {
            role,
            shape,
            offset: Vec2::ZERO,
            sensor: true,
            density: 0.0,
            friction: 0.0,
        }
    }

    /// Place the collider at `offset` from the body origin.
    pub fn at(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Override the density.
    pub fn density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Override the friction.
    pub fn friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }
}

/// A rigid body to create.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySpec {
    /// Body type.
    pub kind: BodyKind,
    /// World position of the body origin.
    pub position: Vec2,
    /// Rotation in radians.
    pub angle: f32,
    /// Initial linear velocity.
    pub linvel: Vec2,
    /// Prevent rotation.
    pub fixed_rotation: bool,
    /// Gravity multiplier.
    pub gravity_scale: f32,
}

impl BodySpec {
    /// A body of `kind` at `position`, unrotated and at rest.
    pub fn new(kind: BodyKind, position: Vec2) -> Self {
        Self {
            kind,
            position,
            angle: 0.0,
            linvel: Vec2::ZERO,
            fixed_rotation: false,
            gravity_scale: 1.0,
        }
    }

    /// Set the rotation.
    pub fn angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    /// Set the initial velocity.
    pub fn linvel(mut self, linvel: Vec2) -> Self {
        self.linvel = linvel;
        self
    }

    /// Lock rotation.
    pub fn fixed_rotation(mut self) -> Self {
        self.fixed_rotation = true;
        self
    }

    /// Set the gravity multiplier.
    pub fn gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }
}

/// Kinematic state of one body, as stored in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    /// World position.
    pub position: Vec2,
    /// Linear velocity.
    pub linvel: Vec2,
    /// Rotation in radians.
    pub angle: f32,
}

// ---------------------------------------------------------------------------
// Contact events
// ---------------------------------------------------------------------------

/// Collider identity as reported with a contact, still undecoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFixture {
    /// Collider user data (an encoded [`FixtureTag`] for well-formed colliders).
    pub user_data: u128,
    /// Whether the collider is a sensor.
    pub sensor: bool,
}

/// A contact that started or stopped during the last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    /// One side.
    pub first: RawFixture,
    /// The other side.
    pub second: RawFixture,
    /// `true` for begin, `false` for end.
    pub started: bool,
}

// ---------------------------------------------------------------------------
// Ray casting
// ---------------------------------------------------------------------------

/// Closest hit of a ray cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Tag of the hit collider, if it decodes.
    pub tag: Option<FixtureTag>,
    /// World hit point.
    pub point: Vec2,
    /// Distance from the ray origin.
    pub distance: f32,
}

/// Closest-hit ray queries against solid colliders.
///
/// Implemented by [`PhysicsWorld`]; tests implement it over synthetic scenes.
pub trait RayCaster {
    /// Cast from `origin` along the unit vector `direction` up to
    /// `max_distance`. Sensors and disabled colliders are ignored, as is every
    /// collider owned by `exclude`.
    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        exclude: Option<ObstacleId>,
    ) -> Option<RayHit>;
}

// ---------------------------------------------------------------------------
// Contact filter hooks
// ---------------------------------------------------------------------------

/// Installs the contact-filter predicate into the rapier pipeline.
struct ContactFilterHooks;

impl ContactFilterHooks {
    fn roles(context: &PairFilterContext) -> Option<(FixtureRole, FixtureRole)> {
        let a = FixtureTag::decode(context.colliders.get(context.collider1)?.user_data).ok()?;
        let b = FixtureTag::decode(context.colliders.get(context.collider2)?.user_data).ok()?;
        Some((a.role, b.role))
    }
}

impl PhysicsHooks for ContactFilterHooks {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        match Self::roles(context) {
            Some((a, b)) if !should_collide(a, b) => None,
            _ => Some(SolverFlags::COMPUTE_IMPULSES),
        }
    }

    fn filter_intersection_pair(&self, context: &PairFilterContext) -> bool {
        Self::roles(context).map_or(true, |(a, b)| should_collide(a, b))
    }
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Owns the rapier2d simulation.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    /// Collider handle -> raw fixture, kept until the step after removal.
    fixtures: HashMap<ColliderHandle, RawFixture>,
    /// Colliders removed since the last step.
    retired: Vec<ColliderHandle>,
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("bodies", &self.rigid_body_set.len())
            .field("colliders", &self.collider_set.len())
            .field("joints", &self.impulse_joint_set.len())
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Create an empty world with the given gravity.
    pub fn new(gravity: Vec2) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![gravity.x, gravity.y],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            fixtures: HashMap::new(),
            retired: Vec::new(),
        }
    }

    /// Create a world from configuration.
    pub fn from_config(config: &WorldConfig) -> Self {
        let mut world = Self::new(config.gravity);
        world.integration_params.num_solver_iterations =
            NonZeroUsize::new(config.solver_iterations).unwrap_or(NonZeroUsize::MIN);
        world
    }

    // -- bodies -------------------------------------------------------------

    /// Create a body with its colliders, all tagged as owned by `obstacle`.
    ///
    /// Returns `None` without touching the world if any shape cannot be built.
    pub fn create_body(
        &mut self,
        obstacle: ObstacleId,
        spec: &BodySpec,
        colliders: &[ColliderSpec],
    ) -> Option<RigidBodyHandle> {
        let shapes: Vec<SharedShape> = colliders
            .iter()
            .map(|c| c.shape.to_shared())
            .collect::<Option<_>>()?;

        let builder = match spec.kind {
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
            BodyKind::Kinematic => RigidBodyBuilder::kinematic_velocity_based(),
            BodyKind::Fixed => RigidBodyBuilder::fixed(),
        };
        let mut builder = builder
            .translation(vector![spec.position.x, spec.position.y])
            .rotation(spec.angle)
            .linvel(vector![spec.linvel.x, spec.linvel.y])
            .gravity_scale(spec.gravity_scale)
            .user_data(obstacle.to_raw() as u128);
        if spec.fixed_rotation {
            builder = builder.lock_rotations();
        }
        let body = self.rigid_body_set.insert(builder.build());

        for (collider, shape) in colliders.iter().zip(shapes) {
            let tag = FixtureTag::new(obstacle, collider.role);
            let mut builder = ColliderBuilder::new(shape)
                .translation(vector![collider.offset.x, collider.offset.y])
                .sensor(collider.sensor)
                .density(collider.density)
                .friction(collider.friction)
                .user_data(tag.encode())
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .active_hooks(
                    ActiveHooks::FILTER_CONTACT_PAIRS | ActiveHooks::FILTER_INTERSECTION_PAIR,
                );
            if collider.sensor {
                builder = builder.active_collision_types(
                    ActiveCollisionTypes::default() | ActiveCollisionTypes::KINEMATIC_FIXED,
                );
            }
            let handle =
                self.collider_set
                    .insert_with_parent(builder.build(), body, &mut self.rigid_body_set);
            self.fixtures.insert(
                handle,
                RawFixture {
                    user_data: tag.encode(),
                    sensor: collider.sensor,
                },
            );
        }
        Some(body)
    }

    /// Remove a body, its colliders and every joint attached to it.
    pub fn remove_body(&mut self, body: RigidBodyHandle) {
        if let Some(rb) = self.rigid_body_set.get(body) {
            self.retired.extend_from_slice(rb.colliders());
        }
        self.rigid_body_set.remove(
            body,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Whether the body still exists.
    pub fn contains_body(&self, body: RigidBodyHandle) -> bool {
        self.rigid_body_set.contains(body)
    }

    /// Number of bodies in the world.
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// World position of the body origin.
    pub fn position(&self, body: RigidBodyHandle) -> Option<Vec2> {
        let t = self.rigid_body_set.get(body)?.translation();
        Some(Vec2::new(t.x, t.y))
    }

    /// Linear velocity.
    pub fn linvel(&self, body: RigidBodyHandle) -> Option<Vec2> {
        let v = self.rigid_body_set.get(body)?.linvel();
        Some(Vec2::new(v.x, v.y))
    }

    /// Teleport the body.
    pub fn set_position(&mut self, body: RigidBodyHandle, position: Vec2) {
        if let Some(rb) = self.rigid_body_set.get_mut(body) {
            rb.set_translation(vector![position.x, position.y], true);
        }
    }

    /// Overwrite the linear velocity.
    pub fn set_linvel(&mut self, body: RigidBodyHandle, linvel: Vec2) {
        if let Some(rb) = self.rigid_body_set.get_mut(body) {
            rb.set_linvel(vector![linvel.x, linvel.y], true);
        }
    }

    /// Apply an impulse at the center of mass.
    pub fn apply_impulse(&mut self, body: RigidBodyHandle, impulse: Vec2) {
        if let Some(rb) = self.rigid_body_set.get_mut(body) {
            rb.apply_impulse(vector![impulse.x, impulse.y], true);
        }
    }

    /// Change the gravity multiplier.
    pub fn set_gravity_scale(&mut self, body: RigidBodyHandle, scale: f32) {
        if let Some(rb) = self.rigid_body_set.get_mut(body) {
            rb.set_gravity_scale(scale, true);
        }
    }

    /// Current gravity multiplier.
    pub fn gravity_scale(&self, body: RigidBodyHandle) -> Option<f32> {
        Some(self.rigid_body_set.get(body)?.gravity_scale())
    }

    /// Switch between dynamic, kinematic and fixed.
    pub fn set_body_kind(&mut self, body: RigidBodyHandle, kind: BodyKind) {
        if let Some(rb) = self.rigid_body_set.get_mut(body) {
            rb.set_body_type(kind.to_rapier(), true);
        }
    }

    /// Current body type.
    pub fn body_kind(&self, body: RigidBodyHandle) -> Option<BodyKind> {
        Some(BodyKind::from_rapier(self.rigid_body_set.get(body)?.body_type()))
    }

    /// Capture position, velocity and rotation.
    pub fn body_state(&self, body: RigidBodyHandle) -> Option<BodyState> {
        let rb = self.rigid_body_set.get(body)?;
        let (t, v) = (rb.translation(), rb.linvel());
        Some(BodyState {
            position: Vec2::new(t.x, t.y),
            linvel: Vec2::new(v.x, v.y),
            angle: rb.rotation().angle(),
        })
    }

    /// Restore a captured state. Angular velocity is cleared.
    pub fn apply_body_state(&mut self, body: RigidBodyHandle, state: &BodyState) {
        if let Some(rb) = self.rigid_body_set.get_mut(body) {
            rb.set_translation(vector![state.position.x, state.position.y], true);
            rb.set_rotation(Rotation::new(state.angle), true);
            rb.set_linvel(vector![state.linvel.x, state.linvel.y], true);
            rb.set_angvel(0.0, true);
        }
    }

    /// Convert a world point into the body's local frame.
    pub fn world_to_local(&self, body: RigidBodyHandle, point: Vec2) -> Option<Vec2> {
        let local = self
            .rigid_body_set
            .get(body)?
            .position()
            .inverse_transform_point(&point![point.x, point.y]);
        Some(Vec2::new(local.x, local.y))
    }

    /// Convert a body-local point into world space.
    pub fn local_to_world(&self, body: RigidBodyHandle, point: Vec2) -> Option<Vec2> {
        let world = self
            .rigid_body_set
            .get(body)?
            .position()
            .transform_point(&point![point.x, point.y]);
        Some(Vec2::new(world.x, world.y))
    }

    // -- colliders ----------------------------------------------------------

    fn collider_with_role(&self, body: RigidBodyHandle, role: FixtureRole) -> Option<ColliderHandle> {
        self.rigid_body_set
            .get(body)?
            .colliders()
            .iter()
            .copied()
            .find(|handle| {
                self.fixtures
                    .get(handle)
                    .and_then(|raw| FixtureTag::decode(raw.user_data).ok())
                    .is_some_and(|tag| tag.role == role)
            })
    }

    /// Enable or disable every collider of a body.
    pub fn set_colliders_enabled(&mut self, body: RigidBodyHandle, enabled: bool) {
        let Some(rb) = self.rigid_body_set.get(body) else {
            return;
        };
        for handle in rb.colliders().to_vec() {
            if let Some(collider) = self.collider_set.get_mut(handle) {
                collider.set_enabled(enabled);
            }
        }
    }

    /// Enable or disable the collider playing `role` on a body.
    pub fn set_collider_enabled(&mut self, body: RigidBodyHandle, role: FixtureRole, enabled: bool) {
        if let Some(handle) = self.collider_with_role(body, role) {
            if let Some(collider) = self.collider_set.get_mut(handle) {
                collider.set_enabled(enabled);
            }
        }
    }

    /// Whether the collider playing `role` on a body is enabled.
    pub fn collider_enabled(&self, body: RigidBodyHandle, role: FixtureRole) -> bool {
        self.collider_with_role(body, role)
            .and_then(|handle| self.collider_set.get(handle))
            .is_some_and(|collider| collider.is_enabled())
    }

    /// Replace the geometry and offset of the collider playing `role`.
    ///
    /// Returns `false` if there is no such collider or the shape is invalid.
    pub fn set_collider_shape(
        &mut self,
        body: RigidBodyHandle,
        role: FixtureRole,
        shape: &ShapeSpec,
        offset: Vec2,
    ) -> bool {
        let Some(handle) = self.collider_with_role(body, role) else {
            return false;
        };
        let (Some(shape), Some(collider)) = (shape.to_shared(), self.collider_set.get_mut(handle))
        else {
            return false;
        };
        collider.set_shape(shape);
        collider.set_translation_wrt_parent(vector![offset.x, offset.y]);
        true
    }

    // -- joints -------------------------------------------------------------

    /// Weld two bodies together at the given local anchors.
    pub fn create_weld(
        &mut self,
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
        anchor_a: Vec2,
        anchor_b: Vec2,
    ) -> ImpulseJointHandle {
        let joint = FixedJointBuilder::new()
            .local_anchor1(point![anchor_a.x, anchor_a.y])
            .local_anchor2(point![anchor_b.x, anchor_b.y])
            .contacts_enabled(true);
        self.impulse_joint_set.insert(body_a, body_b, joint, true)
    }

    /// Remove a joint. Returns `false` if it was already gone (for instance
    /// because one of its bodies was removed).
    pub fn remove_joint(&mut self, joint: ImpulseJointHandle) -> bool {
        self.impulse_joint_set.remove(joint, true).is_some()
    }

    /// Whether a joint still exists.
    pub fn contains_joint(&self, joint: ImpulseJointHandle) -> bool {
        self.impulse_joint_set.get(joint).is_some()
    }

    /// Number of impulse joints.
    pub fn joint_count(&self) -> usize {
        self.impulse_joint_set.len()
    }

    // -- stepping -----------------------------------------------------------

    /// Bring the query structures up to date with teleports and new bodies
    /// since the last step.
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// Returns the contacts that started or stopped, sorted deterministically.
    pub fn step(&mut self, dt: f32) -> Vec<ContactEvent> {
        self.integration_params.dt = dt;

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &ContactFilterHooks,
            &event_handler,
        );

        let mut events = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            let (h1, h2, started) = match event {
                CollisionEvent::Started(h1, h2, _) => (h1, h2, true),
                CollisionEvent::Stopped(h1, h2, _) => (h1, h2, false),
            };
            match (self.fixtures.get(&h1), self.fixtures.get(&h2)) {
                (Some(&first), Some(&second)) => events.push(ContactEvent {
                    first,
                    second,
                    started,
                }),
                _ => warn!(?h1, ?h2, started, "contact on a collider with no cached fixture"),
            }
        }

        // Stop events for these colliders were reported by this step.
        for handle in self.retired.drain(..) {
            self.fixtures.remove(&handle);
        }

        events.sort_by_key(|e| {
            let (a, b) = (e.first.user_data, e.second.user_data);
            (a.min(b), a.max(b), e.started)
        });
        events
    }
}

impl RayCaster for PhysicsWorld {
    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        exclude: Option<ObstacleId>,
    ) -> Option<RayHit> {
        let ray = Ray::new(point![origin.x, origin.y], vector![direction.x, direction.y]);
        let predicate = |_handle: ColliderHandle, collider: &Collider| {
            if !collider.is_enabled() {
                return false;
            }
            match (exclude, FixtureTag::decode(collider.user_data)) {
                (Some(excluded), Ok(tag)) => tag.obstacle != excluded,
                _ => true,
            }
        };
        let filter = QueryFilter::default().exclude_sensors().predicate(&predicate);
        let (handle, toi) = self.query_pipeline.cast_ray(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true,
            filter,
        )?;
        let point = ray.point_at(toi);
        Some(RayHit {
            tag: self
                .collider_set
                .get(handle)
                .and_then(|c| FixtureTag::decode(c.user_data).ok()),
            point: Vec2::new(point.x, point.y),
            distance: toi,
        })
    }
}

// ---------------------------------------------------------------------------
// BodyContext
// ---------------------------------------------------------------------------

/// Mutable access to the physics world focused on one body. Handed to
/// activation callbacks and per-obstacle updates.
pub struct BodyContext<'a> {
    /// The world.
    pub physics: &'a mut PhysicsWorld,
    /// The body being acted on.
    pub body: RigidBodyHandle,
}

impl<'a> BodyContext<'a> {
    /// Focus on `body`.
    pub fn new(physics: &'a mut PhysicsWorld, body: RigidBodyHandle) -> Self {
        Self { physics, body }
    }

    /// Body position, or zero if the body is gone.
    pub fn position(&self) -> Vec2 {
        self.physics.position(self.body).unwrap_or(Vec2::ZERO)
    }

    /// Body velocity, or zero if the body is gone.
    pub fn linvel(&self) -> Vec2 {
        self.physics.linvel(self.body).unwrap_or(Vec2::ZERO)
    }

    /// Overwrite the velocity.
    pub fn set_linvel(&mut self, linvel: Vec2) {
        self.physics.set_linvel(self.body, linvel);
    }

    /// Teleport.
    pub fn set_position(&mut self, position: Vec2) {
        self.physics.set_position(self.body, position);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
