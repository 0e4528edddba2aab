//! Spikes and flamethrowers.

use glam::Vec2;
use ninelives_data::constants::{FlamethrowerConfig, SpikesConfig};
use ninelives_data::Direction;
use rapier2d::prelude::{ImpulseJointHandle, RigidBodyHandle};
use serde::{Deserialize, Serialize};

use crate::activation::{Activatable, ActivationState};
use crate::physics::{
    BodyContext, BodyKind, BodySpec, BodyState, ColliderSpec, FixtureRole, PhysicsWorld, ShapeSpec,
};

// ---------------------------------------------------------------------------
// Spikes
// ---------------------------------------------------------------------------

/// Snapshot of spikes. Joints are rebuilt from the dead bodies' side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpikesState {
    /// Activation bookkeeping.
    pub activation: ActivationState,
}

/// A row of spikes pointing in `direction`.
///
/// Deactivated spikes disappear entirely: colliders are disabled and every
/// dead body welded to them is released.
#[derive(Debug, Clone)]
pub struct Spikes {
    direction: Direction,
    activation: ActivationState,
    joints: Vec<ImpulseJointHandle>,
}

impl Spikes {
    /// Spikes pointing in `direction`.
    pub fn new(direction: Direction, initially_active: bool) -> Self {
        Self {
            direction,
            activation: ActivationState::new(initially_active),
            joints: Vec::new(),
        }
    }

    /// Pointing direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether dead bodies landing on these spikes get pinned. Spikes
    /// pointing down never pin.
    pub fn welds_bodies(&self) -> bool {
        self.direction != Direction::Down
    }

    /// Joints pinning dead bodies.
    pub fn joints(&self) -> &[ImpulseJointHandle] {
        &self.joints
    }

    /// Remember a joint pinning a dead body.
    pub fn add_joint(&mut self, joint: ImpulseJointHandle) {
        self.joints.push(joint);
    }

    /// Destroy every pinning joint.
    pub fn destroy_joints(&mut self, physics: &mut PhysicsWorld) {
        for joint in self.joints.drain(..) {
            physics.remove_joint(joint);
        }
    }

    /// Forget joints that went away with a removed body.
    pub fn prune_joints(&mut self, physics: &PhysicsWorld) {
        self.joints.retain(|&joint| physics.contains_joint(joint));
    }

    /// Capture state.
    pub fn state(&self) -> SpikesState {
        SpikesState {
            activation: self.activation,
        }
    }

    /// Restore state. Stale joints must already be destroyed.
    pub fn restore(&mut self, state: &SpikesState, ctx: &mut BodyContext<'_>) {
        self.activation = state.activation;
        self.apply_activation(ctx);
    }
}

impl Activatable for Spikes {
    fn activation(&self) -> &ActivationState {
        &self.activation
    }

    fn activation_mut(&mut self) -> &mut ActivationState {
        &mut self.activation
    }

    fn activated(&mut self, ctx: &mut BodyContext<'_>) {
        ctx.physics.set_colliders_enabled(ctx.body, true);
    }

    fn deactivated(&mut self, ctx: &mut BodyContext<'_>) {
        self.destroy_joints(ctx.physics);
        ctx.physics.set_colliders_enabled(ctx.body, false);
    }

    fn apply_activation(&mut self, ctx: &mut BodyContext<'_>) {
        let active = self.activation.activated;
        if !active {
            self.destroy_joints(ctx.physics);
        }
        ctx.physics.set_colliders_enabled(ctx.body, active);
    }
}

/// Fixed body with a solid base, a lethal sensor above it and a small weld
/// sensor at the tip, rotated to `direction`.
pub(crate) fn spikes_body(position: Vec2, direction: Direction, config: &SpikesConfig) -> (BodySpec, Vec<ColliderSpec>) {
    let (w, h) = (config.width, config.height);
    let solid = h * config.solid_fraction;
    let pointy = h - solid;
    let spec = BodySpec::new(BodyKind::Fixed, position).angle(direction.angle_radians());
    let colliders = vec![
        ColliderSpec::solid(FixtureRole::SpikesSolid, ShapeSpec::rect(w, solid))
            .at(Vec2::new(0.0, (solid - h) * 0.5)),
        ColliderSpec::sensor(FixtureRole::SpikesPointy, ShapeSpec::rect(w, pointy))
            .at(Vec2::new(0.0, (h - pointy) * 0.5)),
        ColliderSpec::sensor(
            FixtureRole::SpikesCenter,
            ShapeSpec::rect(config.center_sensor_size, config.center_sensor_size),
        )
        .at(Vec2::new(0.0, h * 0.5 - config.center_sensor_size)),
    ];
    (spec, colliders)
}

// ---------------------------------------------------------------------------
// Flamethrower
// ---------------------------------------------------------------------------

/// Snapshot of a flamethrower.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlamethrowerState {
    /// Activation bookkeeping.
    pub activation: ActivationState,
    /// The flame body.
    pub flame: BodyState,
}

/// A fixed base and a separate flame body welded to it while active.
#[derive(Debug, Clone)]
pub struct Flamethrower {
    direction: Direction,
    activation: ActivationState,
    flame_body: RigidBodyHandle,
    weld: Option<ImpulseJointHandle>,
    flame_offset: Vec2,
}

impl Flamethrower {
    /// A flamethrower whose flame body already exists. `flame_offset` is the
    /// flame's position in the base's local frame.
    pub fn new(
        direction: Direction,
        flame_body: RigidBodyHandle,
        flame_offset: Vec2,
        initially_active: bool,
    ) -> Self {
        Self {
            direction,
            activation: ActivationState::new(initially_active),
            flame_body,
            weld: None,
            flame_offset,
        }
    }

    /// Firing direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The flame body.
    pub fn flame_body(&self) -> RigidBodyHandle {
        self.flame_body
    }

    /// Whether the flame is welded to the base.
    pub fn is_welded(&self) -> bool {
        self.weld.is_some()
    }

    fn ignite(&mut self, ctx: &mut BodyContext<'_>) {
        if let Some(home) = ctx.physics.local_to_world(ctx.body, self.flame_offset) {
            ctx.physics.set_position(self.flame_body, home);
        }
        if self.weld.is_none() {
            self.weld = Some(ctx.physics.create_weld(ctx.body, self.flame_body, self.flame_offset, Vec2::ZERO));
        }
        ctx.physics.set_colliders_enabled(self.flame_body, true);
    }

    fn extinguish(&mut self, ctx: &mut BodyContext<'_>) {
        if let Some(weld) = self.weld.take() {
            ctx.physics.remove_joint(weld);
        }
        ctx.physics.set_colliders_enabled(self.flame_body, false);
        ctx.physics.set_linvel(self.flame_body, Vec2::ZERO);
    }

    /// Capture state.
    pub fn state(&self, physics: &PhysicsWorld) -> Option<FlamethrowerState> {
        Some(FlamethrowerState {
            activation: self.activation,
            flame: physics.body_state(self.flame_body)?,
        })
    }

    /// Restore state.
    pub fn restore(&mut self, state: &FlamethrowerState, ctx: &mut BodyContext<'_>) {
        self.activation = state.activation;
        ctx.physics.apply_body_state(self.flame_body, &state.flame);
        self.apply_activation(ctx);
    }
}

impl Activatable for Flamethrower {
    fn activation(&self) -> &ActivationState {
        &self.activation
    }

    fn activation_mut(&mut self) -> &mut ActivationState {
        &mut self.activation
    }

    fn activated(&mut self, ctx: &mut BodyContext<'_>) {
        self.ignite(ctx);
    }

    fn deactivated(&mut self, ctx: &mut BodyContext<'_>) {
        self.extinguish(ctx);
    }

    fn apply_activation(&mut self, ctx: &mut BodyContext<'_>) {
        if self.activation.activated {
            self.ignite(ctx);
        } else {
            self.extinguish(ctx);
        }
    }
}

/// Fixed base rotated to `direction`.
pub(crate) fn flamethrower_base(position: Vec2, direction: Direction, config: &FlamethrowerConfig) -> (BodySpec, Vec<ColliderSpec>) {
    let spec = BodySpec::new(BodyKind::Fixed, position).angle(direction.angle_radians());
    let colliders = vec![ColliderSpec::solid(
        FixtureRole::Body,
        ShapeSpec::rect(config.base_width, config.base_height),
    )];
    (spec, colliders)
}

/// Position of the flame in the base's local frame.
pub(crate) fn flame_offset(config: &FlamethrowerConfig) -> Vec2 {
    Vec2::new(0.0, (config.base_height + config.flame_height) * 0.5)
}

/// Weightless flame body holding the lethal sensor.
pub(crate) fn flame(position: Vec2, direction: Direction, config: &FlamethrowerConfig) -> (BodySpec, Vec<ColliderSpec>) {
    let spec = BodySpec::new(BodyKind::Dynamic, position)
        .angle(direction.angle_radians())
        .fixed_rotation()
        .gravity_scale(0.0);
    let colliders = vec![ColliderSpec::sensor(
        FixtureRole::FlameSensor,
        ShapeSpec::rect(config.flame_width, config.flame_height),
    )
    .density(1.0)];
    (spec, colliders)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationChange;
    use crate::obstacle::ObstacleId;

    fn spikes_world(direction: Direction) -> (PhysicsWorld, RigidBodyHandle) {
        let mut physics = PhysicsWorld::new(Vec2::ZERO);
        let (spec, colliders) = spikes_body(Vec2::ZERO, direction, &SpikesConfig::default());
        let handle = physics
            .create_body(ObstacleId::new(0, 0), &spec, &colliders)
            .unwrap();
        (physics, handle)
    }

    #[test]
    fn downward_spikes_never_weld() {
        assert!(!Spikes::new(Direction::Down, true).welds_bodies());
        for direction in [Direction::Up, Direction::Left, Direction::Right] {
            assert!(Spikes::new(direction, true).welds_bodies());
        }
    }

    #[test]
    fn deactivated_spikes_drop_colliders_and_joints() {
        let (mut physics, spikes) = spikes_world(Direction::Up);
        let other = physics
            .create_body(
                ObstacleId::new(1, 0),
                &BodySpec::new(BodyKind::Dynamic, Vec2::new(0.0, 1.0)),
                &[ColliderSpec::solid(FixtureRole::Body, ShapeSpec::rect(1.0, 1.0))],
            )
            .unwrap();
        let mut s = Spikes::new(Direction::Up, true);
        let joint = physics.create_weld(other, spikes, Vec2::ZERO, Vec2::ZERO);
        s.add_joint(joint);

        let mut ctx = BodyContext::new(&mut physics, spikes);
        assert_eq!(s.update_activated(true, &mut ctx), ActivationChange::JustDeactivated);
        assert!(s.joints().is_empty());
        assert!(!ctx.physics.contains_joint(joint));
        assert!(!ctx.physics.collider_enabled(spikes, FixtureRole::SpikesPointy));

        assert_eq!(s.update_activated(false, &mut ctx), ActivationChange::JustActivated);
        assert!(ctx.physics.collider_enabled(spikes, FixtureRole::SpikesPointy));
    }

    #[test]
    fn flamethrower_welds_flame_only_while_active() {
        let config = FlamethrowerConfig::default();
        let mut physics = PhysicsWorld::new(Vec2::new(0.0, -10.0));
        let id = ObstacleId::new(0, 0);
        let (spec, colliders) = flamethrower_base(Vec2::ZERO, Direction::Up, &config);
        let base = physics.create_body(id, &spec, &colliders).unwrap();
        let offset = flame_offset(&config);
        let (spec, colliders) = flame(offset, Direction::Up, &config);
        let flame_body = physics.create_body(id, &spec, &colliders).unwrap();

        let mut f = Flamethrower::new(Direction::Up, flame_body, offset, false);
        let mut ctx = BodyContext::new(&mut physics, base);
        f.apply_activation(&mut ctx);
        assert!(!f.is_welded());
        assert!(!ctx.physics.collider_enabled(flame_body, FixtureRole::FlameSensor));

        f.update_activated(true, &mut ctx);
        assert!(f.is_welded());
        assert!(ctx.physics.collider_enabled(flame_body, FixtureRole::FlameSensor));
        assert_eq!(ctx.physics.joint_count(), 1);

        f.update_activated(false, &mut ctx);
        assert!(!f.is_welded());
        assert_eq!(ctx.physics.joint_count(), 0);
        assert_eq!(ctx.physics.linvel(flame_body), Some(Vec2::ZERO));
    }
}
