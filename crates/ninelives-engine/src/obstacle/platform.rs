//! Moving platforms and pushable boxes.

use glam::Vec2;
use ninelives_data::constants::{BoxConfig, PlatformConfig};
use serde::{Deserialize, Serialize};

use crate::activation::{Activatable, ActivationState};
use crate::obstacle::GroundContacts;
use crate::physics::{BodyContext, BodyKind, BodySpec, ColliderSpec, FixtureRole, ShapeSpec};

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Snapshot of a platform's motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlatformState {
    /// Activation bookkeeping.
    pub activation: ActivationState,
    /// Commanded velocity.
    pub velocity: Vec2,
}

/// A kinematic platform shuttling between `start` and `start + displacement`.
///
/// Active platforms travel to `start`, inactive ones to the far end. The
/// commanded velocity eases toward the target velocity by `response` each
/// tick and drops to zero once the platform could coast to a stop.
#[derive(Debug, Clone)]
pub struct Platform {
    activation: ActivationState,
    start: Vec2,
    displacement: Vec2,
    speed: f32,
    response: f32,
    arrive_epsilon: f32,
    velocity: Vec2,
}

impl Platform {
    /// A platform anchored at `start`.
    pub fn new(
        start: Vec2,
        displacement: Vec2,
        speed: f32,
        config: &PlatformConfig,
        initially_active: bool,
    ) -> Self {
        Self {
            activation: ActivationState::new(initially_active),
            start,
            displacement,
            speed,
            response: config.response.clamp(f32::EPSILON, 1.0),
            arrive_epsilon: config.arrive_epsilon,
            velocity: Vec2::ZERO,
        }
    }

    /// Where the platform is heading.
    pub fn target(&self) -> Vec2 {
        if self.activation.activated {
            self.start
        } else {
            self.start + self.displacement
        }
    }

    fn origin(&self) -> Vec2 {
        if self.activation.activated {
            self.start + self.displacement
        } else {
            self.start
        }
    }

    /// Commanded velocity.
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Advance one tick of `dt` seconds.
    pub fn update(&mut self, ctx: &mut BodyContext<'_>, dt: f32) {
        let position = ctx.position();
        let target = self.target();
        let origin = self.origin();

        if position.distance(target) < self.arrive_epsilon
            || origin.distance(position) > origin.distance(target)
        {
            ctx.set_position(target);
            self.velocity = Vec2::ZERO;
        } else {
            let to_target = target - position;
            let coast = self.velocity.length() * (1.0 - self.response) / self.response * dt;
            let wanted = if to_target.length() <= coast {
                Vec2::ZERO
            } else {
                to_target.normalize_or_zero() * self.speed
            };
            self.velocity += (wanted - self.velocity) * self.response;
        }
        ctx.set_linvel(self.velocity);
    }

    /// Capture state.
    pub fn state(&self) -> PlatformState {
        PlatformState {
            activation: self.activation,
            velocity: self.velocity,
        }
    }

    /// Restore state. The body state is restored separately.
    pub fn restore(&mut self, state: &PlatformState, ctx: &mut BodyContext<'_>) {
        self.activation = state.activation;
        self.velocity = state.velocity;
        ctx.set_linvel(self.velocity);
    }
}

impl Activatable for Platform {
    fn activation(&self) -> &ActivationState {
        &self.activation
    }

    fn activation_mut(&mut self) -> &mut ActivationState {
        &mut self.activation
    }

    fn activated(&mut self, _ctx: &mut BodyContext<'_>) {}

    fn deactivated(&mut self, _ctx: &mut BodyContext<'_>) {}

    fn apply_activation(&mut self, ctx: &mut BodyContext<'_>) {
        self.velocity = Vec2::ZERO;
        ctx.set_position(self.target());
        ctx.set_linvel(Vec2::ZERO);
    }
}

/// Kinematic box.
pub(crate) fn platform_body(position: Vec2, size: Vec2) -> (BodySpec, Vec<ColliderSpec>) {
    let spec = BodySpec::new(BodyKind::Kinematic, position);
    let colliders = vec![ColliderSpec::solid(
        FixtureRole::Body,
        ShapeSpec::rect(size.x, size.y),
    )];
    (spec, colliders)
}

// ---------------------------------------------------------------------------
// PushableBox
// ---------------------------------------------------------------------------

/// Snapshot of a pushable box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushableBoxState {
    /// Activation bookkeeping.
    pub activation: ActivationState,
}

/// A crate that can be pushed while active and is frozen in place otherwise.
#[derive(Debug, Clone)]
pub struct PushableBox {
    activation: ActivationState,
    ground: GroundContacts,
}

impl PushableBox {
    /// A box.
    pub fn new(initially_active: bool) -> Self {
        Self {
            activation: ActivationState::new(initially_active),
            ground: GroundContacts::default(),
        }
    }

    /// Ground contacts.
    pub fn ground(&self) -> &GroundContacts {
        &self.ground
    }

    /// Mutable ground contacts.
    pub fn ground_mut(&mut self) -> &mut GroundContacts {
        &mut self.ground
    }

    fn freeze(ctx: &mut BodyContext<'_>) {
        ctx.physics.set_body_kind(ctx.body, BodyKind::Kinematic);
        ctx.set_linvel(Vec2::ZERO);
    }

    /// Capture state.
    pub fn state(&self) -> PushableBoxState {
        PushableBoxState {
            activation: self.activation,
        }
    }

    /// Restore state.
    pub fn restore(&mut self, state: &PushableBoxState, ctx: &mut BodyContext<'_>) {
        self.activation = state.activation;
        let kind = if self.activation.activated {
            BodyKind::Dynamic
        } else {
            BodyKind::Kinematic
        };
        ctx.physics.set_body_kind(ctx.body, kind);
    }
}

impl Activatable for PushableBox {
    fn activation(&self) -> &ActivationState {
        &self.activation
    }

    fn activation_mut(&mut self) -> &mut ActivationState {
        &mut self.activation
    }

    fn activated(&mut self, ctx: &mut BodyContext<'_>) {
        ctx.physics.set_body_kind(ctx.body, BodyKind::Dynamic);
    }

    fn deactivated(&mut self, ctx: &mut BodyContext<'_>) {
        Self::freeze(ctx);
    }

    fn apply_activation(&mut self, ctx: &mut BodyContext<'_>) {
        if self.activation.activated {
            ctx.physics.set_body_kind(ctx.body, BodyKind::Dynamic);
        } else {
            Self::freeze(ctx);
        }
    }
}

/// Dynamic square with a ground sensor.
pub(crate) fn box_body(position: Vec2, config: &BoxConfig) -> (BodySpec, Vec<ColliderSpec>) {
    let size = config.size;
    let spec = BodySpec::new(BodyKind::Dynamic, position).fixed_rotation();
    let colliders = vec![
        ColliderSpec::solid(FixtureRole::Body, ShapeSpec::rect(size, size))
            .density(config.density)
            .friction(config.friction),
        ColliderSpec::sensor(FixtureRole::GroundSensor, ShapeSpec::rect(size * 0.6, 0.05))
            .at(Vec2::new(0.0, -size * 0.5)),
    ];
    (spec, colliders)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacle::ObstacleId;
    use crate::physics::PhysicsWorld;

    const DT: f32 = 1.0 / 60.0;

    fn platform_world(start: Vec2) -> (PhysicsWorld, rapier2d::prelude::RigidBodyHandle) {
        let mut physics = PhysicsWorld::new(Vec2::ZERO);
        let (spec, colliders) = platform_body(start, Vec2::new(2.0, 0.5));
        let handle = physics
            .create_body(ObstacleId::new(0, 0), &spec, &colliders)
            .unwrap();
        (physics, handle)
    }

    #[test]
    fn inactive_platform_heads_for_far_end() {
        let p = Platform::new(Vec2::ZERO, Vec2::new(4.0, 0.0), 3.0, &PlatformConfig::default(), false);
        assert_eq!(p.target(), Vec2::new(4.0, 0.0));
        let p = Platform::new(Vec2::ZERO, Vec2::new(4.0, 0.0), 3.0, &PlatformConfig::default(), true);
        assert_eq!(p.target(), Vec2::ZERO);
    }

    #[test]
    fn platform_reaches_target_and_stops() {
        let (mut physics, handle) = platform_world(Vec2::ZERO);
        let mut p = Platform::new(Vec2::ZERO, Vec2::new(2.0, 0.0), 3.0, &PlatformConfig::default(), false);
        for _ in 0..600 {
            p.update(&mut BodyContext::new(&mut physics, handle), DT);
            physics.step(DT);
        }
        let position = physics.position(handle).unwrap();
        assert!((position - Vec2::new(2.0, 0.0)).length() < 0.02, "{position:?}");
        assert_eq!(p.velocity(), Vec2::ZERO);
    }

    #[test]
    fn velocity_eases_toward_speed() {
        let (mut physics, handle) = platform_world(Vec2::ZERO);
        let mut p = Platform::new(Vec2::ZERO, Vec2::new(10.0, 0.0), 3.0, &PlatformConfig::default(), false);
        let mut ctx = BodyContext::new(&mut physics, handle);
        p.update(&mut ctx, DT);
        let first = p.velocity().x;
        p.update(&mut ctx, DT);
        assert!(first > 0.0 && first < 3.0);
        assert!(p.velocity().x > first);
    }

    #[test]
    fn box_freezes_when_deactivated() {
        let mut physics = PhysicsWorld::new(Vec2::new(0.0, -10.0));
        let (spec, colliders) = box_body(Vec2::ZERO, &BoxConfig::default());
        let handle = physics
            .create_body(ObstacleId::new(0, 0), &spec, &colliders)
            .unwrap();
        let mut b = PushableBox::new(true);
        let mut ctx = BodyContext::new(&mut physics, handle);
        b.update_activated(true, &mut ctx);
        assert_eq!(ctx.physics.body_kind(handle), Some(BodyKind::Kinematic));
        assert_eq!(ctx.linvel(), Vec2::ZERO);
        b.update_activated(false, &mut ctx);
        assert_eq!(ctx.physics.body_kind(handle), Some(BodyKind::Dynamic));
    }
}
