//! Doors that slide shut when activated.
//!
//! The door body is rotated so that local `+y` points in the closing
//! direction. Its collider grows from the local bottom edge as the door
//! closes and is disabled while the door is fully open.

use glam::Vec2;
use ninelives_data::Direction;
use serde::{Deserialize, Serialize};

use crate::activation::{Activatable, ActivationState};
use crate::physics::{BodyContext, BodyKind, BodySpec, ColliderSpec, FixtureRole, ShapeSpec};

/// Which way the door is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorMotion {
    /// At rest, fully open or fully closed.
    Idle,
    /// Sliding shut.
    Closing,
    /// Sliding open.
    Opening,
}

/// Snapshot of a door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorState {
    /// Activation bookkeeping.
    pub activation: ActivationState,
    /// Ticks left in the current motion.
    pub ticks_remaining: u32,
    /// Current motion.
    pub motion: DoorMotion,
}

/// A sliding door.
#[derive(Debug, Clone)]
pub struct Door {
    activation: ActivationState,
    direction: Direction,
    size: Vec2,
    total_ticks: u32,
    ticks_remaining: u32,
    motion: DoorMotion,
}

impl Door {
    /// A door of `size` (width across, length along the closing direction)
    /// that takes `total_ticks` to close fully.
    pub fn new(direction: Direction, size: Vec2, total_ticks: u32, initially_active: bool) -> Self {
        Self {
            activation: ActivationState::new(initially_active),
            direction,
            size,
            total_ticks: total_ticks.max(1),
            ticks_remaining: 0,
            motion: DoorMotion::Idle,
        }
    }

    /// Closing direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Current motion.
    pub fn motion(&self) -> DoorMotion {
        self.motion
    }

    /// Ticks left in the current motion.
    pub fn ticks_remaining(&self) -> u32 {
        self.ticks_remaining
    }

    /// Ticks to close fully.
    pub fn total_ticks(&self) -> u32 {
        self.total_ticks
    }

    /// How far closed the door is, in ticks out of [`total_ticks`](Self::total_ticks).
    pub fn closedness(&self) -> u32 {
        match self.motion {
            DoorMotion::Closing => self.total_ticks - self.ticks_remaining,
            DoorMotion::Opening => self.ticks_remaining,
            DoorMotion::Idle if self.activation.activated => self.total_ticks,
            DoorMotion::Idle => 0,
        }
    }

    /// Whether the door is fully shut and still.
    pub fn is_closed(&self) -> bool {
        self.closedness() == self.total_ticks
    }

    /// Advance the current motion one tick.
    pub fn update(&mut self, ctx: &mut BodyContext<'_>) {
        if self.motion != DoorMotion::Idle {
            self.ticks_remaining = self.ticks_remaining.saturating_sub(1);
            if self.ticks_remaining == 0 {
                self.motion = DoorMotion::Idle;
            }
            self.resize(ctx);
        }
    }

    fn resize(&self, ctx: &mut BodyContext<'_>) {
        let closed = self.closedness();
        if closed == 0 {
            ctx.physics.set_collider_enabled(ctx.body, FixtureRole::Body, false);
            return;
        }
        let length = self.size.y * closed as f32 / self.total_ticks as f32;
        ctx.physics.set_collider_enabled(ctx.body, FixtureRole::Body, true);
        ctx.physics.set_collider_shape(
            ctx.body,
            FixtureRole::Body,
            &ShapeSpec::rect(self.size.x, length),
            Vec2::new(0.0, (length - self.size.y) * 0.5),
        );
    }

    /// Capture state.
    pub fn state(&self) -> DoorState {
        DoorState {
            activation: self.activation,
            ticks_remaining: self.ticks_remaining,
            motion: self.motion,
        }
    }

    /// Restore state and bring the collider in line.
    pub fn restore(&mut self, state: &DoorState, ctx: &mut BodyContext<'_>) {
        self.activation = state.activation;
        self.ticks_remaining = state.ticks_remaining.min(self.total_ticks);
        self.motion = state.motion;
        self.resize(ctx);
    }
}

impl Activatable for Door {
    fn activation(&self) -> &ActivationState {
        &self.activation
    }

    fn activation_mut(&mut self) -> &mut ActivationState {
        &mut self.activation
    }

    fn activated(&mut self, ctx: &mut BodyContext<'_>) {
        let closed = match self.motion {
            DoorMotion::Opening => self.ticks_remaining,
            _ => 0,
        };
        self.ticks_remaining = self.total_ticks - closed;
        self.motion = DoorMotion::Closing;
        self.resize(ctx);
    }

    fn deactivated(&mut self, ctx: &mut BodyContext<'_>) {
        let closed = match self.motion {
            DoorMotion::Closing => self.total_ticks - self.ticks_remaining,
            _ => self.total_ticks,
        };
        self.ticks_remaining = closed;
        self.motion = if closed == 0 {
            DoorMotion::Idle
        } else {
            DoorMotion::Opening
        };
        self.resize(ctx);
    }

    fn apply_activation(&mut self, ctx: &mut BodyContext<'_>) {
        self.motion = DoorMotion::Idle;
        self.ticks_remaining = 0;
        self.resize(ctx);
    }
}

/// Fixed body rotated to the closing direction.
pub(crate) fn body(position: Vec2, direction: Direction, size: Vec2) -> (BodySpec, Vec<ColliderSpec>) {
    let spec = BodySpec::new(BodyKind::Fixed, position).angle(direction.angle_radians());
    let colliders = vec![ColliderSpec::solid(
        FixtureRole::Body,
        ShapeSpec::rect(size.x, size.y),
    )];
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
    use crate::physics::PhysicsWorld;

    fn with_door(initial: bool, f: impl FnOnce(&mut Door, &mut BodyContext<'_>)) {
        let mut physics = PhysicsWorld::new(Vec2::ZERO);
        let size = Vec2::new(0.5, 3.0);
        let (spec, colliders) = body(Vec2::ZERO, Direction::Down, size);
        let handle = physics
            .create_body(ObstacleId::new(0, 0), &spec, &colliders)
            .unwrap();
        let mut door = Door::new(Direction::Down, size, 4, initial);
        let mut ctx = BodyContext::new(&mut physics, handle);
        door.apply_activation(&mut ctx);
        f(&mut door, &mut ctx);
    }

    #[test]
    fn open_door_has_no_collider() {
        with_door(false, |door, ctx| {
            assert_eq!(door.closedness(), 0);
            assert!(!ctx.physics.collider_enabled(ctx.body, FixtureRole::Body));
        });
    }

    #[test]
    fn closing_takes_exactly_total_ticks() {
        with_door(false, |door, ctx| {
            assert_eq!(door.update_activated(true, ctx), ActivationChange::JustActivated);
            assert_eq!(door.motion(), DoorMotion::Closing);
            assert_eq!(door.ticks_remaining(), 4);
            for expected in [3, 2, 1] {
                door.update(ctx);
                assert_eq!(door.ticks_remaining(), expected);
                assert_eq!(door.motion(), DoorMotion::Closing);
            }
            door.update(ctx);
            assert_eq!(door.motion(), DoorMotion::Idle);
            assert!(door.is_closed());
            assert!(ctx.physics.collider_enabled(ctx.body, FixtureRole::Body));
        });
    }

    #[test]
    fn reversing_midway_keeps_progress() {
        with_door(false, |door, ctx| {
            door.update_activated(true, ctx);
            door.update(ctx);
            assert_eq!(door.closedness(), 1);
            door.update_activated(false, ctx);
            assert_eq!(door.motion(), DoorMotion::Opening);
            assert_eq!(door.closedness(), 1);
            door.update(ctx);
            assert_eq!(door.closedness(), 0);
            assert_eq!(door.motion(), DoorMotion::Idle);
            assert!(!ctx.physics.collider_enabled(ctx.body, FixtureRole::Body));
        });
    }

    #[test]
    fn initially_closed_door_opens_on_signal() {
        with_door(true, |door, ctx| {
            assert!(door.is_closed());
            assert_eq!(door.update_activated(true, ctx), ActivationChange::JustDeactivated);
            assert_eq!(door.ticks_remaining(), 4);
            assert_eq!(door.motion(), DoorMotion::Opening);
        });
    }

    #[test]
    fn restore_puts_door_back_mid_motion() {
        with_door(false, |door, ctx| {
            door.update_activated(true, ctx);
            door.update(ctx);
            let saved = door.state();
            door.update(ctx);
            door.update(ctx);
            door.restore(&saved, ctx);
            assert_eq!(door.state(), saved);
            assert_eq!(door.closedness(), 1);
        });
    }
}
