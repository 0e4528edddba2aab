//! Laser emitters and the mirrors that bend their beams.
//!
//! Beam tracing itself lives in [`crate::beam`]; the emitter only stores the
//! polyline of the last trace for rendering and inspection.

use glam::Vec2;
use ninelives_data::constants::{LaserConfig, MirrorConfig};
use ninelives_data::Direction;
use serde::{Deserialize, Serialize};

use crate::activation::{Activatable, ActivationState};
use crate::physics::{BodyContext, BodyKind, BodySpec, ColliderSpec, FixtureRole, ShapeSpec};

/// Snapshot of a laser. Beam points are recomputed every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaserState {
    /// Activation bookkeeping.
    pub activation: ActivationState,
}

/// A laser emitter.
#[derive(Debug, Clone)]
pub struct Laser {
    direction: Direction,
    activation: ActivationState,
    beam_offset: Vec2,
    points: Vec<Vec2>,
}

impl Laser {
    /// An emitter firing in `direction`. `beam_offset` is the beam origin
    /// in the emitter's local frame.
    pub fn new(direction: Direction, beam_offset: Vec2, initially_active: bool) -> Self {
        Self {
            direction,
            activation: ActivationState::new(initially_active),
            beam_offset,
            points: Vec::new(),
        }
    }

    /// Firing direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Beam origin in the emitter's local frame.
    pub fn beam_offset(&self) -> Vec2 {
        self.beam_offset
    }

    /// Polyline of the last trace; empty while inactive.
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Replace the traced polyline.
    pub fn set_points(&mut self, points: Vec<Vec2>) {
        self.points = points;
    }

    /// Capture state.
    pub fn state(&self) -> LaserState {
        LaserState {
            activation: self.activation,
        }
    }

    /// Restore state.
    pub fn restore(&mut self, state: &LaserState) {
        self.activation = state.activation;
        self.points.clear();
    }
}

impl Activatable for Laser {
    fn activation(&self) -> &ActivationState {
        &self.activation
    }

    fn activation_mut(&mut self) -> &mut ActivationState {
        &mut self.activation
    }

    fn activated(&mut self, _ctx: &mut BodyContext<'_>) {}

    fn deactivated(&mut self, _ctx: &mut BodyContext<'_>) {
        self.points.clear();
    }

    fn apply_activation(&mut self, _ctx: &mut BodyContext<'_>) {
        if !self.activation.activated {
            self.points.clear();
        }
    }
}

/// Fixed emitter body rotated to `direction`.
pub(crate) fn laser_body(position: Vec2, direction: Direction, config: &LaserConfig) -> (BodySpec, Vec<ColliderSpec>) {
    let spec = BodySpec::new(BodyKind::Fixed, position).angle(direction.angle_radians());
    let colliders = vec![ColliderSpec::solid(
        FixtureRole::Body,
        ShapeSpec::rect(config.width, config.height),
    )];
    (spec, colliders)
}

// ---------------------------------------------------------------------------
// Mirror
// ---------------------------------------------------------------------------

/// A one-sided mirror facing `direction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mirror {
    direction: Direction,
}

impl Mirror {
    /// A mirror facing `direction`.
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }

    /// Facing.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Outgoing direction of a beam travelling `incident` that hits this
    /// mirror, or `None` if the beam hits the back and stops.
    pub fn reflect(&self, incident: Direction) -> Option<Direction> {
        use Direction::{Down, Left, Right, Up};
        match (incident, self.direction) {
            (Up, Down) => Some(Left),
            (Up, Right) => Some(Right),
            (Down, Up) => Some(Left),
            (Down, Left) => Some(Left),
            (Left, Right) => Some(Down),
            (Left, Up) => Some(Right),
            (Right, Left) => Some(Up),
            (Right, Down) => Some(Down),
            _ => None,
        }
    }
}

/// Fixed square body.
pub(crate) fn mirror_body(position: Vec2, direction: Direction, config: &MirrorConfig) -> (BodySpec, Vec<ColliderSpec>) {
    let spec = BodySpec::new(BodyKind::Fixed, position).angle(direction.angle_radians());
    let colliders = vec![ColliderSpec::solid(
        FixtureRole::Body,
        ShapeSpec::rect(config.size, config.size),
    )];
    (spec, colliders)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::PhysicsWorld;
    use rapier2d::prelude::RigidBodyHandle;

    #[test]
    fn reflection_table() {
        use Direction::{Down, Left, Right, Up};
        let valid = [
            (Up, Down, Left),
            (Up, Right, Right),
            (Down, Up, Left),
            (Down, Left, Left),
            (Left, Right, Down),
            (Left, Up, Right),
            (Right, Left, Up),
            (Right, Down, Down),
        ];
        let mut hits = 0;
        for incident in Direction::ALL {
            for facing in Direction::ALL {
                let expected = valid
                    .iter()
                    .find(|(i, f, _)| *i == incident && *f == facing)
                    .map(|(_, _, out)| *out);
                assert_eq!(Mirror::new(facing).reflect(incident), expected, "{incident:?} on {facing:?}");
                hits += usize::from(expected.is_some());
            }
        }
        assert_eq!(hits, 8);
    }

    #[test]
    fn deactivation_clears_beam() {
        let mut physics = PhysicsWorld::new(Vec2::ZERO);
        let mut ctx = BodyContext::new(&mut physics, RigidBodyHandle::invalid());
        let mut laser = Laser::new(Direction::Up, Vec2::ZERO, true);
        laser.set_points(vec![Vec2::ZERO, Vec2::Y]);
        laser.update_activated(true, &mut ctx);
        assert!(laser.points().is_empty());
        assert!(!laser.is_activated());
    }
}
