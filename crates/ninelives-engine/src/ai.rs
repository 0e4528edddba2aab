//! Mob steering.
//!
//! ```text
//! SPAWN --first tick--> WANDER --aggressive and sees cat--> CHASE
//!                          ^                                  |
//!                          +--------- loses sight ------------+
//! ```
//!
//! Wandering mobs walk in their facing direction and only turn around when
//! the contact controller flips them. Chasing mobs head for the cat's x
//! position at `chase_multiplier` times the wander speed. Mobs are moved by
//! shifting their x position each tick; their own horizontal velocity is
//! damped away.

use glam::Vec2;
use ninelives_data::constants::MobConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::obstacle::{Mob, ObstacleId};
use crate::physics::{BodyContext, RayCaster};

/// Behaviour state of one mob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiState {
    /// Just placed; starts wandering next tick.
    Spawn,
    /// Walking in the facing direction.
    Wander,
    /// Heading for the cat.
    Chase,
}

/// Where the cat is, as seen by the AI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    /// The cat obstacle.
    pub id: ObstacleId,
    /// Cat position.
    pub position: Vec2,
    /// Half-height of the vertical band a mob can see in.
    pub band: f32,
}

/// Whether a mob at `position` facing `facing_right` can see `target`.
///
/// The cat must be within the vertical band, on the facing side, and
/// nothing solid may lie between the two on a horizontal ray.
pub fn line_of_sight(
    caster: &impl RayCaster,
    mob: ObstacleId,
    position: Vec2,
    facing_right: bool,
    target: &Target,
) -> bool {
    let offset = target.position - position;
    if offset.y.abs() > target.band {
        return false;
    }
    let ahead = if facing_right { offset.x >= 0.0 } else { offset.x <= 0.0 };
    if !ahead {
        return false;
    }
    let distance = offset.x.abs();
    let direction = Vec2::new(if facing_right { 1.0 } else { -1.0 }, 0.0);
    match caster.cast_ray(position, direction, distance, Some(mob)) {
        Some(hit) => hit.tag.is_some_and(|tag| tag.obstacle == target.id),
        None => true,
    }
}

/// Per-mob controller.
#[derive(Debug, Clone, PartialEq)]
pub struct MobAi {
    mob: ObstacleId,
    state: AiState,
}

impl MobAi {
    /// A controller for `mob`, starting in [`AiState::Spawn`].
    pub fn new(mob: ObstacleId) -> Self {
        Self {
            mob,
            state: AiState::Spawn,
        }
    }

    /// The controlled mob.
    pub fn mob(&self) -> ObstacleId {
        self.mob
    }

    /// Current state.
    pub fn state(&self) -> AiState {
        self.state
    }

    /// Back to [`AiState::Spawn`], e.g. after a snapshot is restored.
    pub fn reset(&mut self) {
        self.state = AiState::Spawn;
    }

    /// Advance one tick and return the horizontal displacement to apply.
    ///
    /// `sees_target` is the line-of-sight result for this tick, `mob_x` and
    /// `target_x` the current x positions.
    pub fn step(&mut self, mob: &Mob, sees_target: bool, mob_x: f32, target_x: Option<f32>, config: &MobConfig) -> f32 {
        let wander = if mob.is_facing_right() {
            config.move_speed
        } else {
            -config.move_speed
        };
        match self.state {
            AiState::Spawn => {
                self.state = AiState::Wander;
                0.0
            }
            AiState::Wander => {
                if mob.is_aggressive() && sees_target {
                    debug!(mob = %self.mob, "mob starts chasing");
                    self.state = AiState::Chase;
                }
                wander
            }
            AiState::Chase => match target_x {
                Some(x) if sees_target => {
                    let speed = config.move_speed * config.chase_multiplier;
                    if mob_x <= x {
                        speed
                    } else {
                        -speed
                    }
                }
                _ => {
                    debug!(mob = %self.mob, "mob lost its target");
                    self.state = AiState::Wander;
                    wander
                }
            },
        }
    }
}

/// Shift the mob by `dx` and damp its own horizontal velocity.
pub fn apply_movement(ctx: &mut BodyContext<'_>, dx: f32) {
    let position = ctx.position();
    ctx.set_position(position + Vec2::new(dx, 0.0));
    let v = ctx.linvel();
    ctx.set_linvel(Vec2::new(0.0, v.y));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{FixtureRole, FixtureTag, RayHit};

    /// A scene holding at most one blocker on the x axis.
    struct Wall(Option<(ObstacleId, f32)>);

    impl RayCaster for Wall {
        fn cast_ray(&self, origin: Vec2, dir: Vec2, max: f32, _exclude: Option<ObstacleId>) -> Option<RayHit> {
            let (id, x) = self.0?;
            let distance = (x - origin.x) * dir.x;
            (distance >= 0.0 && distance <= max).then(|| RayHit {
                tag: Some(FixtureTag::new(id, FixtureRole::Body)),
                point: Vec2::new(x, origin.y),
                distance,
            })
        }
    }

    fn id(i: u32) -> ObstacleId {
        ObstacleId::new(i, 0)
    }

    fn target(x: f32, y: f32) -> Target {
        Target {
            id: id(1),
            position: Vec2::new(x, y),
            band: 0.9,
        }
    }

    #[test]
    fn sight_needs_band_side_and_clear_path() {
        let mob = id(2);
        assert!(line_of_sight(&Wall(None), mob, Vec2::ZERO, true, &target(5.0, 0.5)));
        assert!(!line_of_sight(&Wall(None), mob, Vec2::ZERO, true, &target(5.0, 2.0)));
        assert!(!line_of_sight(&Wall(None), mob, Vec2::ZERO, false, &target(5.0, 0.0)));
        assert!(!line_of_sight(&Wall(Some((id(9), 3.0))), mob, Vec2::ZERO, true, &target(5.0, 0.0)));
        assert!(line_of_sight(&Wall(Some((id(1), 5.0))), mob, Vec2::ZERO, true, &target(5.0, 0.0)));
    }

    #[test]
    fn spawn_wander_chase_and_back() {
        let config = MobConfig::default();
        let mob = Mob::new(true, true);
        let mut ai = MobAi::new(id(2));

        assert_eq!(ai.step(&mob, true, 0.0, Some(5.0), &config), 0.0);
        assert_eq!(ai.state(), AiState::Wander);

        assert_eq!(ai.step(&mob, true, 0.0, Some(5.0), &config), config.move_speed);
        assert_eq!(ai.state(), AiState::Chase);

        let dx = ai.step(&mob, true, 0.0, Some(5.0), &config);
        assert_eq!(dx, config.move_speed * config.chase_multiplier);

        ai.step(&mob, false, 0.0, Some(5.0), &config);
        assert_eq!(ai.state(), AiState::Wander);
    }

    #[test]
    fn passive_mob_never_chases() {
        let config = MobConfig::default();
        let mob = Mob::new(false, false);
        let mut ai = MobAi::new(id(2));
        for _ in 0..5 {
            ai.step(&mob, true, 0.0, Some(-3.0), &config);
        }
        assert_eq!(ai.state(), AiState::Wander);
        assert_eq!(ai.step(&mob, true, 0.0, Some(-3.0), &config), -config.move_speed);
    }
}
