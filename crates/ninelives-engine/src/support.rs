//! Base-velocity propagation for objects standing on other objects.
//!
//! A movable obstacle (cat, dead body, pushable box) inherits the velocity of
//! whatever its ground sensor rests on, so that it rides moving platforms and
//! stacks of bodies. Whether a supporter really supports depends on what *it*
//! stands on, which makes the computation recursive.
//!
//! The resolver memoizes one result per obstacle per pass. An obstacle that
//! is reached again while its own result is still being computed is a cycle
//! (two bodies resting on each other) and counts as unsupported.

use std::collections::BTreeMap;

use glam::Vec2;
use tracing::debug;

use crate::obstacle::{ObstacleArena, ObstacleId};
use crate::physics::PhysicsWorld;

/// Resolved support of one obstacle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Support {
    /// Whether the obstacle rests (transitively) on something anchored.
    pub grounded: bool,
    /// Velocity inherited from the supporter.
    pub velocity: Vec2,
}

impl Support {
    const UNSUPPORTED: Support = Support {
        grounded: false,
        velocity: Vec2::ZERO,
    };
}

#[derive(Debug, Clone, Copy)]
enum Visit {
    InProgress,
    Done(Support),
}

/// Summary of one propagation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupportReport {
    /// Movable obstacles whose base velocity was recomputed.
    pub movers: usize,
    /// Revisits cut short by the cycle guard.
    pub cycles: usize,
}

/// Per-pass memo of resolved supports.
#[derive(Debug, Default)]
pub struct SupportResolver {
    visits: BTreeMap<ObstacleId, Visit>,
    cycles: usize,
}

impl SupportResolver {
    /// A resolver with an empty memo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Revisits cut short so far.
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// Resolve the support of `id`.
    ///
    /// Obstacles without a ground sensor (walls, platforms, doors) are
    /// anchors: always grounded, moving with their own body. Movable
    /// obstacles take the first grounded supporter in their ground set;
    /// supporters that carry riders hand down their body velocity.
    pub fn resolve(&mut self, id: ObstacleId, arena: &ObstacleArena, physics: &PhysicsWorld) -> Support {
        match self.visits.get(&id) {
            Some(Visit::Done(support)) => return *support,
            Some(Visit::InProgress) => {
                self.cycles += 1;
                debug!(obstacle = %id, "support cycle");
                return Support::UNSUPPORTED;
            }
            None => {}
        }
        let Some(obstacle) = arena.get(id) else {
            return Support::UNSUPPORTED;
        };
        let Some(ground) = obstacle.kind.ground_contacts() else {
            let support = Support {
                grounded: true,
                velocity: physics.linvel(obstacle.body).unwrap_or(Vec2::ZERO),
            };
            self.visits.insert(id, Visit::Done(support));
            return support;
        };

        self.visits.insert(id, Visit::InProgress);
        let mut result = Support::UNSUPPORTED;
        for tag in ground.iter() {
            let supporter = tag.obstacle;
            let Some(other) = arena.get(supporter) else {
                continue;
            };
            if other.removed {
                continue;
            }
            let below = self.resolve(supporter, arena, physics);
            if !below.grounded {
                continue;
            }
            let velocity = if other.kind.carries_riders() {
                physics.linvel(other.body).unwrap_or(Vec2::ZERO)
            } else {
                Vec2::ZERO
            };
            result = Support {
                grounded: true,
                velocity,
            };
            if velocity != Vec2::ZERO {
                break;
            }
        }
        self.visits.insert(id, Visit::Done(result));
        result
    }
}

/// Recompute `base_velocity` for every movable obstacle.
pub fn propagate_base_velocity(arena: &mut ObstacleArena, physics: &PhysicsWorld) -> SupportReport {
    let mut resolver = SupportResolver::new();
    let movers: Vec<ObstacleId> = arena
        .iter()
        .filter(|(_, o)| o.kind.ground_contacts().is_some())
        .map(|(id, _)| id)
        .collect();

    let resolved: Vec<(ObstacleId, Support)> = movers
        .iter()
        .map(|&id| (id, resolver.resolve(id, arena, physics)))
        .collect();
    for (id, support) in &resolved {
        if let Some(obstacle) = arena.get_mut(*id) {
            obstacle.base_velocity = support.velocity;
        }
    }
    SupportReport {
        movers: resolved.len(),
        cycles: resolver.cycles(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacle::platform::{box_body, platform_body};
    use crate::obstacle::{Obstacle, ObstacleKind, Platform, PushableBox, Wall};
    use crate::physics::{BodySpec, ColliderSpec, FixtureRole, FixtureTag};
    use ninelives_data::constants::{BoxConfig, PlatformConfig};

    fn insert(
        arena: &mut ObstacleArena,
        physics: &mut PhysicsWorld,
        (spec, colliders): (BodySpec, Vec<ColliderSpec>),
        kind: ObstacleKind,
    ) -> ObstacleId {
        arena
            .try_insert_with(|id| {
                physics
                    .create_body(id, &spec, &colliders)
                    .map(|body| Obstacle::new("test", body, kind))
                    .ok_or(())
            })
            .unwrap()
    }

    fn crate_box(arena: &mut ObstacleArena, physics: &mut PhysicsWorld, x: f32) -> ObstacleId {
        insert(
            arena,
            physics,
            box_body(Vec2::new(x, 0.0), &BoxConfig::default()),
            ObstacleKind::PushableBox(PushableBox::new(true)),
        )
    }

    fn stand_on(arena: &mut ObstacleArena, rider: ObstacleId, supporter: ObstacleId) {
        arena
            .get_mut(rider)
            .and_then(|o| o.kind.ground_contacts_mut())
            .unwrap()
            .add(FixtureTag::new(supporter, FixtureRole::Body));
    }

    #[test]
    fn stack_rides_a_moving_platform() {
        let mut arena = ObstacleArena::new();
        let mut physics = PhysicsWorld::new(Vec2::ZERO);
        let platform = insert(
            &mut arena,
            &mut physics,
            platform_body(Vec2::ZERO, Vec2::new(3.0, 0.5)),
            ObstacleKind::Platform(Platform::new(
                Vec2::ZERO,
                Vec2::new(5.0, 0.0),
                3.0,
                &PlatformConfig::default(),
                true,
            )),
        );
        let body = arena.get(platform).unwrap().body;
        physics.set_linvel(body, Vec2::new(2.0, 0.0));

        let lower = crate_box(&mut arena, &mut physics, 0.0);
        let upper = crate_box(&mut arena, &mut physics, 1.0);
        stand_on(&mut arena, lower, platform);
        stand_on(&mut arena, upper, lower);
        let lower_body = arena.get(lower).unwrap().body;
        physics.set_linvel(lower_body, Vec2::new(1.5, 0.0));

        let report = propagate_base_velocity(&mut arena, &physics);
        assert_eq!(report.movers, 2);
        assert_eq!(report.cycles, 0);
        assert_eq!(arena.get(lower).unwrap().base_velocity, Vec2::new(2.0, 0.0));
        assert_eq!(arena.get(upper).unwrap().base_velocity, Vec2::new(1.5, 0.0));
    }

    #[test]
    fn mutual_support_is_a_cycle_not_a_stack_overflow() {
        let mut arena = ObstacleArena::new();
        let mut physics = PhysicsWorld::new(Vec2::ZERO);
        let a = crate_box(&mut arena, &mut physics, 0.0);
        let b = crate_box(&mut arena, &mut physics, 2.0);
        stand_on(&mut arena, a, b);
        stand_on(&mut arena, b, a);
        for id in [a, b] {
            let body = arena.get(id).unwrap().body;
            physics.set_linvel(body, Vec2::new(4.0, 0.0));
        }

        let report = propagate_base_velocity(&mut arena, &physics);
        assert!(report.cycles > 0);
        assert_eq!(arena.get(a).unwrap().base_velocity, Vec2::ZERO);
        assert_eq!(arena.get(b).unwrap().base_velocity, Vec2::ZERO);
    }

    #[test]
    fn static_ground_gives_zero_base() {
        let mut arena = ObstacleArena::new();
        let mut physics = PhysicsWorld::new(Vec2::ZERO);
        let wall = insert(
            &mut arena,
            &mut physics,
            crate::obstacle::region::wall_body(vec![
                Vec2::new(-5.0, -1.0),
                Vec2::new(5.0, -1.0),
                Vec2::new(5.0, 0.0),
                Vec2::new(-5.0, 0.0),
            ]),
            ObstacleKind::Wall(Wall::new(false)),
        );
        let rider = crate_box(&mut arena, &mut physics, 0.0);
        stand_on(&mut arena, rider, wall);

        let mut resolver = SupportResolver::new();
        let support = resolver.resolve(rider, &arena, &physics);
        assert!(support.grounded);
        assert_eq!(support.velocity, Vec2::ZERO);
    }

    #[test]
    fn airborne_mover_is_unsupported() {
        let mut arena = ObstacleArena::new();
        let mut physics = PhysicsWorld::new(Vec2::ZERO);
        let rider = crate_box(&mut arena, &mut physics, 0.0);
        let mut resolver = SupportResolver::new();
        assert!(!resolver.resolve(rider, &arena, &physics).grounded);
    }
}
