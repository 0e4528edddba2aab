//! Per-tick orchestration before the physics step.
//!
//! [`ActionController::update`] runs, in this order:
//!
//! 1. spirit mode from the switch gesture,
//! 2. a body switch if the gesture was released, otherwise
//! 3. the cat's inputs, state machine and forces,
//! 4. laser tracing,
//! 5. activator countdowns and activation propagation,
//! 6. mob AI.
//!
//! The order matters: lasers see the cat where its forces have just put it,
//! and activatables react to presses from the previous step before mobs
//! decide where to walk.

use glam::Vec2;
use tracing::trace;

use crate::activation::{self, ActivationEdge};
use crate::ai::{self, Target};
use crate::input::{InputFrame, SwitchSignal};
use crate::level::{LaserReport, Level};
use crate::obstacle::ObstacleId;
use crate::physics::BodyContext;

// ---------------------------------------------------------------------------
// ActionReport
// ---------------------------------------------------------------------------

/// What one orchestrator pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionReport {
    /// The dead body taken over this tick, if a switch happened.
    pub switched_into: Option<ObstacleId>,
    /// Whether a switch was attempted without a valid target.
    pub switch_failed: bool,
    /// Whether the cat's inputs were applied.
    pub moved_cat: bool,
    /// Laser pass summary.
    pub lasers: LaserReport,
    /// Activation edges crossed.
    pub activation_edges: Vec<ActivationEdge>,
    /// Mobs stepped.
    pub mobs_stepped: usize,
}

// ---------------------------------------------------------------------------
// ActionController
// ---------------------------------------------------------------------------

/// Drives the cat, lasers, activators and mobs once per tick.
#[derive(Debug, Clone, Default)]
pub struct ActionController {
    ticks: u64,
}

impl ActionController {
    /// A fresh controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of passes run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one pass over `level`.
    pub fn update(&mut self, level: &mut Level, input: &InputFrame, signal: SwitchSignal) -> ActionReport {
        self.ticks += 1;
        let mut report = ActionReport::default();

        level.set_spirit_mode(signal.holding);
        if signal.did_switch {
            report.switched_into = level.switch_body();
            report.switch_failed = report.switched_into.is_none();
            level.set_spirit_mode(false);
        } else {
            report.moved_cat = drive_cat(level, input);
        }

        report.lasers = level.run_lasers();
        report.activation_edges = activation::propagate(&level.graph, &mut level.arena, &mut level.physics);
        report.mobs_stepped = step_mobs(level);

        trace!(
            tick = self.ticks,
            edges = report.activation_edges.len(),
            mobs = report.mobs_stepped,
            "action pass"
        );
        report
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Feed `input` to the cat and apply the resulting forces relative to the
/// velocity of whatever it stands on.
fn drive_cat(level: &mut Level, input: &InputFrame) -> bool {
    if level.is_dead() {
        return false;
    }
    let Some(obstacle) = level.arena.get_mut(level.cat) else {
        return false;
    };
    let base = obstacle.base_velocity;
    let body = obstacle.body;
    let Some(cat) = obstacle.kind.as_cat_mut() else {
        return false;
    };
    cat.set_horizontal_movement(input.horizontal);
    cat.set_vertical_movement(input.vertical);
    cat.set_jump_pressed(input.jump);
    cat.set_dash_pressed(input.dash);
    cat.set_climbing_pressed(input.climb);

    let mut ctx = BodyContext::new(&mut level.physics, body);
    cat.update_state(&mut ctx, base);
    cat.apply_force(&mut ctx, base);
    true
}

/// Step every mob controller and shift its mob.
fn step_mobs(level: &mut Level) -> usize {
    if level.mobs.is_empty() {
        return 0;
    }
    level.physics.refresh_queries();
    let target = level.cat_position().map(|position| Target {
        id: level.cat,
        position,
        band: level.constants.mob.height,
    });

    let mut stepped = 0;
    for index in 0..level.mobs.len() {
        let id = level.mobs[index].mob();
        let Some(obstacle) = level.arena.get(id) else {
            continue;
        };
        if obstacle.removed {
            continue;
        }
        let body = obstacle.body;
        let Some(mob) = obstacle.kind.as_mob() else {
            continue;
        };
        let position = level.physics.position(body).unwrap_or(Vec2::ZERO);
        let sees = target
            .as_ref()
            .is_some_and(|t| ai::line_of_sight(&level.physics, id, position, mob.is_facing_right(), t));
        let dx = level.mobs[index].step(
            mob,
            sees,
            position.x,
            target.map(|t| t.position.x),
            &level.constants.mob,
        );
        ai::apply_movement(&mut BodyContext::new(&mut level.physics, body), dx);
        stepped += 1;
    }
    stepped
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiState;
    use ninelives_data::level::{CatSpawn, MobData, WallData};
    use ninelives_data::{Bounds, GameConstants, LevelData};

    fn level_with(edit: impl FnOnce(&mut LevelData)) -> Level {
        let mut data = LevelData {
            bounds: Bounds {
                x: 0.0,
                y: 0.0,
                width: 30.0,
                height: 20.0,
            },
            cat: CatSpawn { x: 2.0, y: 2.0 },
            walls: vec![WallData {
                name: Some("floor".into()),
                shape: vec![0.0, 0.0, 30.0, 0.0, 30.0, 1.0, 0.0, 1.0],
                climbable: false,
            }],
            ..Default::default()
        };
        edit(&mut data);
        Level::new(&data, &GameConstants::default()).unwrap()
    }

    #[test]
    fn running_right_pushes_the_cat_right() {
        let mut level = level_with(|_| {});
        let mut action = ActionController::new();
        let input = InputFrame {
            horizontal: 1.0,
            ..Default::default()
        };
        let report = action.update(&mut level, &input, SwitchSignal::default());
        assert!(report.moved_cat);
        let body = level.arena().get(level.cat_id()).unwrap().body;
        assert!(level.physics().linvel(body).unwrap().x > 0.0);
        assert_eq!(action.ticks(), 1);
    }

    #[test]
    fn release_without_target_counts_a_failed_switch() {
        let mut level = level_with(|_| {});
        let mut action = ActionController::new();
        let held = SwitchSignal {
            holding: true,
            did_switch: false,
        };
        action.update(&mut level, &InputFrame::default(), held);
        assert!(level.spirit_mode());

        let released = SwitchSignal {
            holding: false,
            did_switch: true,
        };
        let report = action.update(&mut level, &InputFrame::default(), released);
        assert!(report.switch_failed);
        assert!(!report.moved_cat, "a switch tick ignores movement input");
        assert_eq!(level.failed_switches(), 1);
        assert!(!level.spirit_mode());
    }

    #[test]
    fn dead_cat_ignores_input() {
        let mut level = level_with(|_| {});
        level.die();
        let report = ActionController::new().update(
            &mut level,
            &InputFrame {
                horizontal: 1.0,
                ..Default::default()
            },
            SwitchSignal::default(),
        );
        assert!(!report.moved_cat);
    }

    #[test]
    fn mobs_leave_spawn_then_wander() {
        let mut level = level_with(|d| {
            d.mobs.push(MobData {
                x: 20.0,
                y: 1.5,
                aggressive: false,
                facing_right: true,
            })
        });
        let mut action = ActionController::new();
        let mob = level.mob_ais()[0].mob();
        let body = level.arena().get(mob).unwrap().body;
        let start = level.physics().position(body).unwrap().x;

        let report = action.update(&mut level, &InputFrame::default(), SwitchSignal::default());
        assert_eq!(report.mobs_stepped, 1);
        assert_eq!(level.mob_ais()[0].state(), AiState::Wander);
        assert_eq!(level.physics().position(body).unwrap().x, start);

        action.update(&mut level, &InputFrame::default(), SwitchSignal::default());
        let moved = level.physics().position(body).unwrap().x - start;
        assert!((moved - level.constants().mob.move_speed).abs() < 1e-5);
    }
}
