//! The player character and its movement state machine.
//!
//! ```text
//! MOVING --jump (grounded or coyote)--> JUMPING --release--> MOVING
//! MOVING/JUMPING --climb on wall--> CLIMBING --jump--> WALL_JUMPING
//! MOVING/JUMPING --dash (ready)--> DASHING --dash_ticks--> MOVING
//! MOVING --jump in the air on a wall--> WALL_JUMPING --wall_jump_ticks--> MOVING
//! ```
//!
//! All velocities set here are relative to the base velocity inherited from
//! whatever the cat stands on; see [`crate::support`].

use std::collections::BTreeSet;

use glam::Vec2;
use ninelives_data::constants::CatConfig;
use serde::{Deserialize, Serialize};

use crate::obstacle::{GroundContacts, ObstacleId};
use crate::physics::{BodyContext, BodyKind, BodySpec, ColliderSpec, FixtureRole, ShapeSpec};

/// Fraction of the current run velocity kept each tick while running.
const RUN_RESPONSE: f32 = 0.84;
/// Run acceleration per unit of scaled input.
const RUN_ACCELERATION: f32 = 0.06;
/// Fraction of the run velocity kept each tick with no input.
const IDLE_DAMPING: f32 = 0.5;
/// Climb speed per unit of scaled input.
const CLIMB_SPEED: f32 = 0.2;
/// Dash speed per unit of scaled input.
const DASH_SPEED: f32 = 1.0 / 1.8;
/// Dash speed with no directional input, per unit of force.
const NEUTRAL_DASH_SPEED: f32 = 1.0 / 1.6;
/// Velocity of a jump off a wall, away from it and up.
const WALL_JUMP: Vec2 = Vec2::new(8.0, 10.0);
/// Velocity of a kick off a wall while steering away from it.
const WALL_KICK: Vec2 = Vec2::new(13.0, 6.0);

/// Movement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatState {
    /// Walking, standing or falling.
    Moving,
    /// Holding jump after takeoff.
    Jumping,
    /// Holding onto a climbable wall.
    Climbing,
    /// Mid-dash.
    Dashing,
    /// Pushed off a wall.
    WallJumping,
}

/// Snapshot of the cat's movement state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CatSnapshot {
    /// Movement state.
    pub state: CatState,
    /// Facing.
    pub facing_right: bool,
    /// Ticks into the current dash; non-zero blocks the next dash until
    /// landing.
    pub dash_timer: u32,
    /// Ticks into the current wall jump.
    pub wall_jump_timer: u32,
    /// Remaining coyote ticks.
    pub coyote_ticks: u32,
    /// Current jump impulse.
    pub jump_impulse: f32,
    /// Dash velocity.
    pub dash_velocity: Vec2,
    /// Wall jump velocity.
    pub wall_jump_velocity: Vec2,
}

/// The player.
#[derive(Debug, Clone)]
pub struct Cat {
    config: CatConfig,
    state: CatState,
    facing_right: bool,
    ground: GroundContacts,
    left_walls: u32,
    right_walls: u32,
    spirit_regions: BTreeSet<ObstacleId>,
    horizontal: f32,
    vertical: f32,
    jump_pressed: bool,
    dash_pressed: bool,
    climb_pressed: bool,
    dash_timer: u32,
    wall_jump_timer: u32,
    coyote_ticks: u32,
    jump_impulse: f32,
    dash_velocity: Vec2,
    wall_jump_velocity: Vec2,
}

impl Cat {
    /// A cat at rest, facing right.
    pub fn new(config: CatConfig) -> Self {
        let jump_impulse = config.jump_force;
        Self {
            config,
            state: CatState::Moving,
            facing_right: true,
            ground: GroundContacts::default(),
            left_walls: 0,
            right_walls: 0,
            spirit_regions: BTreeSet::new(),
            horizontal: 0.0,
            vertical: 0.0,
            jump_pressed: false,
            dash_pressed: false,
            climb_pressed: false,
            dash_timer: 0,
            wall_jump_timer: 0,
            coyote_ticks: 0,
            jump_impulse,
            dash_velocity: Vec2::ZERO,
            wall_jump_velocity: Vec2::ZERO,
        }
    }

    // -- accessors ----------------------------------------------------------

    /// Movement state.
    pub fn state(&self) -> CatState {
        self.state
    }

    /// Facing.
    pub fn is_facing_right(&self) -> bool {
        self.facing_right
    }

    /// `-1` when facing right, `1` when facing left; wall jumps push along it.
    pub fn direction_factor(&self) -> f32 {
        if self.facing_right {
            -1.0
        } else {
            1.0
        }
    }

    /// Whether the ground sensor touches anything.
    pub fn is_grounded(&self) -> bool {
        self.ground.is_grounded()
    }

    /// Ground contacts.
    pub fn ground(&self) -> &GroundContacts {
        &self.ground
    }

    /// Mutable ground contacts.
    pub fn ground_mut(&mut self) -> &mut GroundContacts {
        &mut self.ground
    }

    /// Whether the sensor on the facing side touches a climbable wall.
    pub fn is_walled(&self) -> bool {
        let count = if self.facing_right {
            self.right_walls
        } else {
            self.left_walls
        };
        count > 0
    }

    /// Wall contacts on (left, right).
    pub fn wall_contacts(&self) -> (u32, u32) {
        (self.left_walls, self.right_walls)
    }

    /// Spirit regions currently occupied.
    pub fn spirit_regions(&self) -> &BTreeSet<ObstacleId> {
        &self.spirit_regions
    }

    // -- input --------------------------------------------------------------

    /// Horizontal input in `[-1, 1]`. Non-zero input turns the cat.
    pub fn set_horizontal_movement(&mut self, value: f32) {
        self.horizontal = value * self.config.force;
        if self.horizontal != 0.0 {
            self.set_facing_right(self.horizontal > 0.0);
        }
    }

    /// Vertical input in `[-1, 1]`.
    pub fn set_vertical_movement(&mut self, value: f32) {
        self.vertical = value * self.config.force;
    }

    /// Jump held.
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        self.jump_pressed = pressed;
    }

    /// Dash pressed.
    pub fn set_dash_pressed(&mut self, pressed: bool) {
        self.dash_pressed = pressed;
    }

    /// Climb held.
    pub fn set_climbing_pressed(&mut self, pressed: bool) {
        self.climb_pressed = pressed;
    }

    /// Turn. Ignored while climbing.
    pub fn set_facing_right(&mut self, facing_right: bool) {
        if self.state != CatState::Climbing {
            self.facing_right = facing_right;
        }
    }

    // -- contacts -----------------------------------------------------------

    /// A side sensor started touching a climbable wall.
    pub fn add_wall(&mut self, side: FixtureRole) {
        match side {
            FixtureRole::LeftSensor => self.left_walls += 1,
            FixtureRole::RightSensor => self.right_walls += 1,
            _ => {}
        }
    }

    /// A side sensor stopped touching a climbable wall.
    pub fn remove_wall(&mut self, side: FixtureRole) {
        match side {
            FixtureRole::LeftSensor => self.left_walls = self.left_walls.saturating_sub(1),
            FixtureRole::RightSensor => self.right_walls = self.right_walls.saturating_sub(1),
            _ => {}
        }
    }

    /// Entered a spirit region.
    pub fn enter_region(&mut self, region: ObstacleId) {
        self.spirit_regions.insert(region);
    }

    /// Left a spirit region.
    pub fn leave_region(&mut self, region: ObstacleId) {
        self.spirit_regions.remove(&region);
    }

    /// The ground set went from empty to non-empty. Kills the bounce and
    /// recharges dash and jump.
    pub fn land(&mut self, ctx: &mut BodyContext<'_>) {
        let v = ctx.linvel();
        ctx.set_linvel(Vec2::new(v.x, 0.0));
        self.on_grounded_reset();
    }

    /// The ground set became empty. Walking off a ledge opens the coyote
    /// window.
    pub fn leave_ground(&mut self) {
        if self.state == CatState::Moving {
            self.coyote_ticks = self.config.coyote_ticks;
        }
    }

    fn on_grounded_reset(&mut self) {
        self.dash_timer = 0;
        self.coyote_ticks = 0;
        self.jump_impulse = self.config.jump_force;
    }

    // -- state machine ------------------------------------------------------

    fn set_relative_velocity(ctx: &mut BodyContext<'_>, base: Vec2, x: Option<f32>, y: Option<f32>) {
        let v = ctx.linvel();
        ctx.set_linvel(Vec2::new(
            x.map_or(v.x, |x| x + base.x),
            y.map_or(v.y, |y| y + base.y),
        ));
    }

    fn start_dash(&mut self, ctx: &mut BodyContext<'_>) {
        self.state = CatState::Dashing;
        ctx.physics.set_gravity_scale(ctx.body, 0.0);
        let mut dash = Vec2::new(self.horizontal, self.vertical) * DASH_SPEED;
        if self.horizontal == 0.0 && self.vertical == 0.0 {
            let side = if self.facing_right { 1.0 } else { -1.0 };
            dash = Vec2::new(side * self.config.force * NEUTRAL_DASH_SPEED, 0.0);
        } else if self.horizontal != 0.0 && self.vertical != 0.0 {
            dash /= std::f32::consts::SQRT_2;
        }
        self.dash_velocity = dash;
    }

    fn start_climb(&mut self, ctx: &mut BodyContext<'_>) {
        self.state = CatState::Climbing;
        ctx.physics.set_gravity_scale(ctx.body, 0.0);
    }

    fn back_to_moving(&mut self, ctx: &mut BodyContext<'_>) {
        self.state = CatState::Moving;
        ctx.physics.set_gravity_scale(ctx.body, self.config.gravity_scale);
    }

    /// Advance the state machine one tick from the latest input.
    pub fn update_state(&mut self, ctx: &mut BodyContext<'_>, base: Vec2) {
        self.coyote_ticks = self.coyote_ticks.saturating_sub(1);
        match self.state {
            CatState::Moving => {
                if self.jump_pressed && (self.is_grounded() || self.coyote_ticks > 0) {
                    self.state = CatState::Jumping;
                    self.coyote_ticks = 0;
                    return;
                }
                if self.is_walled() && self.climb_pressed {
                    self.start_climb(ctx);
                    return;
                }
                if self.dash_timer == 0 && self.dash_pressed {
                    self.start_dash(ctx);
                    return;
                }
                if self.jump_pressed && !self.is_grounded() && self.is_walled() {
                    self.wall_jump_velocity =
                        Vec2::new(WALL_JUMP.x * self.direction_factor(), WALL_JUMP.y);
                    self.state = CatState::WallJumping;
                }
            }
            CatState::Jumping => {
                if !self.jump_pressed {
                    self.state = CatState::Moving;
                    return;
                }
                if self.is_walled() && self.climb_pressed {
                    self.start_climb(ctx);
                    return;
                }
                if self.dash_timer == 0 && self.dash_pressed {
                    self.start_dash(ctx);
                }
            }
            CatState::Climbing => {
                if !self.is_walled() || !self.climb_pressed {
                    self.back_to_moving(ctx);
                } else if self.jump_pressed {
                    let steer = self.horizontal.signum();
                    self.wall_jump_velocity =
                        if self.horizontal != 0.0 && steer == self.direction_factor() {
                            Vec2::new(WALL_KICK.x * steer, WALL_KICK.y)
                        } else {
                            Vec2::new(WALL_JUMP.x * self.direction_factor(), WALL_JUMP.y)
                        };
                    self.back_to_moving(ctx);
                    self.state = CatState::WallJumping;
                }
            }
            CatState::Dashing => {
                self.dash_timer += 1;
                if self.dash_timer >= self.config.dash_ticks {
                    self.back_to_moving(ctx);
                    if ctx.linvel().y - base.y > 0.0 {
                        Self::set_relative_velocity(ctx, base, None, Some(self.config.max_speed));
                    }
                    if self.is_grounded() {
                        self.on_grounded_reset();
                    }
                }
            }
            CatState::WallJumping => {
                self.wall_jump_timer += 1;
                if self.wall_jump_timer > self.config.wall_jump_ticks {
                    self.state = CatState::Moving;
                    self.wall_jump_timer = 0;
                }
            }
        }
    }

    /// Apply the forces of the current state.
    pub fn apply_force(&mut self, ctx: &mut BodyContext<'_>, base: Vec2) {
        let relative = ctx.linvel() - base;
        match self.state {
            CatState::Moving | CatState::Jumping => {
                if self.state == CatState::Jumping {
                    self.jump_impulse *= self.config.jump_damping;
                    ctx.physics
                        .apply_impulse(ctx.body, Vec2::new(0.0, self.jump_impulse));
                }
                let speed = if self.horizontal == 0.0 {
                    relative.x * IDLE_DAMPING
                } else {
                    RUN_RESPONSE * (relative.x + self.horizontal * RUN_ACCELERATION)
                };
                Self::set_relative_velocity(ctx, base, Some(speed), None);
            }
            CatState::Climbing => {
                Self::set_relative_velocity(ctx, base, Some(0.0), Some(self.vertical * CLIMB_SPEED));
            }
            CatState::Dashing => {
                Self::set_relative_velocity(ctx, base, Some(self.dash_velocity.x), Some(self.dash_velocity.y));
            }
            CatState::WallJumping => {
                Self::set_relative_velocity(
                    ctx,
                    base,
                    Some(self.wall_jump_velocity.x),
                    Some(self.wall_jump_velocity.y),
                );
            }
        }
    }

    /// Back to a neutral state after respawning or taking over a body.
    pub fn reset_motion(&mut self, ctx: &mut BodyContext<'_>) {
        self.back_to_moving(ctx);
        self.wall_jump_timer = 0;
        self.on_grounded_reset();
    }

    // -- snapshots ----------------------------------------------------------

    /// Capture movement state.
    pub fn state_snapshot(&self) -> CatSnapshot {
        CatSnapshot {
            state: self.state,
            facing_right: self.facing_right,
            dash_timer: self.dash_timer,
            wall_jump_timer: self.wall_jump_timer,
            coyote_ticks: self.coyote_ticks,
            jump_impulse: self.jump_impulse,
            dash_velocity: self.dash_velocity,
            wall_jump_velocity: self.wall_jump_velocity,
        }
    }

    /// Restore movement state, including the gravity scale it implies.
    pub fn restore(&mut self, snapshot: &CatSnapshot, ctx: &mut BodyContext<'_>) {
        self.state = snapshot.state;
        self.facing_right = snapshot.facing_right;
        self.dash_timer = snapshot.dash_timer;
        self.wall_jump_timer = snapshot.wall_jump_timer;
        self.coyote_ticks = snapshot.coyote_ticks;
        self.jump_impulse = snapshot.jump_impulse;
        self.dash_velocity = snapshot.dash_velocity;
        self.wall_jump_velocity = snapshot.wall_jump_velocity;
        let gravity = match self.state {
            CatState::Climbing | CatState::Dashing => 0.0,
            _ => self.config.gravity_scale,
        };
        ctx.physics.set_gravity_scale(ctx.body, gravity);
    }
}

/// Dynamic, rotation-locked body with ground, side and hazard sensors.
pub(crate) fn body(position: Vec2, config: &CatConfig) -> (BodySpec, Vec<ColliderSpec>) {
    let (w, h) = (config.width, config.height);
    let spec = BodySpec::new(BodyKind::Dynamic, position)
        .fixed_rotation()
        .gravity_scale(config.gravity_scale);
    let colliders = vec![
        ColliderSpec::solid(FixtureRole::Body, ShapeSpec::rect(w, h))
            .density(config.density)
            .friction(config.friction),
        ColliderSpec::sensor(
            FixtureRole::GroundSensor,
            ShapeSpec::rect(w * config.ground_sensor_shrink, config.ground_sensor_height),
        )
        .at(Vec2::new(0.0, -h * 0.5)),
        ColliderSpec::sensor(
            FixtureRole::LeftSensor,
            ShapeSpec::rect(config.side_sensor_width, h * config.side_sensor_shrink),
        )
        .at(Vec2::new(-w * 0.5, 0.0)),
        ColliderSpec::sensor(
            FixtureRole::RightSensor,
            ShapeSpec::rect(config.side_sensor_width, h * config.side_sensor_shrink),
        )
        .at(Vec2::new(w * 0.5, 0.0)),
        ColliderSpec::sensor(
            FixtureRole::Hitbox,
            ShapeSpec::rect(w + 2.0 * config.hitbox_margin, h + 2.0 * config.hitbox_margin),
        ),
    ];
    (spec, colliders)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{FixtureTag, PhysicsWorld};

    fn world_with_cat() -> (PhysicsWorld, rapier2d::prelude::RigidBodyHandle, Cat) {
        let config = CatConfig::default();
        let mut physics = PhysicsWorld::new(Vec2::ZERO);
        let (spec, colliders) = body(Vec2::new(0.0, 1.0), &config);
        let handle = physics
            .create_body(ObstacleId::new(0, 0), &spec, &colliders)
            .unwrap();
        (physics, handle, Cat::new(config))
    }

    fn ground_tag() -> FixtureTag {
        FixtureTag::new(ObstacleId::new(5, 0), FixtureRole::Body)
    }

    #[test]
    fn grounded_jump_enters_jumping() {
        let (mut physics, handle, mut cat) = world_with_cat();
        let mut ctx = BodyContext::new(&mut physics, handle);
        cat.ground_mut().add(ground_tag());
        cat.set_jump_pressed(true);
        cat.update_state(&mut ctx, Vec2::ZERO);
        assert_eq!(cat.state(), CatState::Jumping);
        cat.set_jump_pressed(false);
        cat.update_state(&mut ctx, Vec2::ZERO);
        assert_eq!(cat.state(), CatState::Moving);
    }

    #[test]
    fn airborne_jump_without_coyote_does_nothing() {
        let (mut physics, handle, mut cat) = world_with_cat();
        let mut ctx = BodyContext::new(&mut physics, handle);
        cat.set_jump_pressed(true);
        cat.update_state(&mut ctx, Vec2::ZERO);
        assert_eq!(cat.state(), CatState::Moving);
    }

    #[test]
    fn coyote_window_allows_late_jump() {
        let (mut physics, handle, mut cat) = world_with_cat();
        let mut ctx = BodyContext::new(&mut physics, handle);
        cat.ground_mut().add(ground_tag());
        cat.ground_mut().remove(ground_tag());
        cat.leave_ground();
        cat.update_state(&mut ctx, Vec2::ZERO);
        cat.set_jump_pressed(true);
        cat.update_state(&mut ctx, Vec2::ZERO);
        assert_eq!(cat.state(), CatState::Jumping);
    }

    #[test]
    fn dash_lasts_configured_ticks_and_needs_landing_to_recharge() {
        let (mut physics, handle, mut cat) = world_with_cat();
        let mut ctx = BodyContext::new(&mut physics, handle);
        cat.set_dash_pressed(true);
        cat.update_state(&mut ctx, Vec2::ZERO);
        assert_eq!(cat.state(), CatState::Dashing);
        assert_eq!(ctx.physics.gravity_scale(handle), Some(0.0));
        for _ in 0..CatConfig::default().dash_ticks {
            cat.update_state(&mut ctx, Vec2::ZERO);
        }
        assert_eq!(cat.state(), CatState::Moving);
        cat.update_state(&mut ctx, Vec2::ZERO);
        assert_eq!(cat.state(), CatState::Moving, "no second dash in the air");

        cat.land(&mut ctx);
        cat.update_state(&mut ctx, Vec2::ZERO);
        assert_eq!(cat.state(), CatState::Dashing);
    }

    #[test]
    fn neutral_dash_goes_where_the_cat_faces() {
        let (mut physics, handle, mut cat) = world_with_cat();
        let mut ctx = BodyContext::new(&mut physics, handle);
        cat.set_horizontal_movement(-1.0);
        cat.set_horizontal_movement(0.0);
        cat.set_dash_pressed(true);
        cat.update_state(&mut ctx, Vec2::ZERO);
        cat.apply_force(&mut ctx, Vec2::ZERO);
        assert!(ctx.linvel().x < 0.0);
        assert_eq!(ctx.linvel().y, 0.0);
    }

    #[test]
    fn climbing_requires_wall_on_facing_side() {
        let (mut physics, handle, mut cat) = world_with_cat();
        let mut ctx = BodyContext::new(&mut physics, handle);
        cat.add_wall(FixtureRole::LeftSensor);
        cat.set_climbing_pressed(true);
        cat.update_state(&mut ctx, Vec2::ZERO);
        assert_eq!(cat.state(), CatState::Moving, "wall is behind the cat");

        cat.set_facing_right(false);
        cat.update_state(&mut ctx, Vec2::ZERO);
        assert_eq!(cat.state(), CatState::Climbing);
        cat.set_facing_right(true);
        assert!(!cat.is_facing_right(), "cannot turn while climbing");
    }

    #[test]
    fn jumping_off_a_wall_pushes_away() {
        let (mut physics, handle, mut cat) = world_with_cat();
        let mut ctx = BodyContext::new(&mut physics, handle);
        cat.add_wall(FixtureRole::RightSensor);
        cat.set_climbing_pressed(true);
        cat.update_state(&mut ctx, Vec2::ZERO);
        assert_eq!(cat.state(), CatState::Climbing);
        cat.set_jump_pressed(true);
        cat.update_state(&mut ctx, Vec2::ZERO);
        assert_eq!(cat.state(), CatState::WallJumping);
        cat.apply_force(&mut ctx, Vec2::ZERO);
        assert!(ctx.linvel().x < 0.0, "wall on the right pushes left");
        assert!(ctx.linvel().y > 0.0);
    }

    #[test]
    fn run_velocity_is_relative_to_base() {
        let (mut physics, handle, mut cat) = world_with_cat();
        let mut ctx = BodyContext::new(&mut physics, handle);
        let base = Vec2::new(2.0, 0.0);
        ctx.set_linvel(base);
        cat.apply_force(&mut ctx, base);
        assert!((ctx.linvel().x - 2.0).abs() < 1e-6, "idle cat rides along");
    }

    #[test]
    fn snapshot_restores_gravity() {
        let (mut physics, handle, mut cat) = world_with_cat();
        let mut ctx = BodyContext::new(&mut physics, handle);
        cat.set_dash_pressed(true);
        cat.update_state(&mut ctx, Vec2::ZERO);
        let saved = cat.state_snapshot();
        cat.reset_motion(&mut ctx);
        assert_eq!(ctx.physics.gravity_scale(handle), Some(CatConfig::default().gravity_scale));
        cat.restore(&saved, &mut ctx);
        assert_eq!(cat.state(), CatState::Dashing);
        assert_eq!(ctx.physics.gravity_scale(handle), Some(0.0));
    }
}
