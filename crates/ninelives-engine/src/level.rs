//! The live level: obstacles, physics, lives, checkpoints and undo.
//!
//! A [`Level`] is built by population from [`LevelData`](ninelives_data::LevelData)
//! and then driven one tick at a time by [`crate::game::Game`]. It owns every
//! piece of mutable gameplay state; the controllers borrow it.
//!
//! # Snapshots
//!
//! Two kinds of [`LevelState`] are kept:
//!
//! - the *history*, appended on population and on every checkpoint change;
//! - the *life slots*, one per life, written at index `max_lives - lives`
//!   right after a life is lost (slot 0 holds the populated level).
//!
//! Undo loads slot `max_lives - 1 - lives`, i.e. the state recorded when the
//! previous life began, and is a no-op at full lives.
//!
//! # Restore order
//!
//! 1. lives and checkpoint,
//! 2. destroy every spikes joint,
//! 3. write obstacle snapshots back into the same ids,
//! 4. remove every dead body,
//! 5. rebuild dead bodies from their records,
//! 6. re-weld rebuilt bodies to spikes that still pin.

use std::collections::BTreeSet;

use glam::Vec2;
use ninelives_data::{Bounds, GameConstants, LevelData};
use rapier2d::prelude::RigidBodyHandle;
use tracing::{debug, info, warn};

use crate::activation::{ActivationGraph, Activatable};
use crate::ai::MobAi;
use crate::beam;
use crate::command::{ApplyReport, CommandQueue, CommandReason, LevelCommand};
use crate::contact::{ContactController, ContactOutcome};
use crate::obstacle::{dead_body, Cat, DeadBody, ExitKind, Obstacle, ObstacleArena, ObstacleId, ObstacleKind, Weld};
use crate::physics::{BodyContext, ContactEvent, PhysicsWorld};
use crate::snapshot::{DeadBodySnapshot, LevelState};

// ---------------------------------------------------------------------------
// LaserReport
// ---------------------------------------------------------------------------

/// Summary of one laser pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaserReport {
    /// Active lasers traced.
    pub traced: usize,
    /// Dead bodies found at the end of a beam.
    pub bodies_hit: usize,
    /// Whether a beam ended on the cat.
    pub cat_hit: bool,
}

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// A populated level.
#[derive(Debug)]
pub struct Level {
    pub(crate) arena: ObstacleArena,
    pub(crate) physics: PhysicsWorld,
    pub(crate) graph: ActivationGraph,
    pub(crate) commands: CommandQueue,
    pub(crate) contacts: ContactController,
    pub(crate) bounds: Bounds,
    pub(crate) constants: GameConstants,
    pub(crate) cat: ObstacleId,
    pub(crate) start: Vec2,
    pub(crate) respawn_position: Vec2,
    pub(crate) checkpoint: Option<ObstacleId>,
    pub(crate) lives: u32,
    pub(crate) history: Vec<LevelState>,
    pub(crate) life_states: Vec<Option<LevelState>>,
    pub(crate) mobs: Vec<MobAi>,
    pub(crate) died: bool,
    pub(crate) pending_respawn: bool,
    pub(crate) pending_life_save: bool,
    pub(crate) complete: bool,
    pub(crate) returning: bool,
    pub(crate) failed: bool,
    pub(crate) camera_zoom: Option<f32>,
    pub(crate) spirit_mode: bool,
    pub(crate) failed_switches: u32,
}

impl Level {
    /// Populate a level from authoring data.
    ///
    /// # Errors
    ///
    /// A [`LevelError`](crate::LevelError) for malformed or inconsistent data;
    /// nothing of the level survives a failed population.
    pub fn new(data: &LevelData, constants: &GameConstants) -> Result<Self, crate::LevelError> {
        crate::populate::populate(data, constants)
    }

    // -- accessors ----------------------------------------------------------

    /// Every obstacle.
    pub fn arena(&self) -> &ObstacleArena {
        &self.arena
    }

    /// The physics world.
    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// Activator wiring.
    pub fn graph(&self) -> &ActivationGraph {
        &self.graph
    }

    /// Commands queued for the next drain.
    pub fn commands(&self) -> &CommandQueue {
        &self.commands
    }

    /// The contact controller.
    pub fn contacts(&self) -> &ContactController {
        &self.contacts
    }

    /// Level bounds.
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Tuning in effect.
    pub fn constants(&self) -> &GameConstants {
        &self.constants
    }

    /// The cat's obstacle id.
    pub fn cat_id(&self) -> ObstacleId {
        self.cat
    }

    /// The cat.
    pub fn cat(&self) -> Option<&Cat> {
        self.arena.get(self.cat).and_then(|o| o.kind.as_cat())
    }

    /// The cat's position.
    pub fn cat_position(&self) -> Option<Vec2> {
        self.arena
            .get(self.cat)
            .and_then(|o| self.physics.position(o.body))
    }

    /// Look up an obstacle by its debug name.
    pub fn find(&self, name: &str) -> Option<ObstacleId> {
        self.arena
            .iter()
            .find(|(_, o)| o.name == name)
            .map(|(id, _)| id)
    }

    /// Live dead bodies, in arena order.
    pub fn dead_bodies(&self) -> Vec<ObstacleId> {
        self.arena
            .iter()
            .filter(|(_, o)| !o.removed && o.kind.as_dead_body().is_some())
            .map(|(id, _)| id)
            .collect()
    }

    /// Lives remaining.
    pub fn lives(&self) -> u32 {
        self.lives
    }

    /// Lives at the start of the level.
    pub fn max_lives(&self) -> u32 {
        self.constants.max_lives
    }

    /// Current checkpoint.
    pub fn checkpoint(&self) -> Option<ObstacleId> {
        self.checkpoint
    }

    /// Where the cat reappears after dying.
    pub fn respawn_position(&self) -> Vec2 {
        self.respawn_position
    }

    /// Snapshots taken on population and checkpoint changes.
    pub fn history(&self) -> &[LevelState] {
        &self.history
    }

    /// Snapshot recorded for life slot `index`, if any.
    pub fn life_state(&self, index: usize) -> Option<&LevelState> {
        self.life_states.get(index).and_then(Option::as_ref)
    }

    /// Per-mob AI controllers.
    pub fn mob_ais(&self) -> &[MobAi] {
        &self.mobs
    }

    /// Whether the cat died and has not respawned yet.
    pub fn is_dead(&self) -> bool {
        self.died
    }

    /// The goal exit was reached.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The return exit was reached.
    pub fn is_returning(&self) -> bool {
        self.returning
    }

    /// Every life was lost.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Latest camera zoom requested by a camera tile.
    pub fn camera_zoom(&self) -> Option<f32> {
        self.camera_zoom
    }

    /// Whether the switch gesture is being held.
    pub fn spirit_mode(&self) -> bool {
        self.spirit_mode
    }

    /// Switch attempts that found no body.
    pub fn failed_switches(&self) -> u32 {
        self.failed_switches
    }

    pub(crate) fn set_spirit_mode(&mut self, on: bool) {
        self.spirit_mode = on;
    }

    // -- death and respawn --------------------------------------------------

    /// Kill the cat. Acts once per life: further calls before the respawn
    /// are ignored.
    ///
    /// Losing the last life resets the count and marks the level failed.
    /// Otherwise a dead body is queued where the cat was, the cat respawns at
    /// the start of the next tick and the life slot is saved at the end of
    /// this one.
    pub fn die(&mut self) -> bool {
        if self.died || self.failed {
            return false;
        }
        self.died = true;
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.lives = self.max_lives();
            self.failed = true;
            info!("out of lives, level failed");
            return true;
        }

        let Some(obstacle) = self.arena.get(self.cat) else {
            return true;
        };
        let facing_right = obstacle.kind.as_cat().map_or(true, Cat::is_facing_right);
        let position = self.physics.position(obstacle.body).unwrap_or(self.respawn_position);
        let linvel = self.physics.linvel(obstacle.body).unwrap_or(Vec2::ZERO);
        self.commands.push(
            LevelCommand::SpawnDeadBody {
                position,
                linvel,
                facing_right,
            },
            CommandReason::Death,
        );
        self.pending_respawn = true;
        self.pending_life_save = true;
        debug!(lives = self.lives, x = position.x, y = position.y, "cat died");
        true
    }

    /// Put the cat back at the respawn position if it died last tick.
    pub fn respawn_if_pending(&mut self) -> bool {
        if !self.pending_respawn {
            return false;
        }
        self.respawn();
        true
    }

    /// Put the cat at the respawn position with no motion.
    pub fn respawn(&mut self) {
        self.pending_respawn = false;
        self.died = false;
        let position = self.respawn_position;
        let Some(obstacle) = self.arena.get_mut(self.cat) else {
            return;
        };
        let body = obstacle.body;
        let mut ctx = BodyContext::new(&mut self.physics, body);
        ctx.set_position(position);
        ctx.set_linvel(Vec2::ZERO);
        if let Some(cat) = obstacle.kind.as_cat_mut() {
            cat.reset_motion(&mut ctx);
            cat.set_facing_right(true);
            cat.set_jump_pressed(false);
        }
        obstacle.base_velocity = Vec2::ZERO;
        debug!(x = position.x, y = position.y, "cat respawned");
    }

    // -- checkpoints and snapshots ------------------------------------------

    /// Make `checkpoint` current. Touching the current checkpoint again
    /// does nothing; a new one moves the respawn point and saves a snapshot.
    pub fn update_checkpoint(&mut self, checkpoint: ObstacleId) -> bool {
        if self.checkpoint == Some(checkpoint) {
            return false;
        }
        let Some(respawn) = self
            .arena
            .get(checkpoint)
            .and_then(|o| o.kind.as_checkpoint())
            .map(|c| c.respawn_position())
        else {
            warn!(obstacle = %checkpoint, "checkpoint reached but not a checkpoint");
            return false;
        };
        self.mark_checkpoint(Some(checkpoint));
        self.respawn_position = respawn;
        debug!(checkpoint = %checkpoint, "checkpoint changed");
        self.save_state();
        true
    }

    fn mark_checkpoint(&mut self, checkpoint: Option<ObstacleId>) {
        for (id, obstacle) in self.arena.iter_mut() {
            if let Some(c) = obstacle.kind.as_checkpoint_mut() {
                c.set_current(Some(id) == checkpoint);
            }
        }
        self.checkpoint = checkpoint;
    }

    /// Capture the level as it is now.
    pub fn capture_state(&self) -> LevelState {
        LevelState::capture(self.arena.iter(), &self.physics, self.lives, self.checkpoint)
    }

    /// Append a snapshot to the history.
    pub fn save_state(&mut self) {
        let state = self.capture_state();
        self.history.push(state);
    }

    /// Record the life slot for the current life count.
    pub fn save_life_state(&mut self) {
        self.pending_life_save = false;
        let index = self.max_lives().saturating_sub(self.lives) as usize;
        let state = self.capture_state();
        match self.life_states.get_mut(index) {
            Some(slot) => {
                *slot = Some(state);
                debug!(slot = index, lives = self.lives, "life state saved");
            }
            None => warn!(slot = index, "life slot out of range"),
        }
    }

    /// Save the life slot if a life was lost this tick.
    pub fn save_life_state_if_pending(&mut self) -> bool {
        if !self.pending_life_save || self.failed {
            return false;
        }
        self.save_life_state();
        true
    }

    /// Go back to the state recorded when the previous life began.
    /// No-op at full lives or when that slot was never written.
    pub fn undo(&mut self) -> bool {
        if self.lives >= self.max_lives() {
            return false;
        }
        let index = (self.max_lives() - 1 - self.lives) as usize;
        let Some(state) = self.life_state(index).cloned() else {
            debug!(slot = index, "no state to undo to");
            return false;
        };
        self.load_level_state(&state);
        debug!(slot = index, lives = self.lives, "undo");
        true
    }

    /// Restore `state` into this level.
    pub fn load_level_state(&mut self, state: &LevelState) {
        self.lives = state.lives;
        self.mark_checkpoint(state.checkpoint);
        self.respawn_position = state
            .checkpoint
            .and_then(|id| self.arena.get(id))
            .and_then(|o| o.kind.as_checkpoint())
            .map_or(self.start, |c| c.respawn_position());

        for (_, obstacle) in self.arena.iter_mut() {
            if let Some(spikes) = obstacle.kind.as_spikes_mut() {
                spikes.destroy_joints(&mut self.physics);
            }
        }

        for (&id, snapshot) in &state.obstacles {
            let Some(obstacle) = self.arena.get_mut(id) else {
                warn!(obstacle = %id, name = %snapshot.name, "snapshot for a missing obstacle");
                continue;
            };
            if !snapshot.apply(obstacle, &mut self.physics) {
                warn!(obstacle = %id, name = %snapshot.name, "snapshot kind does not match");
            }
        }

        for id in self.dead_body_ids() {
            self.remove_obstacle(id);
        }
        for record in &state.dead_bodies {
            self.rebuild_dead_body(record);
        }

        self.commands.clear();
        self.died = false;
        self.pending_respawn = false;
        self.pending_life_save = false;
        self.spirit_mode = false;
        for ai in &mut self.mobs {
            ai.reset();
        }
        self.respawn();
    }

    fn dead_body_ids(&self) -> Vec<ObstacleId> {
        self.arena
            .iter()
            .filter(|(_, o)| o.kind.as_dead_body().is_some())
            .map(|(id, _)| id)
            .collect()
    }

    fn rebuild_dead_body(&mut self, record: &DeadBodySnapshot) {
        let Some(id) = self.spawn_dead_body(record.body.position, record.body.linvel, record.state.facing_right)
        else {
            return;
        };
        let Some(obstacle) = self.arena.get_mut(id) else {
            return;
        };
        self.physics.apply_body_state(obstacle.body, &record.body);
        if let Some(dead) = obstacle.kind.as_dead_body_mut() {
            dead.restore(&record.state);
        }
        let body = obstacle.body;
        for &(spikes, local) in &record.welds {
            if let Some(anchor) = self.physics.local_to_world(body, local) {
                self.weld_to_spikes(id, spikes, anchor);
            }
        }
    }

    // -- body switching -----------------------------------------------------

    /// The dead body a switch would take over: the nearest switchable one
    /// sharing a spirit region with the cat.
    pub fn next_switch_target(&self) -> Option<ObstacleId> {
        let cat = self.cat()?;
        let from = self.cat_position()?;
        let regions: &BTreeSet<ObstacleId> = cat.spirit_regions();
        self.arena
            .iter()
            .filter(|(_, o)| !o.removed)
            .filter_map(|(id, o)| {
                let dead = o.kind.as_dead_body()?;
                if !dead.is_switchable() || !dead.shares_region(regions) {
                    return None;
                }
                let position = self.physics.position(o.body)?;
                Some((id, position.distance_squared(from)))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Move the cat into the next switch target, leaving its current body
    /// behind. Returns the body taken over, or `None` (counted as a failed
    /// switch) if there was none.
    pub fn switch_body(&mut self) -> Option<ObstacleId> {
        let Some(target) = self.next_switch_target() else {
            self.failed_switches += 1;
            debug!(failed = self.failed_switches, "no body to switch into");
            return None;
        };
        let (target_body, target_facing) = {
            let obstacle = self.arena.get(target)?;
            (obstacle.body, obstacle.kind.as_dead_body().map_or(true, DeadBody::is_facing_right))
        };
        let position = self.physics.position(target_body)?;
        let linvel = self.physics.linvel(target_body).unwrap_or(Vec2::ZERO);

        let cat = self.arena.get_mut(self.cat)?;
        let cat_body = cat.body;
        let left_position = self.physics.position(cat_body)?;
        let left_linvel = self.physics.linvel(cat_body).unwrap_or(Vec2::ZERO);
        let mut ctx = BodyContext::new(&mut self.physics, cat_body);
        let left_facing = match cat.kind.as_cat_mut() {
            Some(c) => {
                let facing = c.is_facing_right();
                c.reset_motion(&mut ctx);
                c.set_facing_right(target_facing);
                facing
            }
            None => true,
        };
        ctx.set_position(position);
        ctx.set_linvel(linvel);

        self.commands.push(
            LevelCommand::SpawnDeadBody {
                position: left_position,
                linvel: left_linvel,
                facing_right: left_facing,
            },
            CommandReason::Switch,
        );
        if let Some(obstacle) = self.arena.get_mut(target) {
            obstacle.removed = true;
        }
        self.physics.set_colliders_enabled(target_body, false);
        debug!(target = %target, "switched bodies");
        Some(target)
    }

    // -- lasers -------------------------------------------------------------

    /// Trace every active laser. A beam ending on the cat kills it; a beam
    /// ending on a dead body makes it unswitchable until the next pass.
    pub fn run_lasers(&mut self) -> LaserReport {
        let mut report = LaserReport::default();
        for (_, obstacle) in self.arena.iter_mut() {
            if let Some(dead) = obstacle.kind.as_dead_body_mut() {
                dead.set_touching_laser(false);
            }
        }
        self.physics.refresh_queries();

        let lasers: Vec<(ObstacleId, RigidBodyHandle, _, Vec2)> = self
            .arena
            .iter()
            .filter(|(_, o)| !o.removed)
            .filter_map(|(id, o)| {
                let laser = o.kind.as_laser()?;
                laser
                    .is_activated()
                    .then(|| (id, o.body, laser.direction(), laser.beam_offset()))
            })
            .collect();

        let mut hit_bodies = Vec::new();
        for (id, body, direction, offset) in lasers {
            let Some(origin) = self.physics.local_to_world(body, offset) else {
                continue;
            };
            let arena = &self.arena;
            let trace = beam::trace_beam(&self.physics, origin, direction, &self.bounds, Some(id), |o| {
                arena.get(o).and_then(|o| o.kind.as_mirror()).copied()
            });
            report.traced += 1;
            if let Some(tag) = trace.terminal {
                if tag.obstacle == self.cat {
                    report.cat_hit = true;
                } else {
                    hit_bodies.push(tag.obstacle);
                }
            }
            if let Some(laser) = self.arena.get_mut(id).and_then(|o| o.kind.as_laser_mut()) {
                laser.set_points(trace.points);
            }
        }

        for id in hit_bodies {
            if let Some(dead) = self.arena.get_mut(id).and_then(|o| o.kind.as_dead_body_mut()) {
                dead.set_touching_laser(true);
                report.bodies_hit += 1;
            }
        }
        if report.cat_hit {
            debug!("laser hit the cat");
            self.die();
        }
        report
    }

    // -- contacts and commands ----------------------------------------------

    /// Dispatch the contacts of one physics step and act on the outcomes.
    pub fn process_contacts(&mut self, events: &[ContactEvent]) -> usize {
        let outcomes = self
            .contacts
            .process(events, &mut self.arena, &mut self.physics, &mut self.commands);
        let count = outcomes.len();
        for outcome in outcomes {
            self.handle_outcome(outcome);
        }
        count
    }

    fn handle_outcome(&mut self, outcome: ContactOutcome) {
        match outcome {
            ContactOutcome::CatDied => {
                self.die();
            }
            ContactOutcome::CheckpointReached(id) => {
                self.update_checkpoint(id);
            }
            ContactOutcome::ExitReached(ExitKind::Goal) => {
                if !self.complete {
                    info!("level complete");
                }
                self.complete = true;
            }
            ContactOutcome::ExitReached(ExitKind::Return) => {
                if !self.returning {
                    info!("returning to the previous level");
                }
                self.returning = true;
            }
            ContactOutcome::CameraZoom(zoom) => {
                self.camera_zoom = Some(zoom);
            }
        }
    }

    /// Drain the command queue in FIFO order.
    pub fn apply_commands(&mut self) -> ApplyReport {
        let mut report = ApplyReport::default();
        for queued in self.commands.take() {
            let applied = match queued.command {
                LevelCommand::SpawnDeadBody {
                    position,
                    linvel,
                    facing_right,
                } => self.spawn_dead_body(position, linvel, facing_right).is_some(),
                LevelCommand::WeldToSpikes {
                    dead_body,
                    spikes,
                    anchor,
                } => self.weld_to_spikes(dead_body, spikes, anchor),
            };
            if applied {
                report.applied += 1;
                debug!(index = queued.index, reason = ?queued.reason, "command applied");
            } else {
                report.skipped += 1;
                debug!(index = queued.index, reason = ?queued.reason, "command skipped");
            }
        }
        report
    }

    fn spawn_dead_body(&mut self, position: Vec2, linvel: Vec2, facing_right: bool) -> Option<ObstacleId> {
        let config = self.constants.dead_body.clone();
        let (spec, colliders) = dead_body::body(position, linvel, &config);
        let physics = &mut self.physics;
        let created = self.arena.try_insert_with(|id| {
            physics
                .create_body(id, &spec, &colliders)
                .map(|body| {
                    Obstacle::new(
                        format!("dead_body{}", id.index()),
                        body,
                        ObstacleKind::DeadBody(DeadBody::new(config.clone(), facing_right)),
                    )
                })
                .ok_or(())
        });
        match created {
            Ok(id) => Some(id),
            Err(()) => {
                warn!(x = position.x, y = position.y, "could not create a dead body");
                None
            }
        }
    }

    /// Pin `dead_body` to `spikes` at the world point `anchor`. Skipped when
    /// either is gone, the spikes are inactive or point down, or the pair is
    /// already welded.
    fn weld_to_spikes(&mut self, dead_body: ObstacleId, spikes: ObstacleId, anchor: Vec2) -> bool {
        let Some(spikes_body) = self
            .arena
            .get(spikes)
            .filter(|o| !o.removed)
            .and_then(|o| {
                let s = o.kind.as_spikes()?;
                (s.is_activated() && s.welds_bodies()).then_some(o.body)
            })
        else {
            return false;
        };
        let Some(dead_handle) = self
            .arena
            .get(dead_body)
            .filter(|o| !o.removed)
            .and_then(|o| {
                let d = o.kind.as_dead_body()?;
                (!d.is_welded_to(spikes)).then_some(o.body)
            })
        else {
            return false;
        };
        let (Some(local_dead), Some(local_spikes)) = (
            self.physics.world_to_local(dead_handle, anchor),
            self.physics.world_to_local(spikes_body, anchor),
        ) else {
            return false;
        };
        let joint = self.physics.create_weld(dead_handle, spikes_body, local_dead, local_spikes);
        if let Some(dead) = self.arena.get_mut(dead_body).and_then(|o| o.kind.as_dead_body_mut()) {
            dead.add_weld(Weld {
                spikes,
                joint,
                local_anchor: local_dead,
            });
        }
        if let Some(s) = self.arena.get_mut(spikes).and_then(|o| o.kind.as_spikes_mut()) {
            s.add_joint(joint);
        }
        debug!(dead_body = %dead_body, spikes = %spikes, "dead body pinned");
        true
    }

    // -- post-step ----------------------------------------------------------

    /// Remove obstacles marked removed, with all their bodies. Returns how
    /// many were removed.
    pub fn collect_garbage(&mut self) -> usize {
        let removed: Vec<ObstacleId> = self
            .arena
            .iter()
            .filter(|(id, o)| o.removed && *id != self.cat)
            .map(|(id, _)| id)
            .collect();
        for &id in &removed {
            self.remove_obstacle(id);
        }
        removed.len()
    }

    fn remove_obstacle(&mut self, id: ObstacleId) {
        let Some(obstacle) = self.arena.remove(id) else {
            return;
        };
        for body in obstacle.extra_bodies() {
            self.physics.remove_body(body);
        }
        self.physics.remove_body(obstacle.body);
        for (_, other) in self.arena.iter_mut() {
            if let Some(s) = other.kind.as_spikes_mut() {
                s.prune_joints(&self.physics);
            }
        }
        debug!(obstacle = %id, name = %obstacle.name, "obstacle removed");
    }

    /// Run every obstacle's per-tick update.
    pub fn update_obstacles(&mut self, dt: f32) {
        for (_, obstacle) in self.arena.iter_mut() {
            if obstacle.removed {
                continue;
            }
            let body = obstacle.body;
            obstacle.update(&mut BodyContext::new(&mut self.physics, body), dt);
        }
        for (_, obstacle) in self.arena.iter_mut() {
            if let Some(dead) = obstacle.kind.as_dead_body_mut() {
                dead.prune_welds(&self.physics);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ninelives_data::level::{CatSpawn, CheckpointData, DirectedData, SpiritRegionData, WallData};

    fn floor() -> WallData {
        WallData {
            name: Some("floor".into()),
            shape: vec![0.0, 0.0, 30.0, 0.0, 30.0, 1.0, 0.0, 1.0],
            climbable: false,
        }
    }

    fn level_with(edit: impl FnOnce(&mut LevelData)) -> Level {
        let mut data = LevelData {
            bounds: Bounds {
                x: 0.0,
                y: 0.0,
                width: 30.0,
                height: 20.0,
            },
            cat: CatSpawn { x: 2.0, y: 2.0 },
            walls: vec![floor()],
            ..Default::default()
        };
        edit(&mut data);
        Level::new(&data, &GameConstants::default()).unwrap()
    }

    #[test]
    fn level_is_debug_printable() {
        let level = level_with(|_| {});
        let text = format!("{level:?}");
        assert!(text.contains("PhysicsWorld"), "{text}");
        assert!(text.contains("lives: 9"), "{text}");
    }

    #[test]
    fn population_saves_history_and_slot_zero() {
        let level = level_with(|_| {});
        assert_eq!(level.history().len(), 1);
        assert!(level.life_state(0).is_some());
        assert_eq!(level.lives(), 9);
        assert_eq!(level.respawn_position(), Vec2::new(2.0, 2.0));
    }

    #[test]
    fn die_is_guarded_until_respawn() {
        let mut level = level_with(|_| {});
        assert!(level.die());
        assert!(!level.die(), "second death in the same life is ignored");
        assert_eq!(level.lives(), 8);
        assert_eq!(level.commands().len(), 1);

        let report = level.apply_commands();
        assert_eq!(report.applied, 1);
        assert_eq!(level.dead_bodies().len(), 1);

        assert!(level.save_life_state_if_pending());
        assert!(level.life_state(1).is_some());
        assert!(level.respawn_if_pending());
        assert!(!level.is_dead());
        assert_eq!(level.cat_position(), Some(Vec2::new(2.0, 2.0)));
    }

    #[test]
    fn last_life_fails_the_level() {
        let mut level = level_with(|_| {});
        level.lives = 1;
        assert!(level.die());
        assert!(level.is_failed());
        assert_eq!(level.lives(), level.max_lives());
        assert!(level.commands().is_empty());
    }

    #[test]
    fn checkpoint_touched_twice_saves_once() {
        let mut level = level_with(|d| {
            d.checkpoints.push(CheckpointData {
                x: 10.0,
                y: 1.5,
                rotation: 0,
            })
        });
        let checkpoint = level
            .arena()
            .iter()
            .find(|(_, o)| o.kind.as_checkpoint().is_some())
            .map(|(id, _)| id)
            .unwrap();
        assert!(level.update_checkpoint(checkpoint));
        assert!(!level.update_checkpoint(checkpoint));
        assert_eq!(level.history().len(), 2);
        assert_eq!(level.checkpoint(), Some(checkpoint));
        assert_ne!(level.respawn_position(), Vec2::new(2.0, 2.0));
    }

    #[test]
    fn undo_at_full_lives_is_a_no_op() {
        let mut level = level_with(|_| {});
        assert!(!level.undo());
        assert_eq!(level.lives(), 9);
    }

    #[test]
    fn undo_restores_the_previous_life() {
        let mut level = level_with(|_| {});
        for _ in 0..2 {
            level.die();
            level.apply_commands();
            level.save_life_state_if_pending();
            level.respawn_if_pending();
        }
        assert_eq!(level.lives(), 7);
        assert_eq!(level.dead_bodies().len(), 2);

        assert!(level.undo());
        assert_eq!(level.lives(), 8);
        assert_eq!(level.dead_bodies().len(), 1);

        assert!(level.undo());
        assert_eq!(level.lives(), 9);
        assert!(level.dead_bodies().is_empty());
    }

    #[test]
    fn switch_needs_a_shared_spirit_region() {
        let mut level = level_with(|d| {
            d.spirit_regions.push(SpiritRegionData {
                x: 5.0,
                y: 3.0,
                width: 10.0,
                height: 4.0,
                color: "blue".into(),
            })
        });
        assert_eq!(level.switch_body(), None);
        assert_eq!(level.failed_switches(), 1);

        level.die();
        level.apply_commands();
        let dead = level.dead_bodies()[0];
        let region = level
            .arena()
            .iter()
            .find(|(_, o)| o.kind.as_spirit_region().is_some())
            .map(|(id, _)| id)
            .unwrap();
        for id in [dead, level.cat_id()] {
            match &mut level.arena.get_mut(id).unwrap().kind {
                ObstacleKind::Cat(cat) => cat.enter_region(region),
                ObstacleKind::DeadBody(body) => body.enter_region(region),
                _ => unreachable!(),
            }
        }
        assert_eq!(level.next_switch_target(), Some(dead));

        level.arena.get_mut(dead).unwrap().kind.as_dead_body_mut().unwrap().add_hazard();
        assert_eq!(level.next_switch_target(), None, "harmed bodies are not switchable");
    }

    #[test]
    fn spikes_facing_down_never_pin() {
        let mut level = level_with(|d| {
            d.spikes.push(DirectedData {
                x: 6.0,
                y: 1.5,
                rotation: 180,
                ..Default::default()
            })
        });
        level.die();
        level.apply_commands();
        let dead = level.dead_bodies()[0];
        let spikes = level
            .arena()
            .iter()
            .find(|(_, o)| o.kind.as_spikes().is_some())
            .map(|(id, _)| id)
            .unwrap();
        assert!(!level.weld_to_spikes(dead, spikes, Vec2::new(6.0, 1.5)));
        assert_eq!(level.physics().joint_count(), 0);
    }
}
