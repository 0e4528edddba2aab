//! Fixed-timestep game loop.
//!
//! [`Game::tick`] advances the level by one step of `fixed_dt` seconds:
//!
//! 1. pre-update: repopulate a failed level, respawn a cat that died last
//!    tick,
//! 2. the [`ActionController`] pass (input, switching, lasers, activation,
//!    mobs),
//! 3. the physics step,
//! 4. contact dispatch,
//! 5. the deferred command queue, drained once,
//! 6. garbage collection of removed obstacles,
//! 7. per-obstacle `update(dt)`,
//! 8. base-velocity propagation for things standing on things,
//! 9. the pending life-slot save,
//! 10. undo, if this tick's input asks for it.
//!
//! Simulation time is `tick_count * fixed_dt`, never an accumulated sum.
//!
//! # Example
//!
//! ```no_run
//! use ninelives_engine::game::{Game, TickConfig};
//! use ninelives_engine::input::InputFrame;
//! use ninelives_data::{GameConstants, LevelData};
//!
//! let data = LevelData::from_path("levels/level1.json").unwrap();
//! let mut game = Game::new(data, GameConstants::default(), TickConfig::default()).unwrap();
//! for _ in 0..10 {
//!     game.tick(&InputFrame::default());
//! }
//! assert_eq!(game.tick_count(), 10);
//! ```

use std::time::{Duration, Instant};

use ninelives_data::{GameConstants, LevelData};
use tracing::{info, warn};

use crate::action::{ActionController, ActionReport};
use crate::command::ApplyReport;
use crate::input::{InputFrame, SwitchGesture};
use crate::level::Level;
use crate::support::{self, SupportReport};
use crate::LevelError;

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Configuration for the fixed-timestep loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
    /// Headless mode: no presentation layer, tick as fast as possible.
    pub headless: bool,
}

impl Default for TickConfig {
    /// 60 Hz, headless off.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            headless: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Wall-clock timing of the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Time per phase, in execution order.
    pub phase_times: Vec<(String, Duration)>,
    /// Total time for the tick.
    pub total_time: Duration,
    /// Time spent draining the command queue.
    pub command_apply_time: Duration,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// The level was rebuilt because it had failed.
    pub repopulated: bool,
    /// The cat was put back at the respawn point.
    pub respawned: bool,
    /// Orchestrator pass.
    pub action: ActionReport,
    /// Contact events dispatched by the physics step.
    pub contact_events: usize,
    /// Outcomes the level acted on.
    pub contact_outcomes: usize,
    /// Command queue drain.
    pub commands: ApplyReport,
    /// Obstacles garbage-collected.
    pub collected: usize,
    /// Base-velocity propagation.
    pub support: SupportReport,
    /// A life slot was written.
    pub life_saved: bool,
    /// An undo was performed.
    pub undone: bool,
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// A level plus everything needed to drive it one tick at a time.
pub struct Game {
    level: Level,
    data: LevelData,
    constants: GameConstants,
    action: ActionController,
    gesture: SwitchGesture,
    tick_counter: u64,
    fixed_dt: f64,
    config: TickConfig,
    last_diagnostics: TickDiagnostics,
}

impl Game {
    /// Populate `data` and set up the loop.
    ///
    /// A non-positive or non-finite `fixed_dt` falls back to the default
    /// 1/60 s.
    pub fn new(data: LevelData, constants: GameConstants, config: TickConfig) -> Result<Self, LevelError> {
        let mut config = config;
        if !(config.fixed_dt > 0.0 && config.fixed_dt.is_finite()) {
            warn!(fixed_dt = config.fixed_dt, "invalid fixed_dt, using 1/60 s");
            config.fixed_dt = TickConfig::default().fixed_dt;
        }
        let level = Level::new(&data, &constants)?;
        Ok(Self {
            level,
            data,
            constants,
            action: ActionController::new(),
            gesture: SwitchGesture::new(),
            tick_counter: 0,
            fixed_dt: config.fixed_dt,
            config,
            last_diagnostics: TickDiagnostics::default(),
        })
    }

    /// Advance one tick with `input`.
    pub fn tick(&mut self, input: &InputFrame) -> TickReport {
        let tick_start = Instant::now();
        let dt = self.fixed_dt as f32;
        let mut phase_times = Vec::with_capacity(6);
        let mut report = TickReport::default();

        // Pre-update.
        let start = Instant::now();
        if self.level.is_failed() {
            report.repopulated = self.repopulate();
        }
        report.respawned = self.level.respawn_if_pending();
        phase_times.push(("pre_update".to_owned(), start.elapsed()));

        // Orchestrator.
        let start = Instant::now();
        let signal = self.gesture.update(input);
        report.action = self.action.update(&mut self.level, input, signal);
        phase_times.push(("action".to_owned(), start.elapsed()));

        // Physics and contacts.
        let start = Instant::now();
        let events = self.level.physics.step(dt);
        phase_times.push(("physics".to_owned(), start.elapsed()));

        let start = Instant::now();
        report.contact_events = events.len();
        report.contact_outcomes = self.level.process_contacts(&events);
        phase_times.push(("contacts".to_owned(), start.elapsed()));

        let apply_start = Instant::now();
        report.commands = self.level.apply_commands();
        let command_apply_time = apply_start.elapsed();

        // Post-update.
        let start = Instant::now();
        report.collected = self.level.collect_garbage();
        self.level.update_obstacles(dt);
        report.support = support::propagate_base_velocity(&mut self.level.arena, &self.level.physics);
        report.life_saved = self.level.save_life_state_if_pending();
        if input.undo {
            report.undone = self.level.undo();
        }
        phase_times.push(("post_update".to_owned(), start.elapsed()));

        self.tick_counter += 1;
        self.last_diagnostics = TickDiagnostics {
            phase_times,
            total_time: tick_start.elapsed(),
            command_apply_time,
        };
        report
    }

    /// Run `count` ticks with the same input.
    pub fn run_ticks(&mut self, count: u64, input: &InputFrame) {
        for _ in 0..count {
            self.tick(input);
        }
    }

    fn repopulate(&mut self) -> bool {
        match Level::new(&self.data, &self.constants) {
            Ok(level) => {
                info!("level repopulated");
                self.level = level;
                self.gesture = SwitchGesture::new();
                true
            }
            Err(error) => {
                warn!(error = %error, "repopulation failed, keeping the failed level");
                false
            }
        }
    }

    // -- accessors ----------------------------------------------------------

    /// The number of ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// The current simulation time in seconds.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.fixed_dt
    }

    /// The fixed time step in seconds per tick.
    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    /// The live level.
    pub fn level(&self) -> &Level {
        &self.level
    }

    /// Mutable access to the live level, for setup and tests.
    pub fn level_mut(&mut self) -> &mut Level {
        &mut self.level
    }

    /// The authoring data the level was built from.
    pub fn data(&self) -> &LevelData {
        &self.data
    }

    /// Diagnostics from the last tick.
    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }

    /// Whether headless mode is enabled.
    pub fn is_headless(&self) -> bool {
        self.config.headless
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ninelives_data::level::{CatSpawn, WallData};
    use ninelives_data::Bounds;

    fn data() -> LevelData {
        LevelData {
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
        }
    }

    fn game() -> Game {
        Game::new(data(), GameConstants::default(), TickConfig::default()).unwrap()
    }

    #[test]
    fn counts_ticks_and_time() {
        let mut game = game();
        game.run_ticks(30, &InputFrame::default());
        assert_eq!(game.tick_count(), 30);
        assert!((game.sim_time() - 0.5).abs() < 1e-12);
        let names: Vec<&str> = game
            .last_diagnostics()
            .phase_times
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(names, ["pre_update", "action", "physics", "contacts", "post_update"]);
    }

    #[test]
    fn invalid_timestep_falls_back() {
        let config = TickConfig {
            fixed_dt: 0.0,
            headless: true,
        };
        let game = Game::new(data(), GameConstants::default(), config).unwrap();
        assert!((game.fixed_dt() - 1.0 / 60.0).abs() < 1e-12);
        assert!(game.is_headless());
    }

    #[test]
    fn cat_falls_onto_the_floor() {
        let mut game = game();
        game.run_ticks(90, &InputFrame::default());
        let y = game.level().cat_position().unwrap().y;
        assert!(y < 2.0 && y > 1.0, "cat rests on the floor, y = {y}");
    }

    #[test]
    fn death_between_ticks_is_handled_by_the_next_one() {
        let mut game = game();
        game.level_mut().die();
        let report = game.tick(&InputFrame::default());
        assert!(report.respawned);
        assert!(!game.level().is_dead());
        assert_eq!(report.commands.applied, 1);
        assert!(report.life_saved);
        assert_eq!(game.level().dead_bodies().len(), 1);
        assert!(game.level().life_state(1).is_some());

        let report = game.tick(&InputFrame::default());
        assert!(!report.respawned);
        assert!(!report.life_saved);
    }

    #[test]
    fn undo_input_rewinds_a_life() {
        let mut game = game();
        game.level_mut().die();
        game.run_ticks(2, &InputFrame::default());
        assert_eq!(game.level().lives(), 8);

        let report = game.tick(&InputFrame {
            undo: true,
            ..Default::default()
        });
        assert!(report.undone);
        assert_eq!(game.level().lives(), 9);
        assert!(game.level().dead_bodies().is_empty());
    }

    #[test]
    fn failed_level_is_repopulated() {
        let mut game = game();
        game.level_mut().lives = 1;
        game.level_mut().die();
        assert!(game.level().is_failed());

        let report = game.tick(&InputFrame::default());
        assert!(report.repopulated);
        assert!(!game.level().is_failed());
        assert_eq!(game.level().lives(), game.level().max_lives());
        assert!(game.level().dead_bodies().is_empty());
    }
}
