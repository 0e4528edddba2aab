//! Nine Lives Engine -- gameplay core for a 2D physics platformer.
//!
//! The player is a cat that leaves a switchable dead body behind every time it
//! dies. Levels are wired from activators (buttons, switches, timed buttons)
//! to activatable obstacles (doors, spikes, flamethrowers, lasers, platforms,
//! boxes), and rapier2d provides the rigid-body simulation underneath.
//!
//! # Architecture
//!
//! - [`obstacle`]: generational arena of obstacles, one closed enum of kinds.
//! - [`activation`]: the [`Activatable`](activation::Activatable) protocol and
//!   the activator-to-activatable relation graph.
//! - [`physics`]: rapier2d adapter. Colliders carry a
//!   [`FixtureTag`](physics::FixtureTag) so contacts can be demultiplexed.
//! - [`contact`]: begin/end/filter contact state machine.
//! - [`beam`]: laser ray casting with mirror reflection.
//! - [`snapshot`]: serializable [`LevelState`](snapshot::LevelState) used by
//!   undo.
//! - [`level`]: level population, deferred command queue, death, respawn,
//!   checkpoints, snapshots and undo.
//! - [`action`] and [`ai`]: per-tick orchestration and mob behaviour.
//! - [`game`]: the fixed-timestep loop tying it all together.
//!
//! # Quick Start
//!
//! ```no_run
//! use ninelives_engine::prelude::*;
//!
//! let data = LevelData::from_path("levels/level1.json").unwrap();
//! let mut game = Game::new(data, GameConstants::default(), TickConfig::default()).unwrap();
//!
//! let input = InputFrame { horizontal: 1.0, ..Default::default() };
//! for _ in 0..60 {
//!     game.tick(&input);
//! }
//! println!("lives left: {}", game.level().lives());
//! ```

#![deny(unsafe_code)]

pub mod action;
pub mod activation;
pub mod ai;
pub mod beam;
pub mod command;
pub mod contact;
pub mod game;
pub mod input;
pub mod level;
pub mod obstacle;
pub mod physics;
pub mod snapshot;
pub mod support;

mod populate;

use ninelives_data::DataError;

use crate::obstacle::ObstacleId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Fatal errors raised while building a level from authoring data.
///
/// Any of these stops population: there is no way to run a level whose
/// object graph is only partially defined.
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    /// Malformed level or constants data.
    #[error(transparent)]
    Data(#[from] DataError),

    /// An activator whose `type` is not button, switch or timed.
    #[error("unrecognized activator type '{kind}' on activator '{id}'")]
    UnknownActivatorType {
        /// Activator id.
        id: String,
        /// The unrecognized type string.
        kind: String,
    },

    /// An exit whose `type` is not goal or return.
    #[error("unrecognized exit type '{kind}'")]
    UnknownExitType {
        /// The unrecognized type string.
        kind: String,
    },

    /// Two activators share one id.
    #[error("activator id '{id}' is defined more than once")]
    DuplicateActivator {
        /// The duplicated id.
        id: String,
    },

    /// An activatable names an activator that does not exist.
    #[error("'{object}' references unknown activator '{id}'")]
    UnknownActivator {
        /// The missing activator id.
        id: String,
        /// Name of the referencing object.
        object: String,
    },

    /// A shape rapier cannot build (e.g. collinear polygon points).
    #[error("cannot build a collider shape for '{object}'")]
    InvalidShape {
        /// Name of the object.
        object: String,
    },
}

/// Recoverable per-contact errors. These are logged and the contact is
/// skipped; the tick always continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContactError {
    /// Collider user data that does not decode to a fixture tag.
    #[error("malformed fixture user data {raw:#x}")]
    MalformedUserData {
        /// The raw user data.
        raw: u128,
    },

    /// A fixture whose obstacle is no longer in the level.
    #[error("fixture refers to obstacle {obstacle} which is not in the level")]
    StaleObstacle {
        /// The stale id.
        obstacle: ObstacleId,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports.
pub mod prelude {
    pub use crate::action::ActionController;
    pub use crate::activation::{Activatable, ActivationChange, ActivationGraph, ActivationState};
    pub use crate::contact::ContactController;
    pub use crate::game::{Game, TickConfig};
    pub use crate::input::InputFrame;
    pub use crate::level::Level;
    pub use crate::obstacle::{Obstacle, ObstacleId, ObstacleKind};
    pub use crate::physics::{FixtureRole, FixtureTag, PhysicsWorld, RayCaster};
    pub use crate::snapshot::LevelState;
    pub use crate::{ContactError, LevelError};
    pub use ninelives_data::prelude::*;
}
