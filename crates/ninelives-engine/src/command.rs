//! Deferred level mutations.
//!
//! Contact callbacks run while the physics step is still being digested, so
//! they never create bodies or joints directly. They push a
//! [`LevelCommand`] instead; the level drains the queue exactly once per tick,
//! right after contact dispatch and before garbage collection.
//!
//! Commands are applied in FIFO order. Commands referring to obstacles that
//! have been removed in the meantime are skipped and counted in the
//! [`ApplyReport`].

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::obstacle::ObstacleId;

// ---------------------------------------------------------------------------
// CommandReason
// ---------------------------------------------------------------------------

/// Why a command was issued. Logged with the command when it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandReason {
    /// The cat died and leaves its body behind.
    Death,
    /// The cat switched into a dead body and leaves its previous body behind.
    Switch,
    /// A dead body's center touched the tip of some spikes.
    SpikesContact,
}

// ---------------------------------------------------------------------------
// LevelCommand
// ---------------------------------------------------------------------------

/// The payload of a command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LevelCommand {
    /// Create a dead body.
    SpawnDeadBody {
        /// World position.
        position: Vec2,
        /// Initial velocity.
        linvel: Vec2,
        /// Facing.
        facing_right: bool,
    },
    /// Pin a dead body to spikes at a world point.
    WeldToSpikes {
        /// The dead body.
        dead_body: ObstacleId,
        /// The spikes.
        spikes: ObstacleId,
        /// Weld point in world space.
        anchor: Vec2,
    },
}

/// A command with its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueuedCommand {
    /// What to do.
    pub command: LevelCommand,
    /// Why.
    pub reason: CommandReason,
    /// Sequential index within the tick.
    pub index: u32,
}

// ---------------------------------------------------------------------------
// ApplyReport
// ---------------------------------------------------------------------------

/// Summary of one queue drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Commands that changed the level.
    pub applied: usize,
    /// Commands skipped because their targets were gone or already handled.
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// FIFO queue of deferred level mutations.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    commands: Vec<QueuedCommand>,
    next_index: u32,
}

impl CommandQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command.
    pub fn push(&mut self, command: LevelCommand, reason: CommandReason) {
        self.commands.push(QueuedCommand {
            command,
            reason,
            index: self.next_index,
        });
        self.next_index += 1;
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Queued commands in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedCommand> {
        self.commands.iter()
    }

    /// Take every queued command, in insertion order, and reset the index.
    pub fn take(&mut self) -> Vec<QueuedCommand> {
        self.next_index = 0;
        std::mem::take(&mut self.commands)
    }

    /// Drop every queued command.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.next_index = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
