//! The activation protocol and the activator relation graph.
//!
//! An activatable obstacle carries two booleans: its current `activated`
//! state and its authored `initial` activation. Every tick each activator
//! publishes a signal, and every obstacle it controls recomputes
//! `next = initial XOR signal`. Side effects run only when `next` differs
//! from the current state, so callbacks fire once per edge and never on
//! repeated ticks with an unchanged signal.
//!
//! # Ordering
//!
//! [`propagate`] must run after all presses for the tick have been counted:
//! contact processing, then activator update, then activatable update.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::obstacle::{ObstacleArena, ObstacleId};
use crate::physics::{BodyContext, PhysicsWorld};
use crate::LevelError;

// ---------------------------------------------------------------------------
// ActivationChange / ActivationState
// ---------------------------------------------------------------------------

/// Result of one [`Activatable::update_activated`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivationChange {
    /// Crossed from inactive to active; `activated` ran.
    JustActivated,
    /// Crossed from active to inactive; `deactivated` ran.
    JustDeactivated,
    /// Nothing happened.
    NoChange,
}

/// Activation bookkeeping shared by every activatable kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationState {
    /// Current effective activation.
    pub activated: bool,
    /// Authored activation with no activator signal.
    pub initial: bool,
}

impl ActivationState {
    /// Start at the authored activation.
    pub fn new(initial: bool) -> Self {
        Self {
            activated: initial,
            initial,
        }
    }
}

// ---------------------------------------------------------------------------
// Activatable
// ---------------------------------------------------------------------------

/// Capability of obstacles that an activator can drive.
///
/// Implementors provide the two edge callbacks and access to their
/// [`ActivationState`]; the edge detection itself lives in the provided
/// [`update_activated`](Self::update_activated).
pub trait Activatable {
    /// Bookkeeping.
    fn activation(&self) -> &ActivationState;

    /// Mutable bookkeeping.
    fn activation_mut(&mut self) -> &mut ActivationState;

    /// Side effects of an inactive to active edge.
    fn activated(&mut self, ctx: &mut BodyContext<'_>);

    /// Side effects of an active to inactive edge.
    fn deactivated(&mut self, ctx: &mut BodyContext<'_>);

    /// Bring the physics body in line with the current activation without
    /// animating. Runs after population and after a snapshot is restored.
    fn apply_activation(&mut self, ctx: &mut BodyContext<'_>);

    /// Current effective activation.
    fn is_activated(&self) -> bool {
        self.activation().activated
    }

    /// Recompute activation from an activator signal and fire the callback
    /// for the edge crossed, if any.
    fn update_activated(&mut self, signal: bool, ctx: &mut BodyContext<'_>) -> ActivationChange {
        let next = self.activation().initial ^ signal;
        let current = self.activation().activated;
        if next && !current {
            self.activation_mut().activated = true;
            self.activated(ctx);
            ActivationChange::JustActivated
        } else if !next && current {
            self.activation_mut().activated = false;
            self.deactivated(ctx);
            ActivationChange::JustDeactivated
        } else {
            ActivationChange::NoChange
        }
    }
}

// ---------------------------------------------------------------------------
// ActivationGraph
// ---------------------------------------------------------------------------

/// Activator id to the activator obstacle and the obstacles it controls.
///
/// Built fresh on every population. Activators keep their registration
/// order; propagation visits them in that order.
#[derive(Debug, Clone, Default)]
pub struct ActivationGraph {
    activators: Vec<(String, ObstacleId)>,
    index: BTreeMap<String, usize>,
    relations: BTreeMap<String, Vec<ObstacleId>>,
}

impl ActivationGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an activator under its level-unique id.
    ///
    /// # Errors
    ///
    /// [`LevelError::DuplicateActivator`] if the id is already taken.
    pub fn register_activator(&mut self, id: &str, obstacle: ObstacleId) -> Result<(), LevelError> {
        if self.index.contains_key(id) {
            return Err(LevelError::DuplicateActivator { id: id.to_owned() });
        }
        self.index.insert(id.to_owned(), self.activators.len());
        self.activators.push((id.to_owned(), obstacle));
        Ok(())
    }

    /// Make `target` controlled by the activator `activator_id`.
    ///
    /// # Errors
    ///
    /// [`LevelError::UnknownActivator`] if no activator has that id.
    pub fn link(&mut self, activator_id: &str, target: ObstacleId, object: &str) -> Result<(), LevelError> {
        if !self.index.contains_key(activator_id) {
            return Err(LevelError::UnknownActivator {
                id: activator_id.to_owned(),
                object: object.to_owned(),
            });
        }
        self.relations
            .entry(activator_id.to_owned())
            .or_default()
            .push(target);
        Ok(())
    }

    /// The activator obstacle registered under `id`.
    pub fn activator(&self, id: &str) -> Option<ObstacleId> {
        self.index.get(id).map(|&i| self.activators[i].1)
    }

    /// Activators in registration order.
    pub fn activators(&self) -> impl Iterator<Item = (&str, ObstacleId)> + '_ {
        self.activators.iter().map(|(id, obstacle)| (id.as_str(), *obstacle))
    }

    /// Obstacles controlled by `id`, in link order.
    pub fn targets(&self, id: &str) -> &[ObstacleId] {
        self.relations.get(id).map_or(&[], Vec::as_slice)
    }

    /// Number of registered activators.
    pub fn activator_count(&self) -> usize {
        self.activators.len()
    }
}

// ---------------------------------------------------------------------------
// Propagation
// ---------------------------------------------------------------------------

/// One activatable that crossed an edge during [`propagate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationEdge {
    /// The activator that drove it.
    pub activator: String,
    /// The activatable.
    pub target: ObstacleId,
    /// Which edge.
    pub change: ActivationChange,
}

/// Advance every activator one tick, then push each activator's signal to
/// the obstacles it controls. Returns the edges crossed.
///
/// Stale ids (obstacles removed since population) are skipped.
pub fn propagate(
    graph: &ActivationGraph,
    arena: &mut ObstacleArena,
    physics: &mut PhysicsWorld,
) -> Vec<ActivationEdge> {
    let mut edges = Vec::new();
    for (id, activator) in graph.activators() {
        let Some(signal) = arena
            .get_mut(activator)
            .and_then(|o| o.kind.as_activator_mut())
            .map(|a| a.update_activated())
        else {
            continue;
        };
        for &target in graph.targets(id) {
            let Some(obstacle) = arena.get_mut(target) else {
                continue;
            };
            let body = obstacle.body;
            let Some(activatable) = obstacle.kind.as_activatable_mut() else {
                continue;
            };
            let change = activatable.update_activated(signal, &mut BodyContext::new(physics, body));
            if change != ActivationChange::NoChange {
                debug!(activator = id, obstacle = %target, ?change, "activation edge");
                edges.push(ActivationEdge {
                    activator: id.to_owned(),
                    target,
                    change,
                });
            }
        }
    }
    edges
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use rapier2d::prelude::RigidBodyHandle;

    /// Records callbacks.
    #[derive(Default)]
    struct Probe {
        state: ActivationState,
        activations: u32,
        deactivations: u32,
    }

    impl Activatable for Probe {
        fn activation(&self) -> &ActivationState {
            &self.state
        }
        fn activation_mut(&mut self) -> &mut ActivationState {
            &mut self.state
        }
        fn activated(&mut self, _ctx: &mut BodyContext<'_>) {
            self.activations += 1;
        }
        fn deactivated(&mut self, _ctx: &mut BodyContext<'_>) {
            self.deactivations += 1;
        }
        fn apply_activation(&mut self, _ctx: &mut BodyContext<'_>) {}
    }

    fn run(probe: &mut Probe, signals: &[bool]) -> Vec<ActivationChange> {
        let mut physics = PhysicsWorld::new(Vec2::ZERO);
        let mut ctx = BodyContext::new(&mut physics, RigidBodyHandle::invalid());
        signals
            .iter()
            .map(|&s| probe.update_activated(s, &mut ctx))
            .collect()
    }

    #[test]
    fn callbacks_fire_once_per_edge() {
        let mut probe = Probe::default();
        let changes = run(&mut probe, &[false, true, true, false, false, true]);
        assert_eq!(
            changes,
            vec![
                ActivationChange::NoChange,
                ActivationChange::JustActivated,
                ActivationChange::NoChange,
                ActivationChange::JustDeactivated,
                ActivationChange::NoChange,
                ActivationChange::JustActivated,
            ]
        );
        assert_eq!((probe.activations, probe.deactivations), (2, 1));
    }

    #[test]
    fn initially_active_inverts_signal() {
        let mut probe = Probe {
            state: ActivationState::new(true),
            ..Default::default()
        };
        let changes = run(&mut probe, &[false, true, false]);
        assert_eq!(
            changes,
            vec![
                ActivationChange::NoChange,
                ActivationChange::JustDeactivated,
                ActivationChange::JustActivated,
            ]
        );
    }

    #[test]
    fn duplicate_activator_is_rejected() {
        let mut graph = ActivationGraph::new();
        graph.register_activator("a", ObstacleId::new(0, 0)).unwrap();
        let err = graph.register_activator("a", ObstacleId::new(1, 0)).unwrap_err();
        assert!(matches!(err, LevelError::DuplicateActivator { id } if id == "a"));
    }

    #[test]
    fn link_to_unknown_activator_is_rejected() {
        let mut graph = ActivationGraph::new();
        let err = graph.link("nope", ObstacleId::new(0, 0), "door").unwrap_err();
        assert!(matches!(err, LevelError::UnknownActivator { .. }));
    }

    #[test]
    fn targets_keep_link_order() {
        let mut graph = ActivationGraph::new();
        graph.register_activator("b", ObstacleId::new(9, 0)).unwrap();
        graph.link("b", ObstacleId::new(2, 0), "x").unwrap();
        graph.link("b", ObstacleId::new(1, 0), "y").unwrap();
        assert_eq!(
            graph.targets("b"),
            &[ObstacleId::new(2, 0), ObstacleId::new(1, 0)]
        );
        assert!(graph.targets("missing").is_empty());
        assert_eq!(graph.activator("b"), Some(ObstacleId::new(9, 0)));
    }
}
