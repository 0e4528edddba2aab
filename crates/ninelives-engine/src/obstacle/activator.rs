//! Buttons, switches and timed buttons.
//!
//! An activator counts the fixtures pressing its sensor. Contact begin/end
//! call [`Activator::add_press`] / [`Activator::remove_press`]; once per tick
//! [`Activator::update_activated`] turns the count into the published signal
//! according to the subtype policy.

use glam::Vec2;
use ninelives_data::constants::ActivatorConfig;
use ninelives_data::Direction;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::physics::{BodyKind, BodySpec, ColliderSpec, FixtureRole, ShapeSpec};

/// Subtype policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivatorKind {
    /// Active while pressed.
    Button,
    /// Toggles on every press.
    Switch,
    /// Active for a fixed number of ticks after the last press.
    Timed,
}

impl ActivatorKind {
    /// Parse the level-file type string.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "button" => Some(ActivatorKind::Button),
            "switch" => Some(ActivatorKind::Switch),
            "timed" | "timed_button" => Some(ActivatorKind::Timed),
            _ => None,
        }
    }
}

/// Snapshot of an activator's policy state. The press count is not part of
/// it: contacts re-derive it after a restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatorState {
    /// Published signal.
    pub active: bool,
    /// Press state seen by the previous update (switches).
    pub prev_pressed: bool,
    /// Remaining countdown (timed buttons).
    pub ticks_remaining: u32,
}

/// A pressable sensor publishing a boolean signal.
#[derive(Debug, Clone)]
pub struct Activator {
    id: String,
    kind: ActivatorKind,
    presses: u32,
    active: bool,
    prev_pressed: bool,
    ticks_remaining: u32,
    duration: u32,
}

impl Activator {
    /// A released activator. `duration` only matters for timed buttons.
    pub fn new(id: impl Into<String>, kind: ActivatorKind, duration: u32) -> Self {
        Self {
            id: id.into(),
            kind,
            presses: 0,
            active: false,
            prev_pressed: false,
            ticks_remaining: 0,
            duration,
        }
    }

    /// Level-unique id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Subtype.
    pub fn kind(&self) -> ActivatorKind {
        self.kind
    }

    /// Number of fixtures currently pressing.
    pub fn presses(&self) -> u32 {
        self.presses
    }

    /// Whether anything is pressing.
    pub fn is_pressed(&self) -> bool {
        self.presses > 0
    }

    /// The signal published by the last update.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Remaining countdown of a timed button.
    pub fn ticks_remaining(&self) -> u32 {
        self.ticks_remaining
    }

    /// A fixture started pressing.
    pub fn add_press(&mut self) {
        self.presses += 1;
    }

    /// A fixture stopped pressing. Unbalanced releases are logged and
    /// ignored.
    pub fn remove_press(&mut self) {
        match self.presses.checked_sub(1) {
            Some(presses) => self.presses = presses,
            None => warn!(activator = %self.id, "press released more often than pressed"),
        }
    }

    /// Advance one tick and return the published signal.
    pub fn update_activated(&mut self) -> bool {
        let pressed = self.is_pressed();
        match self.kind {
            ActivatorKind::Button => self.active = pressed,
            ActivatorKind::Switch => {
                if pressed && !self.prev_pressed {
                    self.active = !self.active;
                }
            }
            ActivatorKind::Timed => {
                self.ticks_remaining = if pressed {
                    self.duration
                } else {
                    self.ticks_remaining.saturating_sub(1)
                };
                self.active = self.ticks_remaining > 0;
            }
        }
        self.prev_pressed = pressed;
        self.active
    }

    /// Capture policy state.
    pub fn state(&self) -> ActivatorState {
        ActivatorState {
            active: self.active,
            prev_pressed: self.prev_pressed,
            ticks_remaining: self.ticks_remaining,
        }
    }

    /// Restore policy state.
    pub fn restore(&mut self, state: &ActivatorState) {
        self.active = state.active;
        self.prev_pressed = state.prev_pressed;
        self.ticks_remaining = state.ticks_remaining;
    }
}

/// Fixed base with the pressing sensor on top, rotated to `direction`.
pub(crate) fn body(position: Vec2, direction: Direction, config: &ActivatorConfig) -> (BodySpec, Vec<ColliderSpec>) {
    let spec = BodySpec::new(BodyKind::Fixed, position).angle(direction.angle_radians());
    let colliders = vec![
        ColliderSpec::solid(FixtureRole::Body, ShapeSpec::rect(config.width, config.height)),
        ColliderSpec::sensor(
            FixtureRole::ActivatorSensor,
            ShapeSpec::rect(config.width, config.sensor_height),
        )
        .at(Vec2::new(0.0, (config.height + config.sensor_height) * 0.5)),
    ];
    (spec, colliders)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(activator: &mut Activator, presses: &[bool]) -> Vec<bool> {
        presses
            .iter()
            .map(|&p| {
                if p && !activator.is_pressed() {
                    activator.add_press();
                } else if !p && activator.is_pressed() {
                    activator.remove_press();
                }
                activator.update_activated()
            })
            .collect()
    }

    #[test]
    fn parse_type_strings() {
        assert_eq!(ActivatorKind::parse("button"), Some(ActivatorKind::Button));
        assert_eq!(ActivatorKind::parse("switch"), Some(ActivatorKind::Switch));
        assert_eq!(ActivatorKind::parse("timed"), Some(ActivatorKind::Timed));
        assert_eq!(ActivatorKind::parse("lever"), None);
    }

    #[test]
    fn button_follows_press() {
        let mut a = Activator::new("b", ActivatorKind::Button, 0);
        assert_eq!(signals(&mut a, &[true, true, false, true]), vec![true, true, false, true]);
    }

    #[test]
    fn switch_toggles_on_press_edges_only() {
        let mut a = Activator::new("s", ActivatorKind::Switch, 0);
        assert_eq!(
            signals(&mut a, &[true, true, false, false, true, false]),
            vec![true, true, true, true, false, false]
        );
    }

    #[test]
    fn timed_button_counts_down_one_per_tick() {
        let mut a = Activator::new("t", ActivatorKind::Timed, 3);
        let out = signals(&mut a, &[true, false, false, false, false]);
        assert_eq!(out, vec![true, true, true, false, false]);
        assert_eq!(a.ticks_remaining(), 0);
    }

    #[test]
    fn timed_button_resets_on_repress() {
        let mut a = Activator::new("t", ActivatorKind::Timed, 3);
        signals(&mut a, &[true, false, false]);
        assert_eq!(a.ticks_remaining(), 1);
        signals(&mut a, &[true]);
        assert_eq!(a.ticks_remaining(), 3);
    }

    #[test]
    fn multiple_pressers_keep_button_down() {
        let mut a = Activator::new("b", ActivatorKind::Button, 0);
        a.add_press();
        a.add_press();
        a.remove_press();
        assert!(a.update_activated());
        a.remove_press();
        assert!(!a.update_activated());
    }

    #[test]
    fn unbalanced_release_saturates() {
        let mut a = Activator::new("b", ActivatorKind::Button, 0);
        a.remove_press();
        assert_eq!(a.presses(), 0);
    }

    #[test]
    fn state_roundtrip() {
        let mut a = Activator::new("s", ActivatorKind::Switch, 0);
        a.add_press();
        a.update_activated();
        let saved = a.state();
        a.remove_press();
        a.add_press();
        a.update_activated();
        a.update_activated();
        a.restore(&saved);
        assert_eq!(a.state(), saved);
        assert!(a.is_active());
    }
}
