//! Per-tick input and the body-switch gesture.
//!
//! Input polling is outside the engine: the caller fills an [`InputFrame`]
//! each tick (the headless runner reads them from a JSON script). Held
//! buttons are plain booleans; the orchestrator feeds them to the cat as-is.
//!
//! Switching bodies is a gesture: holding the switch button enters spirit
//! mode, releasing it performs the switch. Pressing cancel while holding
//! aborts the gesture, and the following release does nothing.

use serde::{Deserialize, Serialize};

/// One tick of player input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFrame {
    /// Horizontal axis in `[-1, 1]`.
    pub horizontal: f32,
    /// Vertical axis in `[-1, 1]`.
    pub vertical: f32,
    /// Jump held.
    pub jump: bool,
    /// Dash held.
    pub dash: bool,
    /// Climb held.
    pub climb: bool,
    /// Switch held.
    pub switch: bool,
    /// Cancel held.
    pub cancel: bool,
    /// Undo requested this tick.
    pub undo: bool,
}

/// What the switch gesture did this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchSignal {
    /// Switch is held and not cancelled: spirit mode is on.
    pub holding: bool,
    /// Switch was released this tick after an uncancelled hold.
    pub did_switch: bool,
}

/// Edge detector for the switch gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchGesture {
    previous: bool,
    previous_cancel: bool,
    cancelled: bool,
}

impl SwitchGesture {
    /// A detector with nothing held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed this tick's buttons.
    pub fn update(&mut self, frame: &InputFrame) -> SwitchSignal {
        if frame.cancel && !self.previous_cancel && frame.switch {
            self.cancelled = true;
        }
        let holding = frame.switch && !self.cancelled;
        let released = !frame.switch && self.previous;
        let did_switch = released && !self.cancelled;
        if released {
            self.cancelled = false;
        }
        self.previous = frame.switch;
        self.previous_cancel = frame.cancel;
        SwitchSignal { holding, did_switch }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(switch: bool, cancel: bool) -> InputFrame {
        InputFrame {
            switch,
            cancel,
            ..Default::default()
        }
    }

    #[test]
    fn release_switches_once() {
        let mut gesture = SwitchGesture::new();
        assert_eq!(gesture.update(&frame(true, false)), SwitchSignal { holding: true, did_switch: false });
        assert!(gesture.update(&frame(true, false)).holding);
        assert!(gesture.update(&frame(false, false)).did_switch);
        assert!(!gesture.update(&frame(false, false)).did_switch);
    }

    #[test]
    fn cancel_aborts_the_release() {
        let mut gesture = SwitchGesture::new();
        gesture.update(&frame(true, false));
        let signal = gesture.update(&frame(true, true));
        assert!(!signal.holding);
        assert!(!gesture.update(&frame(false, false)).did_switch);

        gesture.update(&frame(true, false));
        assert!(gesture.update(&frame(false, false)).did_switch, "cancel only lasts one gesture");
    }

    #[test]
    fn partial_json_frames_default_the_rest() {
        let frame: InputFrame = serde_json::from_str(r#"{"horizontal": -1.0, "jump": true}"#).unwrap();
        assert_eq!(frame.horizontal, -1.0);
        assert!(frame.jump);
        assert!(!frame.switch);
    }
}
