use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::hold::{HoldGesture, HoldRelease};

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Key {
    Escape,
    F11,
    F12,
    Other(String),
}

impl Key {
    /// Maps a DOM `KeyboardEvent.key` value.
    pub fn from_dom_key(key: &str) -> Self {
        match key {
            "Escape" | "Esc" => Key::Escape,
            "F11" => Key::F11,
            "F12" => Key::F12,
            other => Key::Other(other.to_string()),
        }
    }

    pub fn dom_key(&self) -> &str {
        match self {
            Key::Escape => "Escape",
            Key::F11 => "F11",
            Key::F12 => "F12",
            Key::Other(key) => key,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum KeyPhase {
    Down,
    Up,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyInput {
    pub key: Key,
    pub phase: KeyPhase,
    pub is_repeat: bool,
}

impl KeyInput {
    pub fn down(key: Key) -> Self {
        Self {
            key,
            phase: KeyPhase::Down,
            is_repeat: false,
        }
    }

    pub fn repeat(key: Key) -> Self {
        Self {
            key,
            phase: KeyPhase::Down,
            is_repeat: true,
        }
    }

    pub fn up(key: Key) -> Self {
        Self {
            key,
            phase: KeyPhase::Up,
            is_repeat: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GateAction {
    ConfirmQuit,
    ToggleDevtools,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GateOutcome {
    /// The event must not propagate to the page.
    pub suppress: bool,
    pub action: Option<GateAction>,
}

impl GateOutcome {
    fn pass() -> Self {
        Self::default()
    }

    fn suppressed(action: Option<GateAction>) -> Self {
        Self {
            suppress: true,
            action,
        }
    }
}

/// Turns raw key events from the primary window into gestures: hold ESC to
/// ask for quit, press F12 to toggle devtools. F11 is not handled here; it is
/// a global accelerator.
#[derive(Clone, Debug, Default)]
pub struct InputGate {
    escape_hold: HoldGesture,
}

impl InputGate {
    pub fn new(hold_threshold: Duration) -> Self {
        Self {
            escape_hold: HoldGesture::new(hold_threshold),
        }
    }

    pub fn on_key(&mut self, input: &KeyInput, now: Instant) -> GateOutcome {
        match (&input.key, input.phase) {
            (Key::Escape, KeyPhase::Down) => {
                if !input.is_repeat {
                    self.escape_hold.press(now);
                }
                GateOutcome::pass()
            }
            (Key::Escape, KeyPhase::Up) => {
                // A release that arrives after the deadline but before the
                // loop woke up still counts as a completed hold.
                let fired_late = self.escape_hold.poll(now);
                match self.escape_hold.release() {
                    HoldRelease::AfterFire => GateOutcome::suppressed(
                        fired_late.then_some(GateAction::ConfirmQuit),
                    ),
                    HoldRelease::Tap | HoldRelease::Untracked => {
                        GateOutcome::pass()
                    }
                }
            }
            (Key::F12, KeyPhase::Down) if !input.is_repeat => {
                GateOutcome::suppressed(Some(GateAction::ToggleDevtools))
            }
            _ => GateOutcome::pass(),
        }
    }

    /// Fires an expired hold timer.
    pub fn poll(&mut self, now: Instant) -> Option<GateAction> {
        self.escape_hold
            .poll(now)
            .then_some(GateAction::ConfirmQuit)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.escape_hold.deadline()
    }

    pub fn hold_fired(&self) -> bool {
        self.escape_hold.has_fired()
    }

    pub fn reset_hold(&mut self) {
        self.escape_hold.reset();
    }
}
