use std::time::{Duration, Instant};

pub const DEFAULT_HOLD_THRESHOLD: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum HoldState {
    #[default]
    Idle,
    Armed {
        deadline: Instant,
    },
    Fired,
}

/// What a key release meant for the gesture in flight.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HoldRelease {
    /// Released before the threshold; the pending timer is cancelled.
    Tap,
    /// Released after the gesture fired; the release must not reach content.
    AfterFire,
    /// No gesture was in flight.
    Untracked,
}

/// Detects a key held down past a threshold.
///
/// There is at most one pending deadline. The caller drives time: `press`,
/// `release` and `poll` all take the current instant, and the event loop is
/// expected to wake at [`HoldGesture::deadline`].
#[derive(Clone, Debug)]
pub struct HoldGesture {
    threshold: Duration,
    state: HoldState,
}

impl HoldGesture {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            state: HoldState::Idle,
        }
    }

    /// Returns true when this press armed a new timer.
    pub fn press(&mut self, now: Instant) -> bool {
        if self.state != HoldState::Idle {
            return false;
        }

        self.state = HoldState::Armed {
            deadline: now + self.threshold,
        };
        true
    }

    /// Fires the gesture if its deadline has passed. Returns true exactly
    /// once per gesture.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            HoldState::Armed { deadline } if now >= deadline => {
                self.state = HoldState::Fired;
                true
            }
            _ => false,
        }
    }

    pub fn release(&mut self) -> HoldRelease {
        let release = match self.state {
            HoldState::Idle => HoldRelease::Untracked,
            HoldState::Armed { .. } => HoldRelease::Tap,
            HoldState::Fired => HoldRelease::AfterFire,
        };
        self.state = HoldState::Idle;
        release
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            HoldState::Armed { deadline } => Some(deadline),
            _ => None,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.state == HoldState::Fired
    }

    pub fn reset(&mut self) {
        self.state = HoldState::Idle;
    }
}

impl Default for HoldGesture {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD_THRESHOLD)
    }
}
