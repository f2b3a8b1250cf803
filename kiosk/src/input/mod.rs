pub mod gate;
pub mod hold;

pub use gate::{GateAction, GateOutcome, InputGate, Key, KeyInput, KeyPhase};
pub use hold::{HoldGesture, HoldRelease};
