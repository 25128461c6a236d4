//! Gamepad input state and the rules that mutate it
//!
//! - [`state`] - the [`GamepadState`] aggregate and its lock
//! - [`buttons`] - buttons, share and d-pad with idempotent press/release
//! - [`axes`] - clamped thumbsticks and triggers
//!
//! Every setter reports whether it changed anything. Unchanged calls never
//! trigger a report, which keeps high-frequency polling from flooding the host.

pub mod axes;
pub mod buttons;
pub mod state;

pub use axes::{STICK_MAX, STICK_MIN, TRIGGER_MAX, TRIGGER_MIN};
pub use buttons::{DPadDirection, DPadFlags, XboxButton, BUTTON_MASK, SHARE_BIT};
pub use state::{GamepadState, SharedGamepadState};
