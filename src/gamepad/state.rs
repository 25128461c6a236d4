use crate::gamepad::buttons::DPadDirection;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Logical input state of the virtual gamepad
///
/// Fields are kept in their wire representation: sticks are offset by
/// `0x8000`, triggers use the low 10 bits and the share button lives in its
/// own byte. Values can only be changed through the button and axis
/// setters, which keep every field inside its valid range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GamepadState {
    pub(crate) x: u16,
    pub(crate) y: u16,
    pub(crate) z: u16,
    pub(crate) rz: u16,
    pub(crate) brake: u16,
    pub(crate) accelerator: u16,
    pub(crate) hat: u8,
    pub(crate) buttons: u16,
    pub(crate) share: u8,
}

impl GamepadState {
    /// Left stick X in wire representation
    pub fn x(&self) -> u16 {
        self.x
    }

    /// Left stick Y in wire representation
    pub fn y(&self) -> u16 {
        self.y
    }

    /// Right stick X in wire representation
    pub fn z(&self) -> u16 {
        self.z
    }

    /// Right stick Y in wire representation
    pub fn rz(&self) -> u16 {
        self.rz
    }

    /// Left trigger, 0..=1023
    pub fn brake(&self) -> u16 {
        self.brake
    }

    /// Right trigger, 0..=1023
    pub fn accelerator(&self) -> u16 {
        self.accelerator
    }

    pub fn buttons(&self) -> u16 {
        self.buttons
    }

    pub fn share(&self) -> u8 {
        self.share
    }

    pub fn dpad(&self) -> DPadDirection {
        // hat is only ever written from a DPadDirection
        DPadDirection::try_from(self.hat).unwrap_or_default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The single lock guarding a device's [`GamepadState`]
///
/// Every read and write goes through [`update`](Self::update) or
/// [`snapshot`](Self::snapshot); the guard never escapes, so the lock can not
/// be held across transport I/O.
#[derive(Clone, Debug, Default)]
pub struct SharedGamepadState {
    inner: Arc<Mutex<GamepadState>>,
}

impl SharedGamepadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `operation` with exclusive access to the state
    pub fn update<R>(&self, operation: impl FnOnce(&mut GamepadState) -> R) -> R {
        operation(&mut self.lock())
    }

    /// Runs `operation` against the state while the lock is held
    pub fn read<R>(&self, operation: impl FnOnce(&GamepadState) -> R) -> R {
        operation(&self.lock())
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> GamepadState {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, GamepadState> {
        // plain data, a panicked writer can not leave it half-updated
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
