//! Thumbsticks and triggers
//!
//! Sticks take signed values, clamped to the i16 range and stored with a
//! `0x8000` offset. Triggers are clamped to 10 bits and stored as-is.

use crate::gamepad::state::GamepadState;
use tracing::debug;

pub const STICK_MIN: i16 = i16::MIN;
pub const STICK_MAX: i16 = i16::MAX;
pub const TRIGGER_MIN: u16 = 0;
pub const TRIGGER_MAX: u16 = 1023;

const STICK_OFFSET: i32 = 0x8000;

pub fn clamp_stick(value: i32) -> i16 {
    value.clamp(STICK_MIN as i32, STICK_MAX as i32) as i16
}

pub fn clamp_trigger(value: u16) -> u16 {
    value.clamp(TRIGGER_MIN, TRIGGER_MAX)
}

/// Signed stick value to its wire representation
pub fn encode_stick(value: i16) -> u16 {
    (value as i32 + STICK_OFFSET) as u16
}

/// Wire representation back to the signed stick value
pub fn decode_stick(raw: u16) -> i16 {
    (raw as i32 - STICK_OFFSET) as i16
}

impl GamepadState {
    /// Returns whether either axis changed
    pub fn set_left_thumbstick(&mut self, x: i32, y: i32) -> bool {
        let (x, y) = (clamp_stick(x), clamp_stick(y));
        if (x, y) == self.left_thumbstick() {
            return false;
        }
        debug!("Left thumbstick -> ({}, {})", x, y);
        self.x = encode_stick(x);
        self.y = encode_stick(y);
        true
    }

    /// Returns whether either axis changed
    pub fn set_right_thumbstick(&mut self, z: i32, rz: i32) -> bool {
        let (z, rz) = (clamp_stick(z), clamp_stick(rz));
        if (z, rz) == self.right_thumbstick() {
            return false;
        }
        debug!("Right thumbstick -> ({}, {})", z, rz);
        self.z = encode_stick(z);
        self.rz = encode_stick(rz);
        true
    }

    pub fn set_left_trigger(&mut self, value: u16) -> bool {
        let value = clamp_trigger(value);
        if value == self.brake {
            return false;
        }
        debug!("Left trigger -> {}", value);
        self.brake = value;
        true
    }

    pub fn set_right_trigger(&mut self, value: u16) -> bool {
        let value = clamp_trigger(value);
        if value == self.accelerator {
            return false;
        }
        debug!("Right trigger -> {}", value);
        self.accelerator = value;
        true
    }

    pub fn left_thumbstick(&self) -> (i16, i16) {
        (decode_stick(self.x), decode_stick(self.y))
    }

    pub fn right_thumbstick(&self) -> (i16, i16) {
        (decode_stick(self.z), decode_stick(self.rz))
    }
}
