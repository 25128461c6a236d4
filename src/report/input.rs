//! Device-to-host input report
//!
//! Layout (16 bytes, multi-byte fields little-endian):
//! ```text
//! Offset 0   x            u16  left stick X + 0x8000
//! Offset 2   y            u16  left stick Y + 0x8000
//! Offset 4   z            u16  right stick X + 0x8000
//! Offset 6   rz           u16  right stick Y + 0x8000
//! Offset 8   brake        u16  left trigger, 0..=1023
//! Offset 10  accelerator  u16  right trigger, 0..=1023
//! Offset 12  hat          u8   d-pad code
//! Offset 13  buttons      u16  button bitmask
//! Offset 15  share        u8   bit 0 = share
//! ```
//! The report is assembled field by field; the in-memory layout of
//! [`GamepadState`] never reaches the wire.

use crate::error::GamepadError;
use crate::gamepad::buttons::{DPadDirection, BUTTON_MASK, SHARE_BIT};
use crate::gamepad::axes::TRIGGER_MAX;
use crate::gamepad::state::GamepadState;

/// Input report size in bytes.
pub const INPUT_REPORT_SIZE: usize = 16;

pub const X_OFFSET: usize = 0;
pub const Y_OFFSET: usize = 2;
pub const Z_OFFSET: usize = 4;
pub const RZ_OFFSET: usize = 6;
pub const BRAKE_OFFSET: usize = 8;
pub const ACCELERATOR_OFFSET: usize = 10;
pub const HAT_OFFSET: usize = 12;
pub const BUTTONS_OFFSET: usize = 13;
pub const SHARE_OFFSET: usize = 15;

/// Serialises `state` into the fixed 16-byte input report
pub fn encode_input_report(state: &GamepadState) -> [u8; INPUT_REPORT_SIZE] {
    let mut buf = [0u8; INPUT_REPORT_SIZE];
    put_u16(&mut buf, X_OFFSET, state.x);
    put_u16(&mut buf, Y_OFFSET, state.y);
    put_u16(&mut buf, Z_OFFSET, state.z);
    put_u16(&mut buf, RZ_OFFSET, state.rz);
    put_u16(&mut buf, BRAKE_OFFSET, state.brake);
    put_u16(&mut buf, ACCELERATOR_OFFSET, state.accelerator);
    buf[HAT_OFFSET] = state.hat;
    put_u16(&mut buf, BUTTONS_OFFSET, state.buttons);
    buf[SHARE_OFFSET] = state.share;
    buf
}

/// Reads an input report back into a [`GamepadState`]
///
/// Used on the host side of a loopback and for inspecting captured reports.
/// Rejects anything a device could not have produced.
pub fn parse_input_report(data: &[u8]) -> Result<GamepadState, GamepadError> {
    if data.len() != INPUT_REPORT_SIZE {
        return Err(GamepadError::MalformedReport {
            expected: INPUT_REPORT_SIZE,
            actual: data.len(),
        });
    }

    let state = GamepadState {
        x: get_u16(data, X_OFFSET),
        y: get_u16(data, Y_OFFSET),
        z: get_u16(data, Z_OFFSET),
        rz: get_u16(data, RZ_OFFSET),
        brake: get_u16(data, BRAKE_OFFSET),
        accelerator: get_u16(data, ACCELERATOR_OFFSET),
        hat: DPadDirection::try_from(data[HAT_OFFSET])?.bits(),
        buttons: get_u16(data, BUTTONS_OFFSET),
        share: data[SHARE_OFFSET],
    };

    if state.brake > TRIGGER_MAX || state.accelerator > TRIGGER_MAX {
        return Err(GamepadError::InvalidArgument(format!(
            "trigger out of range: brake {}, accelerator {}",
            state.brake, state.accelerator
        )));
    }
    if state.buttons & !BUTTON_MASK != 0 {
        return Err(GamepadError::InvalidArgument(format!(
            "reserved button bits set: {:#06x}",
            state.buttons
        )));
    }
    if state.share & !SHARE_BIT != 0 {
        return Err(GamepadError::InvalidArgument(format!(
            "reserved share bits set: {:#04x}",
            state.share
        )));
    }
    Ok(state)
}

fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn get_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}
