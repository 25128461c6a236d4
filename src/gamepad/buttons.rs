//! Buttons, share button and d-pad
//!
//! Press and release are idempotent: each setter returns `true` only when the
//! stored state actually changed, which is what drives auto-reporting.

use crate::error::GamepadError;
use crate::gamepad::state::GamepadState;
use std::fmt;
use std::ops::BitOr;
use tracing::debug;

/// Bit of the share button inside the dedicated `share` byte
pub const SHARE_BIT: u8 = 0x01;

/// Every bit of `buttons` that belongs to a defined button
pub const BUTTON_MASK: u16 = 0x7CDB;

/// Gamepad buttons with their bit in the `buttons` field
///
/// `Share` is not part of `buttons`: it is routed to bit 0 of the separate
/// `share` byte, but it is pressed and released through the same API.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum XboxButton {
    A = 0x0001,
    B = 0x0002,
    X = 0x0008,
    Y = 0x0010,
    LeftBumper = 0x0040,
    RightBumper = 0x0080,
    Select = 0x0400,
    Start = 0x0800,
    Home = 0x1000,
    LeftStick = 0x2000,
    RightStick = 0x4000,
    Share = 0x8000,
}

impl XboxButton {
    pub const ALL: [XboxButton; 12] = [
        XboxButton::A,
        XboxButton::B,
        XboxButton::X,
        XboxButton::Y,
        XboxButton::LeftBumper,
        XboxButton::RightBumper,
        XboxButton::Select,
        XboxButton::Start,
        XboxButton::Home,
        XboxButton::LeftStick,
        XboxButton::RightStick,
        XboxButton::Share,
    ];

    pub const fn mask(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for XboxButton {
    type Error = GamepadError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        XboxButton::ALL
            .into_iter()
            .find(|button| button.mask() == value)
            .ok_or_else(|| GamepadError::InvalidArgument(format!("unknown button {:#06x}", value)))
    }
}

/// A stored d-pad direction
///
/// Bit 0 is north, bit 1 east, bit 2 south and bit 3 west; the nine variants
/// are exactly the combinations without an opposing pair.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DPadDirection {
    #[default]
    None = 0x00,
    North = 0x01,
    East = 0x02,
    NorthEast = 0x03,
    South = 0x04,
    SouthEast = 0x06,
    West = 0x08,
    NorthWest = 0x09,
    SouthWest = 0x0C,
}

impl DPadDirection {
    pub const ALL: [DPadDirection; 9] = [
        DPadDirection::None,
        DPadDirection::North,
        DPadDirection::East,
        DPadDirection::NorthEast,
        DPadDirection::South,
        DPadDirection::SouthEast,
        DPadDirection::West,
        DPadDirection::NorthWest,
        DPadDirection::SouthWest,
    ];

    pub const fn bits(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for DPadDirection {
    type Error = GamepadError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DPadDirection::ALL
            .into_iter()
            .find(|direction| direction.bits() == value)
            .ok_or_else(|| {
                GamepadError::InvalidArgument(format!("invalid d-pad direction {:#04x}", value))
            })
    }
}

impl fmt::Display for DPadDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DPadDirection::None => "NONE",
            DPadDirection::North => "NORTH",
            DPadDirection::NorthEast => "NORTHEAST",
            DPadDirection::East => "EAST",
            DPadDirection::SouthEast => "SOUTHEAST",
            DPadDirection::South => "SOUTH",
            DPadDirection::SouthWest => "SOUTHWEST",
            DPadDirection::West => "WEST",
            DPadDirection::NorthWest => "NORTHWEST",
        };
        f.write_str(name)
    }
}

/// Raw d-pad bits as requested by a caller, possibly with opposing pairs
///
/// ```rust
/// use opengamepad::gamepad::{DPadDirection, DPadFlags};
///
/// let flags = DPadDirection::North | DPadDirection::South | DPadDirection::East;
/// assert_eq!(flags.normalize().unwrap(), DPadDirection::East);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DPadFlags(u8);

impl DPadFlags {
    const NORTH_SOUTH: u8 = DPadDirection::North.bits() | DPadDirection::South.bits();
    const EAST_WEST: u8 = DPadDirection::East.bits() | DPadDirection::West.bits();

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Drops opposing pairs and maps the rest to a [`DPadDirection`]
    pub fn normalize(self) -> Result<DPadDirection, GamepadError> {
        if self.0 & 0xF0 != 0 {
            return Err(GamepadError::InvalidArgument(format!(
                "d-pad flags {:#04x} use bits outside the hat nibble",
                self.0
            )));
        }

        let mut bits = self.0;
        if bits & Self::NORTH_SOUTH == Self::NORTH_SOUTH {
            debug!("Filtering opposite d-pad presses - up down");
            bits ^= Self::NORTH_SOUTH;
        }
        if bits & Self::EAST_WEST == Self::EAST_WEST {
            debug!("Filtering opposite d-pad presses - left right");
            bits ^= Self::EAST_WEST;
        }
        DPadDirection::try_from(bits)
    }
}

impl From<DPadDirection> for DPadFlags {
    fn from(direction: DPadDirection) -> Self {
        Self(direction.bits())
    }
}

impl BitOr for DPadDirection {
    type Output = DPadFlags;

    fn bitor(self, rhs: Self) -> DPadFlags {
        DPadFlags(self.bits() | rhs.bits())
    }
}

impl BitOr<DPadDirection> for DPadFlags {
    type Output = DPadFlags;

    fn bitor(self, rhs: DPadDirection) -> DPadFlags {
        DPadFlags(self.0 | rhs.bits())
    }
}

impl BitOr for DPadFlags {
    type Output = DPadFlags;

    fn bitor(self, rhs: Self) -> DPadFlags {
        DPadFlags(self.0 | rhs.0)
    }
}

impl GamepadState {
    /// Presses `button`; returns whether the state changed
    pub fn press_button(&mut self, button: XboxButton) -> bool {
        if button == XboxButton::Share {
            return self.press_share();
        }
        if self.is_button_pressed(button) {
            return false;
        }
        self.buttons |= button.mask();
        debug!("Pressed button {:?}", button);
        true
    }

    /// Releases `button`; returns whether the state changed
    pub fn release_button(&mut self, button: XboxButton) -> bool {
        if button == XboxButton::Share {
            return self.release_share();
        }
        if !self.is_button_pressed(button) {
            return false;
        }
        self.buttons &= !button.mask();
        debug!("Released button {:?}", button);
        true
    }

    pub fn is_button_pressed(&self, button: XboxButton) -> bool {
        if button == XboxButton::Share {
            return self.share & SHARE_BIT == SHARE_BIT;
        }
        self.buttons & button.mask() == button.mask()
    }

    /// Stores the normalized direction; returns whether the state changed
    pub fn press_dpad(&mut self, flags: impl Into<DPadFlags>) -> Result<bool, GamepadError> {
        let direction = flags.into().normalize()?;
        if self.dpad() == direction {
            return Ok(false);
        }
        debug!("Pressing d-pad direction {}", direction);
        self.hat = direction.bits();
        Ok(true)
    }

    pub fn release_dpad(&mut self) -> bool {
        // None always normalizes
        self.press_dpad(DPadDirection::None).unwrap_or(false)
    }

    fn press_share(&mut self) -> bool {
        if self.share & SHARE_BIT != 0 {
            return false;
        }
        self.share |= SHARE_BIT;
        debug!("Pressed share");
        true
    }

    fn release_share(&mut self) -> bool {
        if self.share & SHARE_BIT == 0 {
            return false;
        }
        self.share &= !SHARE_BIT;
        debug!("Released share");
        true
    }
}
