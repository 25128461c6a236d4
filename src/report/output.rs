//! Host-to-device output report (rumble)
//!
//! Layout (8 bytes, one field per byte of a little-endian u64):
//! ```text
//! Byte 0: Actuator enable mask (low nibble)
//! Byte 1: Left trigger magnitude
//! Byte 2: Right trigger magnitude
//! Byte 3: Weak motor magnitude
//! Byte 4: Strong motor magnitude
//! Byte 5: Duration
//! Byte 6: Start delay
//! Byte 7: Loop count
//! ```

use crate::error::GamepadError;

/// Output report size in bytes.
pub const OUTPUT_REPORT_SIZE: usize = 8;

/// Decoded vibration command
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct OutputReportCommand {
    pub actuator_enable: u8,
    pub left_trigger_magnitude: u8,
    pub right_trigger_magnitude: u8,
    pub weak_motor_magnitude: u8,
    pub strong_motor_magnitude: u8,
    pub duration: u8,
    pub start_delay: u8,
    pub loop_count: u8,
}

impl OutputReportCommand {
    pub fn to_bytes(&self) -> [u8; OUTPUT_REPORT_SIZE] {
        [
            self.actuator_enable,
            self.left_trigger_magnitude,
            self.right_trigger_magnitude,
            self.weak_motor_magnitude,
            self.strong_motor_magnitude,
            self.duration,
            self.start_delay,
            self.loop_count,
        ]
    }
}

impl From<[u8; OUTPUT_REPORT_SIZE]> for OutputReportCommand {
    fn from(bytes: [u8; OUTPUT_REPORT_SIZE]) -> Self {
        Self {
            actuator_enable: bytes[0],
            left_trigger_magnitude: bytes[1],
            right_trigger_magnitude: bytes[2],
            weak_motor_magnitude: bytes[3],
            strong_motor_magnitude: bytes[4],
            duration: bytes[5],
            start_delay: bytes[6],
            loop_count: bytes[7],
        }
    }
}

impl From<u64> for OutputReportCommand {
    fn from(value: u64) -> Self {
        Self::from(value.to_le_bytes())
    }
}

impl TryFrom<&[u8]> for OutputReportCommand {
    type Error = GamepadError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        decode_output_report(data)
    }
}

/// Decodes an output report write; anything but exactly 8 bytes is malformed
pub fn decode_output_report(data: &[u8]) -> Result<OutputReportCommand, GamepadError> {
    let bytes: [u8; OUTPUT_REPORT_SIZE] =
        data.try_into().map_err(|_| GamepadError::MalformedReport {
            expected: OUTPUT_REPORT_SIZE,
            actual: data.len(),
        })?;
    Ok(OutputReportCommand::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_captured_xinput_packet() {
        // as written by XInput on the host
        let value: u64 = 0x0300002500ff00ff;
        let command = decode_output_report(&value.to_le_bytes()).unwrap();

        assert_eq!(command.actuator_enable, 0xFF);
        assert_eq!(command.left_trigger_magnitude, 0x00);
        assert_eq!(command.right_trigger_magnitude, 0xFF);
        assert_eq!(command.weak_motor_magnitude, 0x00);
        assert_eq!(command.strong_motor_magnitude, 0x25);
        assert_eq!(command.duration, 0x00);
        assert_eq!(command.start_delay, 0x00);
        assert_eq!(command.loop_count, 0x03);
        assert_eq!(command, OutputReportCommand::from(value));
    }

    #[test]
    fn byte_i_maps_to_field_i() {
        let command = decode_output_report(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(
            command,
            OutputReportCommand {
                actuator_enable: 1,
                left_trigger_magnitude: 2,
                right_trigger_magnitude: 3,
                weak_motor_magnitude: 4,
                strong_motor_magnitude: 5,
                duration: 6,
                start_delay: 7,
                loop_count: 8,
            }
        );
        assert_eq!(command.to_bytes(), [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn short_and_long_writes_are_malformed() {
        for len in [0usize, 1, 7, 9, 16] {
            let data = vec![0xAAu8; len];
            match decode_output_report(&data) {
                Err(GamepadError::MalformedReport { expected, actual }) => {
                    assert_eq!(expected, OUTPUT_REPORT_SIZE);
                    assert_eq!(actual, len);
                }
                other => panic!("expected MalformedReport for {len} bytes, got {other:?}"),
            }
        }
    }

    #[test]
    fn try_from_slice_matches_decode() {
        let data = [0x0F, 0, 0, 0x40, 0x80, 0x10, 0, 1];
        let command = OutputReportCommand::try_from(&data[..]).unwrap();
        assert_eq!(command.weak_motor_magnitude, 0x40);
        assert_eq!(command.strong_motor_magnitude, 0x80);
    }
}
