//! Wire codec for the two HID reports
//!
//! Pure functions only; nothing here holds state or locks.
//!
//! - [`input`] - 16-byte device-to-host controller state
//! - [`output`] - 8-byte host-to-device vibration command

pub mod input;
pub mod output;

pub use input::{encode_input_report, parse_input_report, INPUT_REPORT_SIZE};
pub use output::{decode_output_report, OutputReportCommand, OUTPUT_REPORT_SIZE};
