//! State and codec core of a virtual HID gamepad
//!
//! Keeps the logical state of an Xbox-style controller, encodes it into the
//! 16-byte input report a host expects and decodes the host's 8-byte
//! vibration writes.
//!
//! # Architecture
//!
//! ```text
//!                 setters                              host
//! Application ──────────► GamepadState ──► ReportDispatcher ──► InputChannel
//!                         (one lock)        (now / deferred)
//!
//! OutputChannel ──► VibrationEventBus ──► subscribers
//!   (host write)     (decode + fan-out)
//! ```
//!
//! - [`gamepad`] - state aggregate, button and axis rules
//! - [`report`] - wire codec for both reports
//! - [`dispatch`] - send policy and the deferred work queue
//! - [`vibration`] - output report fan-out
//! - [`transport`] - collaborator traits and an in-process loopback
//! - [`device`] - the device tying it together
//! - [`config`] - TOML configuration
//!
//! ```rust
//! use opengamepad::config::GamepadConfig;
//! use opengamepad::device::GamepadDevice;
//! use opengamepad::gamepad::XboxButton;
//! use opengamepad::transport::LoopbackTransport;
//! use std::sync::Arc;
//!
//! let transport = LoopbackTransport::new(true);
//! let device = GamepadDevice::create(Arc::new(GamepadConfig::default()), None)
//!     .attach(Arc::new(transport.clone()));
//!
//! device.press_button(XboxButton::A);
//! assert_eq!(transport.transmission_count(), 1);
//! ```

pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod gamepad;
pub mod report;
pub mod transport;
pub mod vibration;

pub use config::GamepadConfig;
pub use device::GamepadDevice;
pub use error::GamepadError;
