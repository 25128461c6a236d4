//! Virtual gamepad device with statum lifecycle
//!
//! # State Machine
//!
//! ```text
//! Detached ──attach(transport)──► Attached
//!    ▲                               │
//!    └───────────detach()────────────┘
//! ```
//!
//! Every input setter is available in both states. A detached device keeps
//! its state current but has nowhere to send it; once attached, changes are
//! reported according to the [`GamepadConfig`] it was created with.
//!
//! The device is `Sync`: the application thread may drive the setters while
//! the transport thread delivers vibration writes.

use crate::config::GamepadConfig;
use crate::dispatch::{DeferredQueue, ReportDispatcher, ReportLink};
use crate::error::GamepadError;
use crate::gamepad::{
    DPadDirection, DPadFlags, GamepadState, SharedGamepadState, XboxButton, STICK_MAX, STICK_MIN,
    TRIGGER_MAX, TRIGGER_MIN,
};
use crate::transport::{HidTransport, OutputChannel, WriteHandler};
use crate::vibration::VibrationEventBus;
use statum::{machine, state};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[state]
#[derive(Debug, Clone)]
pub enum DeviceState {
    Detached,
    Attached,
}

/// Installed output write handler, removed again on drop
pub struct OutputBinding {
    channel: Arc<dyn OutputChannel>,
}

impl Drop for OutputBinding {
    fn drop(&mut self) {
        self.channel.set_write_handler(None);
        debug!("Output write handler removed");
    }
}

#[machine]
pub struct GamepadDevice<S: DeviceState> {
    config: Arc<GamepadConfig>,
    state: SharedGamepadState,
    dispatcher: ReportDispatcher,
    vibration: Arc<VibrationEventBus>,
    output_binding: Option<OutputBinding>,
}

impl<S: DeviceState> GamepadDevice<S> {
    pub fn device_config(&self) -> &GamepadConfig {
        &self.config
    }

    /// Vibration commands written by the host
    pub fn on_vibrate(&self) -> &Arc<VibrationEventBus> {
        &self.vibration
    }

    /// Copy of the current input state
    pub fn snapshot(&self) -> GamepadState {
        self.state.snapshot()
    }

    /// Zeroes every input; does not report
    pub fn reset_inputs(&self) {
        self.state.update(GamepadState::reset);
        debug!("Inputs reset");
    }

    pub fn press_button(&self, button: XboxButton) {
        let changed = self.state.update(|s| s.press_button(button));
        self.dispatcher.notify_changed(changed);
    }

    pub fn release_button(&self, button: XboxButton) {
        let changed = self.state.update(|s| s.release_button(button));
        self.dispatcher.notify_changed(changed);
    }

    pub fn is_button_pressed(&self, button: XboxButton) -> bool {
        self.state.read(|s| s.is_button_pressed(button))
    }

    /// Sets the left stick; out-of-range values are clamped
    pub fn set_left_thumbstick(&self, x: i32, y: i32) {
        let changed = self.state.update(|s| s.set_left_thumbstick(x, y));
        self.dispatcher.notify_changed(changed);
    }

    /// Sets the right stick; out-of-range values are clamped
    pub fn set_right_thumbstick(&self, z: i32, rz: i32) {
        let changed = self.state.update(|s| s.set_right_thumbstick(z, rz));
        self.dispatcher.notify_changed(changed);
    }

    pub fn set_left_trigger(&self, value: u16) {
        let changed = self.state.update(|s| s.set_left_trigger(value));
        self.dispatcher.notify_changed(changed);
    }

    pub fn set_right_trigger(&self, value: u16) {
        let changed = self.state.update(|s| s.set_right_trigger(value));
        self.dispatcher.notify_changed(changed);
    }

    /// Presses the d-pad; opposing pairs cancel out
    ///
    /// Fails with [`GamepadError::InvalidArgument`] for bits outside the
    /// hat nibble, leaving the state untouched.
    pub fn press_dpad(&self, direction: impl Into<DPadFlags>) -> Result<(), GamepadError> {
        let flags = direction.into();
        let changed = self.state.update(|s| s.press_dpad(flags))?;
        self.dispatcher.notify_changed(changed);
        Ok(())
    }

    pub fn release_dpad(&self) {
        let changed = self.state.update(GamepadState::release_dpad);
        self.dispatcher.notify_changed(changed);
    }

    pub fn dpad_direction(&self) -> DPadDirection {
        self.state.read(GamepadState::dpad)
    }

    pub fn thumbstick_min(&self) -> i16 {
        STICK_MIN
    }

    pub fn thumbstick_max(&self) -> i16 {
        STICK_MAX
    }

    pub fn trigger_min(&self) -> u16 {
        TRIGGER_MIN
    }

    pub fn trigger_max(&self) -> u16 {
        TRIGGER_MAX
    }

    /// Sends the current state, immediately or via the deferred queue
    pub fn send_gamepad_report(&self, defer: bool) {
        self.dispatcher.send_gamepad_report(defer);
    }
}

impl GamepadDevice<Detached> {
    /// Creates a detached device
    ///
    /// `queue` is where deferred sends go; without one they are sent inline.
    pub fn create(config: Arc<GamepadConfig>, queue: Option<DeferredQueue>) -> Self {
        info!("Creating gamepad device with config: {:?}", config);
        let state = SharedGamepadState::new();
        let dispatcher = ReportDispatcher::new(state.clone(), config.clone(), queue);

        Self::new(
            config,
            state,
            dispatcher,
            Arc::new(VibrationEventBus::new()),
            None, // output_binding
        )
    }

    /// Acquires both report channels and transitions to Attached
    ///
    /// A missing channel is logged, not fatal: without an input channel
    /// reports are skipped, without an output channel no vibration arrives.
    pub fn attach(mut self, transport: Arc<dyn HidTransport>) -> GamepadDevice<Attached> {
        info!(
            "Attaching gamepad device, input report {:#04x}, output report {:#04x}",
            self.config.input_report_id, self.config.output_report_id
        );

        let input = transport.acquire_input_channel(self.config.input_report_id);
        if input.is_none() {
            warn!(
                "Input report {:#04x} unavailable, reports will be skipped",
                self.config.input_report_id
            );
        }

        match transport.acquire_output_channel(self.config.output_report_id) {
            Some(channel) => {
                let bus = self.vibration.clone();
                let handler: WriteHandler = Arc::new(move |data: &[u8]| {
                    // already logged by the bus
                    let _ = bus.handle_output_write(data);
                });
                channel.set_write_handler(Some(handler));
                self.output_binding = Some(OutputBinding { channel });
            }
            None => warn!(
                "Output report {:#04x} unavailable, no vibration will be received",
                self.config.output_report_id
            ),
        }

        self.dispatcher.link(ReportLink::new(transport, input));
        info!("Gamepad device attached");
        self.transition()
    }
}

impl GamepadDevice<Attached> {
    /// Removes the write handler and stops reporting
    pub fn detach(mut self) -> GamepadDevice<Detached> {
        self.output_binding = None;
        self.dispatcher.unlink();
        info!("Gamepad device detached");
        self.transition()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::OutputReportCommand;
    use crate::transport::LoopbackTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn attached(config: GamepadConfig) -> (GamepadDevice<Attached>, LoopbackTransport) {
        let transport = LoopbackTransport::new(true);
        let device =
            GamepadDevice::create(Arc::new(config), None).attach(Arc::new(transport.clone()));
        (device, transport)
    }

    #[test]
    fn detached_device_tracks_state_without_sending() {
        let device = GamepadDevice::create(Arc::new(GamepadConfig::default()), None);
        device.press_button(XboxButton::A);
        device.send_gamepad_report(false);
        assert!(device.is_button_pressed(XboxButton::A));
    }

    #[test]
    fn state_survives_attach() {
        let transport = LoopbackTransport::new(true);
        let device = GamepadDevice::create(Arc::new(GamepadConfig::default()), None);
        device.set_left_trigger(512);

        let device = device.attach(Arc::new(transport.clone()));
        device.send_gamepad_report(false);
        assert_eq!(transport.last_state().unwrap().brake(), 512);
    }

    #[test]
    fn single_press_sends_exactly_one_report() {
        let (device, transport) = attached(GamepadConfig::default());
        device.press_button(XboxButton::A);
        device.press_button(XboxButton::A);
        assert_eq!(transport.transmission_count(), 1);
    }

    #[test]
    fn invalid_dpad_is_reported_and_sends_nothing() {
        let (device, transport) = attached(GamepadConfig::default());
        let err = device.press_dpad(DPadFlags::from_bits(0x80)).unwrap_err();
        assert!(matches!(err, GamepadError::InvalidArgument(_)));
        assert_eq!(transport.transmission_count(), 0);
        assert_eq!(device.dpad_direction(), DPadDirection::None);
    }

    #[test]
    fn reset_does_not_report() {
        let (device, transport) = attached(GamepadConfig::default());
        device.press_button(XboxButton::B);
        device.reset_inputs();
        assert_eq!(transport.transmission_count(), 1);
        assert_eq!(device.snapshot(), GamepadState::default());
    }

    #[test]
    fn host_write_reaches_vibration_subscribers() {
        let (device, transport) = attached(GamepadConfig::default());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        device.on_vibrate().subscribe(move |cmd: &OutputReportCommand| {
            assert_eq!(cmd.weak_motor_magnitude, 0x10);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let command = OutputReportCommand {
            weak_motor_magnitude: 0x10,
            ..OutputReportCommand::default()
        };
        assert!(transport.host_write(&command.to_bytes()));
        assert!(transport.host_write(&[0u8; 3]));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detach_and_drop_remove_write_handler() {
        let (device, transport) = attached(GamepadConfig::default());
        assert!(transport.has_write_handler());
        let device = device.detach();
        assert!(!transport.has_write_handler());

        device.press_button(XboxButton::Y);
        assert_eq!(transport.transmission_count(), 0);

        let device = device.attach(Arc::new(transport.clone()));
        assert!(transport.has_write_handler());
        drop(device);
        assert!(!transport.has_write_handler());
    }

    #[test]
    fn range_getters() {
        let device = GamepadDevice::create(Arc::new(GamepadConfig::default()), None);
        assert_eq!(device.thumbstick_min(), -32768);
        assert_eq!(device.thumbstick_max(), 32767);
        assert_eq!(device.trigger_min(), 0);
        assert_eq!(device.trigger_max(), 1023);
        assert!(device.device_config().auto_report);
    }
}
