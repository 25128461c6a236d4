//! Transport collaborator interface
//!
//! The BLE/USB stack is not part of this crate. It is reached through three
//! small traits: an input channel that carries reports to the host, an output
//! channel that delivers host writes, and the connection status.
//!
//! [`LoopbackTransport`] implements all three in-process. It records what a
//! host would have received and can inject host writes, which is what the
//! demo binary and the tests run against.

use crate::error::GamepadError;
use crate::gamepad::GamepadState;
use crate::report::parse_input_report;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Callback invoked with the raw bytes of every host write
pub type WriteHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Device-to-host report characteristic
pub trait InputChannel: Send + Sync {
    /// Stages the report value
    fn send(&self, report: &[u8]);

    /// Pushes the staged value to the host
    fn notify(&self);
}

/// Host-to-device report characteristic
pub trait OutputChannel: Send + Sync {
    /// Installs or, with `None`, removes the write handler
    fn set_write_handler(&self, handler: Option<WriteHandler>);
}

/// The HID service a device is attached to
pub trait HidTransport: Send + Sync {
    fn acquire_input_channel(&self, report_id: u8) -> Option<Arc<dyn InputChannel>>;

    fn acquire_output_channel(&self, report_id: u8) -> Option<Arc<dyn OutputChannel>>;

    fn is_connected(&self) -> bool;
}

/// A report as seen by the host side of a [`LoopbackTransport`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransmittedReport {
    pub report_id: u8,
    pub bytes: Vec<u8>,
}

impl TransmittedReport {
    pub fn state(&self) -> Result<GamepadState, GamepadError> {
        parse_input_report(&self.bytes)
    }
}

#[derive(Default)]
struct LoopbackInner {
    connected: AtomicBool,
    input_available: AtomicBool,
    output_available: AtomicBool,
    staged: Mutex<Option<TransmittedReport>>,
    transmitted: Mutex<Vec<TransmittedReport>>,
    notifications: AtomicUsize,
    write_handler: Mutex<Option<WriteHandler>>,
}

/// In-process transport that plays the host
#[derive(Clone)]
pub struct LoopbackTransport {
    inner: Arc<LoopbackInner>,
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LoopbackTransport {
    pub fn new(connected: bool) -> Self {
        let inner = LoopbackInner::default();
        inner.connected.store(connected, Ordering::SeqCst);
        inner.input_available.store(true, Ordering::SeqCst);
        inner.output_available.store(true, Ordering::SeqCst);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// A transport that refuses to hand out an input channel
    pub fn without_input_channel(self) -> Self {
        self.inner.input_available.store(false, Ordering::SeqCst);
        self
    }

    /// A transport that refuses to hand out an output channel
    pub fn without_output_channel(self) -> Self {
        self.inner.output_available.store(false, Ordering::SeqCst);
        self
    }

    pub fn set_connected(&self, connected: bool) {
        debug!("Loopback peer connected: {}", connected);
        self.inner.connected.store(connected, Ordering::SeqCst);
    }

    /// Every report notified to the host, oldest first
    pub fn transmitted(&self) -> Vec<TransmittedReport> {
        lock(&self.inner.transmitted).clone()
    }

    pub fn transmission_count(&self) -> usize {
        lock(&self.inner.transmitted).len()
    }

    pub fn notification_count(&self) -> usize {
        self.inner.notifications.load(Ordering::SeqCst)
    }

    /// Last transmitted report decoded back into a state
    pub fn last_state(&self) -> Option<GamepadState> {
        lock(&self.inner.transmitted)
            .last()
            .and_then(|report| report.state().ok())
    }

    pub fn clear_transmitted(&self) {
        lock(&self.inner.transmitted).clear();
    }

    pub fn has_write_handler(&self) -> bool {
        lock(&self.inner.write_handler).is_some()
    }

    /// Delivers `bytes` as if the host wrote the output report
    ///
    /// Returns `false` when no device has installed a write handler.
    pub fn host_write(&self, bytes: &[u8]) -> bool {
        // cloned out so the handler runs without our lock
        let handler = lock(&self.inner.write_handler).clone();
        match handler {
            Some(handler) => {
                handler(bytes);
                true
            }
            None => {
                warn!("Host write of {} bytes with no handler installed", bytes.len());
                false
            }
        }
    }
}

impl HidTransport for LoopbackTransport {
    fn acquire_input_channel(&self, report_id: u8) -> Option<Arc<dyn InputChannel>> {
        if !self.inner.input_available.load(Ordering::SeqCst) {
            return None;
        }
        Some(Arc::new(LoopbackInputChannel {
            report_id,
            inner: self.inner.clone(),
        }))
    }

    fn acquire_output_channel(&self, report_id: u8) -> Option<Arc<dyn OutputChannel>> {
        if !self.inner.output_available.load(Ordering::SeqCst) {
            return None;
        }
        Some(Arc::new(LoopbackOutputChannel {
            report_id,
            inner: self.inner.clone(),
        }))
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }
}

struct LoopbackInputChannel {
    report_id: u8,
    inner: Arc<LoopbackInner>,
}

impl InputChannel for LoopbackInputChannel {
    fn send(&self, report: &[u8]) {
        *lock(&self.inner.staged) = Some(TransmittedReport {
            report_id: self.report_id,
            bytes: report.to_vec(),
        });
    }

    fn notify(&self) {
        self.inner.notifications.fetch_add(1, Ordering::SeqCst);
        if let Some(report) = lock(&self.inner.staged).take() {
            lock(&self.inner.transmitted).push(report);
        }
    }
}

struct LoopbackOutputChannel {
    report_id: u8,
    inner: Arc<LoopbackInner>,
}

impl OutputChannel for LoopbackOutputChannel {
    fn set_write_handler(&self, handler: Option<WriteHandler>) {
        debug!(
            "Output report {:#04x} handler {}",
            self.report_id,
            if handler.is_some() { "installed" } else { "removed" }
        );
        *lock(&self.inner.write_handler) = handler;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_moves_staged_report_to_host() {
        let transport = LoopbackTransport::new(true);
        let input = transport.acquire_input_channel(1).unwrap();

        input.send(&[0u8; 16]);
        assert_eq!(transport.transmission_count(), 0);
        input.notify();
        assert_eq!(transport.transmission_count(), 1);
        assert_eq!(transport.transmitted()[0].report_id, 1);
        assert_eq!(transport.last_state(), Some(GamepadState::default()));

        // nothing staged
        input.notify();
        assert_eq!(transport.transmission_count(), 1);
        assert_eq!(transport.notification_count(), 2);
    }

    #[test]
    fn host_write_reaches_installed_handler() {
        let transport = LoopbackTransport::new(true);
        let output = transport.acquire_output_channel(3).unwrap();
        assert!(!transport.host_write(&[0u8; 8]));

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        output.set_write_handler(Some(Arc::new(move |bytes: &[u8]| {
            counter.fetch_add(bytes.len(), Ordering::SeqCst);
        })));
        assert!(transport.host_write(&[0u8; 8]));
        assert_eq!(seen.load(Ordering::SeqCst), 8);

        output.set_write_handler(None);
        assert!(!transport.has_write_handler());
    }

    #[test]
    fn channels_can_be_withheld() {
        let transport = LoopbackTransport::new(false)
            .without_input_channel()
            .without_output_channel();
        assert!(transport.acquire_input_channel(1).is_none());
        assert!(transport.acquire_output_channel(3).is_none());
        assert!(!transport.is_connected());
    }
}
