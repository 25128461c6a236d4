//! Report dispatch - when and how the input report reaches the host
//!
//! ```text
//! setter ─(changed)─► notify_changed ─(auto_report)─► send_gamepad_report(defer)
//!                                                        │
//!                        defer || auto_defer ┌───────────┴──────────┐ otherwise
//!                                            ▼                      ▼
//!                               DeferredQueue (coalesced)      send_now
//!                                            └─────────► send_now ──┘
//!                                                          │
//!              transmit lock ─► snapshot under state lock ─► send + notify
//! ```
//!
//! At most one deferred send per device is queued at a time. Further
//! deferred requests before it runs are folded into it; since the job
//! snapshots the state when it runs, it carries everything up to the last
//! request.
//!
//! Transmission is serialized by its own lock, separate from the state lock.
//! Setters never wait on transport I/O, and a snapshot taken earlier never
//! reaches the host after one taken later.

pub mod queue;

pub use queue::{DeferredJob, DeferredQueue, DeferredWorker};

use crate::config::GamepadConfig;
use crate::error::GamepadError;
use crate::gamepad::SharedGamepadState;
use crate::report::{encode_input_report, INPUT_REPORT_SIZE};
use crate::transport::{HidTransport, InputChannel};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, warn};

/// Where reports go once a device is attached
#[derive(Clone)]
pub struct ReportLink {
    transport: Arc<dyn HidTransport>,
    input: Option<Arc<dyn InputChannel>>,
}

impl ReportLink {
    pub fn new(transport: Arc<dyn HidTransport>, input: Option<Arc<dyn InputChannel>>) -> Self {
        Self { transport, input }
    }
}

struct DispatcherInner {
    state: SharedGamepadState,
    config: Arc<GamepadConfig>,
    queue: Option<DeferredQueue>,
    link: RwLock<Option<ReportLink>>,
    // held from snapshot to notify so reports leave in snapshot order
    send_lock: Mutex<()>,
    deferred_pending: AtomicBool,
}

/// Sends snapshots of one device's state according to its config
///
/// Clones share one link, so a deferred job queued before
/// [`unlink`](Self::unlink) finds no transport when it runs.
#[derive(Clone)]
pub struct ReportDispatcher {
    inner: Arc<DispatcherInner>,
}

impl ReportDispatcher {
    /// A dispatcher with no transport; sends are skipped until linked
    pub fn new(
        state: SharedGamepadState,
        config: Arc<GamepadConfig>,
        queue: Option<DeferredQueue>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                state,
                config,
                queue,
                link: RwLock::new(None),
                send_lock: Mutex::new(()),
                deferred_pending: AtomicBool::new(false),
            }),
        }
    }

    /// Starts sending through `link`
    pub fn link(&self, link: ReportLink) {
        *self
            .inner
            .link
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(link);
    }

    /// Drops the transport; queued and later sends are skipped
    pub fn unlink(&self) {
        self.inner
            .link
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn current_link(&self) -> Option<ReportLink> {
        self.inner
            .link
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_linked(&self) -> bool {
        self.current_link().is_some()
    }

    /// Reacts to a setter's change signal
    pub fn notify_changed(&self, changed: bool) {
        if changed && self.inner.config.auto_report {
            self.send_gamepad_report(false);
        }
    }

    /// Sends the current state now, or queues it when `defer` or `auto_defer` is set
    pub fn send_gamepad_report(&self, defer: bool) {
        if defer || self.inner.config.auto_defer {
            self.send_deferred();
        } else {
            self.send_now();
        }
    }

    fn send_deferred(&self) {
        let Some(queue) = &self.inner.queue else {
            debug!("No deferred queue supplied, sending immediately");
            self.send_now();
            return;
        };

        if self.inner.deferred_pending.swap(true, Ordering::AcqRel) {
            debug!("Deferred report already queued, coalescing");
            return;
        }

        let dispatcher = self.clone();
        let job: DeferredJob = Box::new(move || {
            // cleared before the snapshot so later requests queue a fresh job
            dispatcher
                .inner
                .deferred_pending
                .store(false, Ordering::Release);
            dispatcher.send_now();
        });

        if let Err(e) = queue.enqueue(job) {
            self.inner.deferred_pending.store(false, Ordering::Release);
            match e {
                GamepadError::QueueClosed => debug!("Deferred queue closed, report dropped"),
                e => warn!("Failed to queue deferred report: {}", e),
            }
        }
    }

    /// Snapshots and transmits, skipping silently when the host is unreachable
    pub fn send_now(&self) {
        let _transmit = self
            .inner
            .send_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(link) = self.current_link() else {
            debug!("No transport attached, skipping report");
            return;
        };
        let Some(input) = &link.input else {
            debug!("No input channel, skipping report");
            return;
        };
        if !link.transport.is_connected() {
            debug!("Peer not connected, skipping report");
            return;
        }

        let report = self.inner.state.read(encode_input_report);
        debug!(
            "Sending gamepad report, id: {:#04x}, size: {}",
            self.inner.config.input_report_id, INPUT_REPORT_SIZE
        );
        input.send(&report);
        input.notify();
    }
}
