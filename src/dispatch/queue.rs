//! Deferred work queue
//!
//! A bounded FIFO of boxed jobs. The [`DeferredQueue`] handle is cheap to
//! clone and is what devices enqueue into; the [`DeferredWorker`] owns the
//! receiving end and runs jobs in order, either as a tokio task
//! ([`DeferredWorker::run`]) or by explicit draining
//! ([`DeferredWorker::drain_pending`]).
//!
//! ```text
//! Device ─[DeferredJob]→ mpsc::channel(capacity) ─→ DeferredWorker ─→ job()
//! ```
//!
//! Cancelling the worker's token tears the queue down: jobs still queued are
//! dropped without running and later enqueues fail with
//! [`GamepadError::QueueClosed`].

use crate::error::GamepadError;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub type DeferredJob = Box<dyn FnOnce() + Send + 'static>;

/// Enqueueing side of the work queue
#[derive(Clone)]
pub struct DeferredQueue {
    sender: mpsc::Sender<DeferredJob>,
}

/// Draining side of the work queue
pub struct DeferredWorker {
    receiver: mpsc::Receiver<DeferredJob>,
    cancel: CancellationToken,
}

impl DeferredQueue {
    /// Creates a queue and its worker without starting anything
    pub fn new(capacity: usize, cancel: CancellationToken) -> (Self, DeferredWorker) {
        let (sender, receiver) = mpsc::channel(capacity);
        debug!("Created deferred queue with capacity {}", capacity);
        (Self { sender }, DeferredWorker { receiver, cancel })
    }

    /// Creates a queue and spawns its worker on the current tokio runtime
    pub fn spawn(capacity: usize, cancel: CancellationToken) -> (Self, JoinHandle<()>) {
        let (queue, worker) = Self::new(capacity, cancel);
        let handle = tokio::spawn(worker.run());
        info!("Deferred worker spawned");
        (queue, handle)
    }

    /// Queues `job` without waiting
    pub fn enqueue(&self, job: DeferredJob) -> Result<(), GamepadError> {
        self.sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => GamepadError::QueueFull,
            TrySendError::Closed(_) => GamepadError::QueueClosed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl DeferredWorker {
    /// Runs queued jobs until cancelled or until every queue handle is gone
    ///
    /// Jobs run one at a time on the blocking pool, so a transport that
    /// blocks in `notify` does not stall the runtime and order is kept.
    pub async fn run(mut self) {
        info!("Deferred worker started");
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("Deferred worker cancelled, dropping queued jobs");
                    break;
                }
                job = self.receiver.recv() => match job {
                    Some(job) => {
                        if let Err(e) = tokio::task::spawn_blocking(job).await {
                            error!("Deferred job failed: {}", e);
                        }
                    }
                    None => {
                        info!("All deferred queue handles dropped, worker finished");
                        break;
                    }
                },
            }
        }
        self.receiver.close();
    }

    /// Runs every job queued right now on the calling thread
    ///
    /// Returns the number of jobs run. Does nothing once cancelled.
    pub fn drain_pending(&mut self) -> usize {
        if self.cancel.is_cancelled() {
            return 0;
        }
        let mut count = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            count += 1;
        }
        if count > 0 {
            debug!("Drained {} deferred jobs", count);
        }
        count
    }

    /// Cancels the worker and drops whatever is still queued
    pub fn shutdown(mut self) {
        self.cancel.cancel();
        self.receiver.close();
        info!("Deferred worker shut down");
    }
}
