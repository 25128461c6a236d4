//! Vibration event fan-out
//!
//! Host writes to the output report are decoded and published to every
//! subscriber, in subscription order, on the thread that delivered the write.
//! Callback subscribers run inline and should return quickly; channel
//! subscribers get a bounded queue and lose events when they fall behind
//! rather than stalling the transport.

use crate::error::GamepadError;
use crate::report::{decode_output_report, OutputReportCommand};
use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

pub type VibrationHandler = Arc<dyn Fn(&OutputReportCommand) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// A vibration command as delivered to channel subscribers
#[derive(Clone, Debug)]
pub struct VibrationEvent {
    pub command: OutputReportCommand,
    pub received_at: DateTime<Local>,
}

#[derive(Clone)]
enum Subscriber {
    Callback(VibrationHandler),
    Channel(mpsc::Sender<VibrationEvent>),
}

#[derive(Default)]
pub struct VibrationEventBus {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
}

impl VibrationEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback run for every decoded command
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&OutputReportCommand) + Send + Sync + 'static,
    {
        self.add(Subscriber::Callback(Arc::new(handler)))
    }

    /// Registers a bounded channel for delivery to another task or thread
    pub fn subscribe_channel(
        &self,
        capacity: usize,
    ) -> (SubscriptionId, mpsc::Receiver<VibrationEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (self.add(Subscriber::Channel(sender)), receiver)
    }

    /// Returns whether `id` was subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        let removed = subscribers.len() != before;
        if removed {
            debug!("Vibration subscriber {:?} removed", id);
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Decodes a raw output report write and publishes it
    pub fn handle_output_write(&self, data: &[u8]) -> Result<OutputReportCommand, GamepadError> {
        let command = decode_output_report(data).map_err(|e| {
            warn!("Rejected output report write: {}", e);
            e
        })?;
        debug!(
            "Output report write, size: {}, enable: {:#04x}, weak: {}, strong: {}, duration: {}, start delay: {}, loop count: {}",
            data.len(),
            command.actuator_enable,
            command.weak_motor_magnitude,
            command.strong_motor_magnitude,
            command.duration,
            command.start_delay,
            command.loop_count
        );
        self.publish(&command);
        Ok(command)
    }

    /// Delivers `command` to every current subscriber in order
    pub fn publish(&self, command: &OutputReportCommand) {
        // delivered outside the lock so handlers may (un)subscribe
        let subscribers = self.lock().clone();
        let received_at = Local::now();
        let mut closed = Vec::new();

        for (id, subscriber) in subscribers {
            match subscriber {
                Subscriber::Callback(handler) => handler(command),
                Subscriber::Channel(sender) => {
                    let event = VibrationEvent {
                        command: *command,
                        received_at,
                    };
                    match sender.try_send(event) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            warn!("Vibration subscriber {:?} is full, event dropped", id)
                        }
                        Err(TrySendError::Closed(_)) => closed.push(id),
                    }
                }
            }
        }

        for id in closed {
            debug!("Vibration receiver {:?} dropped", id);
            self.unsubscribe(id);
        }
    }

    fn add(&self, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, subscriber));
        debug!("Vibration subscriber {:?} added", id);
        id
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Subscriber)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rumble(strong: u8) -> [u8; 8] {
        OutputReportCommand {
            actuator_enable: 0x03,
            strong_motor_magnitude: strong,
            ..OutputReportCommand::default()
        }
        .to_bytes()
    }

    #[test]
    fn callbacks_run_in_subscription_order() {
        let bus = VibrationEventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            bus.subscribe(move |cmd: &OutputReportCommand| {
                seen.lock().unwrap().push((tag, cmd.strong_motor_magnitude))
            });
        }

        bus.handle_output_write(&rumble(0x40)).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 0x40), ("second", 0x40), ("third", 0x40)]
        );
    }

    #[test]
    fn unsubscribed_callback_is_not_called() {
        let bus = VibrationEventBus::new();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = hits.clone();
        let id = bus.subscribe(move |_: &OutputReportCommand| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.handle_output_write(&rumble(1)).unwrap();
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.handle_output_write(&rumble(2)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn malformed_write_publishes_nothing() {
        let bus = VibrationEventBus::new();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = hits.clone();
        bus.subscribe(move |_: &OutputReportCommand| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let err = bus.handle_output_write(&[0u8; 7]).unwrap_err();
        assert!(matches!(
            err,
            GamepadError::MalformedReport {
                expected: 8,
                actual: 7
            }
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn channel_subscriber_receives_events() {
        let bus = VibrationEventBus::new();
        let (_id, mut rx) = bus.subscribe_channel(4);
        bus.handle_output_write(&rumble(0x25)).unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.command.strong_motor_magnitude, 0x25);
    }

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let bus = VibrationEventBus::new();
        let (_id, mut rx) = bus.subscribe_channel(1);
        bus.handle_output_write(&rumble(1)).unwrap();
        bus.handle_output_write(&rumble(2)).unwrap();

        assert_eq!(rx.try_recv().unwrap().command.strong_motor_magnitude, 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_is_unsubscribed() {
        let bus = VibrationEventBus::new();
        let (_id, rx) = bus.subscribe_channel(1);
        drop(rx);
        bus.handle_output_write(&rumble(1)).unwrap();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn handler_may_subscribe_during_delivery() {
        let bus = Arc::new(VibrationEventBus::new());
        let inner = bus.clone();
        bus.subscribe(move |_: &OutputReportCommand| {
            inner.subscribe(|_: &OutputReportCommand| {});
        });
        bus.handle_output_write(&rumble(1)).unwrap();
        assert_eq!(bus.subscriber_count(), 2);
    }
}
