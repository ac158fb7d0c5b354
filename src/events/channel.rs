//! Event channel built on crossbeam-channel.
//!
//! Batch workers and the scanner send on cloned `EventSender`s; one
//! listener (the CLI's progress bar, a test) iterates the `EventReceiver`
//! until every sender is gone.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Sending half, cheap to clone into every worker
#[derive(Clone)]
pub struct EventSender(Sender<Event>);

impl EventSender {
    /// Events sent after the receiver is gone are dropped; progress
    /// reporting never fails the batch.
    pub fn send(&self, event: Event) {
        let _ = self.0.send(event);
    }
}

/// Receiving half, held by whoever renders progress
pub struct EventReceiver(Receiver<Event>);

impl EventReceiver {
    /// Events until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.0.iter()
    }
}

/// Unbounded sender/receiver pair; sending never blocks a worker
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (sender, receiver) = unbounded();
    (EventSender(sender), EventReceiver(receiver))
}

/// A sender nobody listens to, for runs without progress reporting
pub fn null_sender() -> EventSender {
    event_channel().0
}
