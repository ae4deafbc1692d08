//! Event buffering and fan-out shared by both adapters.
//!
//! Normalized events are queued until at least one subscriber exists,
//! so the membership snapshot emitted at join time is never lost to a
//! subscriber that registers right after the join call returns.
//! Subscribers whose receiving end was dropped are pruned on the next
//! flush - dropping a `Subscription` is the unsubscribe.

use std::collections::VecDeque;

use futures_channel::mpsc;

use tacops_protocol::RoomEvent;

use crate::ports::Subscription;

#[derive(Default)]
pub struct EventFan {
    queued: VecDeque<RoomEvent>,
    subscribers: Vec<mpsc::UnboundedSender<RoomEvent>>,
}

impl EventFan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = mpsc::unbounded();
        self.subscribers.push(tx);
        Subscription::new(rx)
    }

    pub fn queue(&mut self, event: RoomEvent) {
        self.queued.push_back(event);
    }

    /// Deliver queued events to the current subscribers. Holds the
    /// queue when nobody is listening yet.
    pub fn flush(&mut self) {
        self.subscribers.retain(|tx| !tx.is_closed());
        if self.subscribers.is_empty() {
            return;
        }
        while let Some(event) = self.queued.pop_front() {
            self.subscribers
                .retain(|tx| tx.unbounded_send(event.clone()).is_ok());
        }
    }

    /// Drop pending events, e.g. after the room they belong to is gone.
    pub fn discard_queued(&mut self) {
        self.queued.clear();
    }
}
