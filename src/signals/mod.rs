//! Signal bus for external collaborators (UI, camera, audio).
//!
//! Broadcast, multi-subscriber, one delivery per occurrence. Each
//! subscriber owns a [`Subscription`] wrapping an mpsc receiver; dropping it
//! unregisters on the next emit, [`SignalBus::unsubscribe`] unregisters at once.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::debug;

/// Occurrences the core announces. Subscribers re-query state for details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameSignal {
    LevelLoaded,
    LevelCompleted,
    GameOver,
    CollectableDestroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Receiving end of one subscriber
#[derive(Debug)]
pub struct Subscription<S> {
    id: SubscriptionId,
    receiver: Receiver<S>,
}

impl<S> Subscription<S> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn try_recv(&self) -> Option<S> {
        self.receiver.try_recv().ok()
    }

    /// Everything delivered since the last drain, oldest first
    pub fn drain(&self) -> Vec<S> {
        self.receiver.try_iter().collect()
    }
}

#[derive(Debug)]
pub struct SignalBus<S> {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Sender<S>)>,
}

impl<S> Default for SignalBus<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SignalBus<S> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> Subscription<S> {
        let (tx, rx) = mpsc::channel();
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, tx));
        Subscription { id, receiver: rx }
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        before != self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<S: Clone + std::fmt::Debug> SignalBus<S> {
    /// Deliver to every live subscriber; dropped receivers are pruned
    pub fn emit(&mut self, signal: S) {
        debug!("Signal {:?} -> {} subscribers", signal, self.subscribers.len());
        self.subscribers
            .retain(|(_, tx)| tx.send(signal.clone()).is_ok());
    }
}
