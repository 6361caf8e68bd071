//! # Trace bus for broadcasting routing decisions.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. The endpoint
//! publishes one [`Event`] per routing decision; the connector's forwarding task
//! and any direct receivers (tests, tooling) observe them.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks.
//! - **Bounded capacity**: slow receivers get `RecvError::Lagged(n)`.
//! - **No persistence**: events are lost if nobody is subscribed.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for trace events.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers. Dropped if there are none.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn publish_without_receivers_is_silent() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::Published));
        assert_eq!(bus.receiver_count(), 0);
    }

    #[tokio::test]
    async fn receivers_see_later_events() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::ForwardedUp));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ForwardedUp);
    }
}
