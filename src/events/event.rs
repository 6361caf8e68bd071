//! # Trace events emitted by a connector while it routes envelopes.
//!
//! The [`EventKind`] enum classifies every propagation decision:
//! - **API events**: subscribe, unsubscribe, publish
//! - **Routing events**: forwarded up, direction flipped, fanned out
//! - **Delivery events**: dispatched locally, echo suppressed, listener panicked
//! - **Drop events**: foreign envelope, failed delivery
//! - **Subscriber events**: trace subscriber panicked or overflowed
//!
//! The [`Event`] struct carries the namespaced event name, the context that
//! made the decision, and optional details.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use frame_connector::{ContextId, Event, EventKind};
//!
//! let ev = Event::new(EventKind::ForwardedUp)
//!     .with_event_name("default.ping")
//!     .with_context(ContextId(3));
//!
//! assert_eq!(ev.kind, EventKind::ForwardedUp);
//! assert_eq!(ev.event_name.as_deref(), Some("default.ping"));
//! ```

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::envelope::Direction;
use crate::transport::ContextId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of trace events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === API events ===
    /// A handler was (re)installed.
    ///
    /// Sets: `event_name`, `context`, `count` (registrations replaced)
    Subscribed,

    /// Registrations were removed through `unsubscribe`.
    ///
    /// Sets: `event_name`, `context`, `count` (registrations removed)
    Unsubscribed,

    /// A local `notification` created a new envelope.
    ///
    /// Sets: `event_name`, `context`
    Published,

    // === Routing events ===
    /// A non-root context handed an upward envelope to its parent.
    ///
    /// Sets: `event_name`, `context`
    ForwardedUp,

    /// The root turned an upward envelope into a downward one.
    ///
    /// Sets: `event_name`, `context`
    DirectionFlipped,

    /// A downward envelope was sent to the children of a context.
    ///
    /// Sets: `event_name`, `context`, `count` (children reached)
    FannedOut,

    // === Delivery events ===
    /// Local listeners were invoked.
    ///
    /// Sets: `event_name`, `context`, `count` (listeners invoked)
    Dispatched,

    /// Local dispatch skipped because this context published the envelope.
    ///
    /// Sets: `event_name`, `context`
    EchoSuppressed,

    /// A local listener panicked; routing of the envelope continued.
    ///
    /// Sets: `event_name`, `context`, `reason` (panic message)
    HandlerPanicked,

    // === Drop events ===
    /// Inbound message ignored (foreign tag or undecodable).
    ///
    /// Sets: `context`, `reason`
    ForeignDropped,

    /// A send to the parent or a child failed; the message is lost.
    ///
    /// Sets: `event_name`, `context`, `peer` (child, if any), `reason`
    DeliveryFailed,

    /// The inbound listener of a context exited.
    ///
    /// Sets: `context`, `reason`
    ListenerStopped,

    // === Subscriber events ===
    /// Trace subscriber panicked during event processing.
    ///
    /// Sets: `subscriber`, `reason`
    SubscriberPanicked,

    /// Trace subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `subscriber`, `reason`
    SubscriberOverflow,
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Trace event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Namespaced event name, if applicable.
    pub event_name: Option<Arc<str>>,
    /// Context that made the decision.
    pub context: Option<ContextId>,
    /// Other context involved (target child), if any.
    pub peer: Option<ContextId>,
    /// Envelope direction at the time of the decision.
    pub direction: Option<Direction>,
    /// Counter whose meaning depends on `kind`.
    pub count: Option<usize>,
    /// Human-readable reason (drops, failures, panics).
    pub reason: Option<Arc<str>>,
    /// Subscriber name for subscriber events.
    pub subscriber: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            event_name: None,
            context: None,
            peer: None,
            direction: None,
            count: None,
            reason: None,
            subscriber: None,
        }
    }

    #[inline]
    pub fn with_event_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.event_name = Some(name.into());
        self
    }

    #[inline]
    pub fn with_context(mut self, id: ContextId) -> Self {
        self.context = Some(id);
        self
    }

    #[inline]
    pub fn with_peer(mut self, id: ContextId) -> Self {
        self.peer = Some(id);
        self
    }

    #[inline]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow).with_reason(reason);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::Published);
        let b = Event::new(EventKind::Published);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_fill_fields() {
        let ev = Event::new(EventKind::DeliveryFailed)
            .with_event_name("g.ping")
            .with_context(ContextId(1))
            .with_peer(ContextId(2))
            .with_direction(Direction::Down)
            .with_reason("detached");
        assert_eq!(ev.peer, Some(ContextId(2)));
        assert_eq!(ev.direction, Some(Direction::Down));
        assert_eq!(ev.reason.as_deref(), Some("detached"));
        assert!(!ev.is_subscriber_event());
    }

    #[test]
    fn subscriber_helpers_tag_the_subscriber() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert_eq!(ev.subscriber, Some("audit"));
        assert!(ev.is_subscriber_event());
    }
}
