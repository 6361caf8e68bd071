//! # Endpoint: identity, listeners and the propagation state machine.
//!
//! One endpoint exists per initialized [`Connector`](crate::Connector). Local
//! publishes and inbound messages both end up in [`Endpoint::route`].
//!
//! ## Routing
//! ```text
//!                 ┌─────────── is_root? ───────────┐
//!                 │ yes                            │ no
//!                 ▼                                ▼
//!   direction := down (DirectionFlipped)     direction == up?
//!                 │                          ├─ yes ─► send_to_parent (ForwardedUp)
//!                 ▼                          └─ no ──┐
//!   deliver (local dispatch unless echo) ◄───────────┘
//!                 │
//!                 ▼
//!   fan_out to current children (child_group filter)
//! ```
//!
//! ## Rules
//! - Only the root converts `up` into `down`; a `down` envelope is never sent upward.
//! - Inbound `up` from the parent and inbound `down` from a child are dropped.
//! - The namespaced event name is never recomputed here.
//! - Echo check: `suppress_self_echo` and `root_accepts_own` are independent switches.
//! - Transport failures are traced and swallowed.
//! - A panicking local listener is traced as `HandlerPanicked`; fan-out still happens.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::envelope::{Direction, EventEnvelope};
use crate::error::TransportError;
use crate::events::{panic_message, Bus, Event, EventKind};
use crate::identity::ConnectorIdentity;
use crate::listeners::{CaptureMode, Handler, ListenerRegistry, LocalDispatch, Target};
use crate::transport::{ChildRef, ContextId, Inbound, Origin, Transport};

/// Live state of one initialized connector.
pub(crate) struct Endpoint {
    identity: ConnectorIdentity,
    is_root: bool,
    cfg: Config,
    context: ContextId,
    target: Target,
    transport: Arc<dyn Transport>,
    dispatch: Arc<dyn LocalDispatch>,
    registry: Mutex<ListenerRegistry>,
    bus: Bus,
}

impl Endpoint {
    pub(crate) fn new(
        cfg: Config,
        is_root: bool,
        transport: Arc<dyn Transport>,
        dispatch: Arc<dyn LocalDispatch>,
        bus: Bus,
    ) -> Self {
        Self {
            identity: ConnectorIdentity::resolve(&cfg),
            is_root,
            context: transport.context_id(),
            target: Target::document(),
            registry: Mutex::new(ListenerRegistry::new(dispatch.clone())),
            cfg,
            transport,
            dispatch,
            bus,
        }
    }

    pub(crate) fn identity(&self) -> &ConnectorIdentity {
        &self.identity
    }

    pub(crate) fn is_root(&self) -> bool {
        self.is_root
    }

    pub(crate) fn has_children(&self) -> bool {
        !self.transport.children().is_empty()
    }

    pub(crate) fn config(&self) -> &Config {
        &self.cfg
    }

    pub(crate) fn bus(&self) -> &Bus {
        &self.bus
    }

    pub(crate) fn context(&self) -> ContextId {
        self.context
    }

    // ---------------------------
    // Listeners
    // ---------------------------

    /// Installs `handler` for the raw `event_name` on the document target,
    /// replacing any previous one.
    pub(crate) fn subscribe(&self, event_name: &str, handler: Handler) {
        self.subscribe_on(self.target.clone(), event_name, handler, CaptureMode::Bubble);
    }

    /// Installs `handler` on an explicit target and capture mode.
    ///
    /// Routed envelopes are dispatched on the document target only.
    pub(crate) fn subscribe_on(
        &self,
        target: Target,
        event_name: &str,
        handler: Handler,
        capture: CaptureMode,
    ) {
        let name = self.identity.derive_event_name(event_name);
        let replaced = self.registry().replace(target, &name, handler, capture);
        debug!(event = %name, context = %self.context, replaced, "[connector] subscribed");
        self.bus.publish(
            Event::new(EventKind::Subscribed)
                .with_event_name(name)
                .with_context(self.context)
                .with_count(replaced),
        );
    }

    /// Removes every handler for the raw `event_name`.
    pub(crate) fn unsubscribe(&self, event_name: &str) -> usize {
        let name = self.identity.derive_event_name(event_name);
        let removed = self.registry().remove_all(&self.target, &name);
        debug!(event = %name, context = %self.context, removed, "[connector] unsubscribed");
        self.bus.publish(
            Event::new(EventKind::Unsubscribed)
                .with_event_name(name)
                .with_context(self.context)
                .with_count(removed),
        );
        removed
    }

    /// Active registrations for the raw `event_name`.
    pub(crate) fn subscription_count(&self, event_name: &str) -> usize {
        let name = self.identity.derive_event_name(event_name);
        self.registry().count(&self.target, &name)
    }

    /// Detaches every listener this endpoint installed.
    pub(crate) fn clear(&self) -> usize {
        self.registry().clear()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, ListenerRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---------------------------
    // Propagation
    // ---------------------------

    /// Stamps a new envelope for a local publish and routes it.
    pub(crate) fn publish(&self, event_name: &str, payload: Value) {
        let envelope = EventEnvelope::new(&self.identity, event_name, payload);
        trace!(event = %envelope.event_name, context = %self.context, "[connector] published");
        self.bus.publish(self.event(EventKind::Published, &envelope));
        self.route(envelope);
    }

    /// Entry point for messages drained from the transport inbox.
    pub(crate) fn on_inbound(&self, inbound: Inbound) {
        let envelope = match EventEnvelope::from_wire(inbound.message) {
            Ok(env) => env,
            Err(rejection) => {
                trace!(
                    context = %self.context,
                    reason = rejection.as_label(),
                    "[connector] dropped inbound message"
                );
                self.drop_inbound(rejection.as_label());
                return;
            }
        };

        match (inbound.origin, envelope.direction) {
            (Origin::Parent, Direction::Up) => {
                self.drop_inbound("upward_from_parent");
                return;
            }
            (Origin::Child(_), Direction::Down) => {
                self.drop_inbound("downward_from_child");
                return;
            }
            _ => {}
        }

        if let Some(raw) = self.identity.raw_event_name(&envelope.event_name) {
            trace!(
                event = raw,
                context = %self.context,
                origin = ?inbound.origin,
                "[connector] inbound envelope"
            );
        }
        self.route(envelope);
    }

    /// The state machine shared by local publishes and inbound envelopes.
    fn route(&self, mut envelope: EventEnvelope) {
        if self.is_root && envelope.direction == Direction::Up {
            envelope.direction = Direction::Down;
            self.bus.publish(self.event(EventKind::DirectionFlipped, &envelope));
        }

        match envelope.direction {
            Direction::Up => self.forward_up(&envelope),
            Direction::Down => {
                self.deliver(&envelope);
                self.fan_out(&envelope);
            }
        }
    }

    fn forward_up(&self, envelope: &EventEnvelope) {
        match self.transport.send_to_parent(envelope.to_wire()) {
            Ok(()) => {
                debug!(
                    event = %envelope.event_name,
                    context = %self.context,
                    "[connector] forwarded to parent"
                );
                self.bus.publish(self.event(EventKind::ForwardedUp, envelope));
            }
            Err(e) => self.delivery_failed(envelope, None, e),
        }
    }

    /// Local dispatch. A panicking listener is traced and routing goes on.
    fn deliver(&self, envelope: &EventEnvelope) {
        if self.is_own_echo(envelope) {
            trace!(
                event = %envelope.event_name,
                context = %self.context,
                "[connector] echo suppressed"
            );
            self.bus.publish(self.event(EventKind::EchoSuppressed, envelope));
            return;
        }

        let dispatched = catch_unwind(AssertUnwindSafe(|| {
            self.dispatch.dispatch(&self.target, &envelope.event_name, &envelope.payload)
        }));
        match dispatched {
            Ok(invoked) => {
                debug!(
                    event = %envelope.event_name,
                    context = %self.context,
                    invoked,
                    "[connector] dispatched"
                );
                self.bus.publish(self.event(EventKind::Dispatched, envelope).with_count(invoked));
            }
            Err(panic_err) => {
                let info = panic_message(&*panic_err);
                warn!(
                    event = %envelope.event_name,
                    context = %self.context,
                    info = %info,
                    "[connector] listener panicked"
                );
                let ev = self.event(EventKind::HandlerPanicked, envelope).with_reason(info);
                self.bus.publish(ev);
            }
        }
    }

    fn fan_out(&self, envelope: &EventEnvelope) {
        let children = self.transport.children();
        if children.is_empty() {
            return;
        }

        let wire = envelope.to_wire();
        let group = self.cfg.child_group_filter();
        let mut reached = 0;
        for child in children.iter().filter(|c| accepts(c, group)) {
            match self.transport.send_to_child(child, wire.clone()) {
                Ok(()) => reached += 1,
                Err(e) => self.delivery_failed(envelope, Some(child.id()), e),
            }
        }

        debug!(
            event = %envelope.event_name,
            context = %self.context,
            reached,
            "[connector] fanned out"
        );
        self.bus.publish(self.event(EventKind::FannedOut, envelope).with_count(reached));
    }

    /// Identity-based echo check, relaxed for the root by `root_accepts_own`.
    fn is_own_echo(&self, envelope: &EventEnvelope) -> bool {
        if !self.cfg.suppress_self_echo || !envelope.is_from(self.identity.key()) {
            return false;
        }
        !(self.is_root && self.cfg.root_accepts_own)
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    fn event(&self, kind: EventKind, envelope: &EventEnvelope) -> Event {
        Event::new(kind)
            .with_event_name(envelope.event_name.as_str())
            .with_context(self.context)
            .with_direction(envelope.direction)
    }

    fn drop_inbound(&self, reason: &'static str) {
        self.bus.publish(
            Event::new(EventKind::ForeignDropped)
                .with_context(self.context)
                .with_reason(reason),
        );
    }

    fn delivery_failed(
        &self,
        envelope: &EventEnvelope,
        peer: Option<ContextId>,
        err: TransportError,
    ) {
        debug!(
            event = %envelope.event_name,
            context = %self.context,
            peer = ?peer,
            error = %err,
            "[connector] message lost"
        );
        let mut ev = self
            .event(EventKind::DeliveryFailed, envelope)
            .with_reason(err.as_label());
        if let Some(id) = peer {
            ev = ev.with_peer(id);
        }
        self.bus.publish(ev);
    }
}

/// Child-group filter: no group configured means every child.
fn accepts(child: &ChildRef, group: Option<&str>) -> bool {
    group.map_or(true, |g| child.has_group(g))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listeners::EventTable;
    use crate::transport::MemoryTransport;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> Handler {
        let c = counter.clone();
        Handler::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn endpoint(transport: Arc<MemoryTransport>, is_root: bool, cfg: Config) -> Endpoint {
        Endpoint::new(cfg, is_root, transport, Arc::new(EventTable::new()), Bus::new(64))
    }

    #[test]
    fn root_publish_dispatches_locally_and_fans_out() {
        let root = Arc::new(MemoryTransport::root());
        let child = root.spawn_child();
        let mut child_inbox = child.take_inbox().unwrap();
        let ep = endpoint(root.clone(), true, Config::default());
        let hits = Arc::new(AtomicUsize::new(0));

        ep.subscribe("ping", counting(&hits));
        ep.publish("ping", json!({ "n": 1 }));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let sent = EventEnvelope::from_wire(child_inbox.try_recv().unwrap().message).unwrap();
        assert_eq!(sent.direction, Direction::Down);
        assert_eq!(sent.event_name, "default.ping");
    }

    #[test]
    fn nested_publish_goes_to_parent_only() {
        let root = MemoryTransport::root();
        let mut root_inbox = root.take_inbox().unwrap();
        let nested = Arc::new(root.spawn_child());
        let ep = endpoint(nested, false, Config::default());
        let hits = Arc::new(AtomicUsize::new(0));

        ep.subscribe("ping", counting(&hits));
        ep.publish("ping", json!({}));

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        let sent = EventEnvelope::from_wire(root_inbox.try_recv().unwrap().message).unwrap();
        assert_eq!(sent.direction, Direction::Up);
    }

    #[test]
    fn nested_relays_upward_traffic_from_children() {
        let root = MemoryTransport::root();
        let mut root_inbox = root.take_inbox().unwrap();
        let mid = Arc::new(root.spawn_child());
        let leaf = mid.spawn_child();
        let ep = endpoint(mid.clone(), false, Config::default());

        let leaf_id = ConnectorIdentity::resolve(&Config::default());
        let wire = EventEnvelope::new(&leaf_id, "ping", json!({})).to_wire();
        ep.on_inbound(Inbound {
            origin: Origin::Child(leaf.id()),
            message: wire.clone(),
        });

        assert_eq!(root_inbox.try_recv().unwrap().message, wire);
    }

    #[test]
    fn own_envelope_is_suppressed_on_nested_but_not_on_root() {
        let cfg = Config {
            key: Some("same".into()),
            ..Config::default()
        };
        let identity = ConnectorIdentity::resolve(&cfg);
        let mut down = EventEnvelope::new(&identity, "ping", json!({}));
        down.direction = Direction::Down;

        let nested = endpoint(Arc::new(MemoryTransport::root().spawn_child()), false, cfg.clone());
        assert!(nested.is_own_echo(&down));

        let root = endpoint(Arc::new(MemoryTransport::root()), true, cfg.clone());
        assert!(!root.is_own_echo(&down));

        let strict_root = endpoint(
            Arc::new(MemoryTransport::root()),
            true,
            Config {
                root_accepts_own: false,
                ..cfg.clone()
            },
        );
        assert!(strict_root.is_own_echo(&down));

        let echo_on = endpoint(
            Arc::new(MemoryTransport::root().spawn_child()),
            false,
            Config {
                suppress_self_echo: false,
                ..cfg
            },
        );
        assert!(!echo_on.is_own_echo(&down));
    }

    #[test]
    fn misdirected_inbound_is_dropped() {
        let root = MemoryTransport::root();
        let nested = Arc::new(root.spawn_child());
        let grandchild = nested.spawn_child();
        let mut root_inbox = root.take_inbox().unwrap();
        let ep = endpoint(nested, false, Config::default());
        let mut trace = ep.bus().subscribe();

        let other = ConnectorIdentity::resolve(&Config::default());
        let up = EventEnvelope::new(&other, "ping", json!({}));
        let mut down = up.clone();
        down.direction = Direction::Down;

        ep.on_inbound(Inbound {
            origin: Origin::Parent,
            message: up.to_wire(),
        });
        ep.on_inbound(Inbound {
            origin: Origin::Child(grandchild.id()),
            message: down.to_wire(),
        });

        assert!(root_inbox.try_recv().is_err());
        assert_eq!(trace.try_recv().unwrap().reason.as_deref(), Some("upward_from_parent"));
        assert_eq!(trace.try_recv().unwrap().reason.as_deref(), Some("downward_from_child"));
    }

    #[test]
    fn child_group_filter_limits_fan_out() {
        let root = Arc::new(MemoryTransport::root());
        let plain = root.spawn_child();
        let widget = root.spawn_child_in(&["widgets"]);
        let mut plain_inbox = plain.take_inbox().unwrap();
        let mut widget_inbox = widget.take_inbox().unwrap();
        let ep = endpoint(
            root,
            true,
            Config {
                child_group: Some("widgets".into()),
                ..Config::default()
            },
        );

        ep.publish("ping", json!({}));
        assert!(plain_inbox.try_recv().is_err());
        assert!(widget_inbox.try_recv().is_ok());
    }

    #[test]
    fn failed_child_delivery_is_traced_not_raised() {
        let root = Arc::new(MemoryTransport::root());
        let gone = root.spawn_child();
        drop(gone.take_inbox());
        let ep = endpoint(root, true, Config::default());
        let mut trace = ep.bus().subscribe();

        ep.publish("ping", json!({}));

        let kinds: Vec<EventKind> = std::iter::from_fn(|| trace.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert!(kinds.contains(&EventKind::DeliveryFailed));
        assert!(kinds.contains(&EventKind::FannedOut));
    }

    #[test]
    fn clear_detaches_all_listeners() {
        let ep = endpoint(Arc::new(MemoryTransport::root()), true, Config::default());
        ep.subscribe("a", Handler::noop());
        ep.subscribe("b", Handler::noop());
        assert_eq!(ep.clear(), 2);
        assert_eq!(ep.subscription_count("a"), 0);
    }

    #[test]
    fn panicking_listener_is_traced_and_fan_out_continues() {
        let root = Arc::new(MemoryTransport::root());
        let child = root.spawn_child();
        let mut child_inbox = child.take_inbox().unwrap();
        let ep = endpoint(root.clone(), true, Config::default());
        let mut trace = ep.bus().subscribe();

        ep.subscribe("ping", Handler::new(|_| panic!("listener failed")));
        ep.publish("ping", json!({}));

        assert!(child_inbox.try_recv().is_ok());
        let panicked = std::iter::from_fn(|| trace.try_recv().ok())
            .find(|e| e.kind == EventKind::HandlerPanicked)
            .unwrap();
        assert_eq!(panicked.reason.as_deref(), Some("listener failed"));
    }
}

