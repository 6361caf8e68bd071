//! # Connector: the public handle of one context.
//!
//! A [`Connector`] is created empty and becomes usable after exactly one call
//! to [`init`](Connector::init). It replaces a process-wide singleton: the
//! caller owns the handle and passes it to whatever code needs to publish or
//! subscribe, so several isolated connectors can coexist (one per context in
//! tests).
//!
//! ## Lifecycle
//! ```text
//! Connector::new(transport, dispatch)
//!     │  subscribe / notification ──► Err(NotInitialized)
//!     ▼
//! init(role, config)
//!     ├─► resolve identity + role (once)
//!     ├─► take transport inbox ──► spawn inbound listener
//!     └─► spawn trace forwarder (if subscribers were given)
//!     │  subscribe / notification ──► Ok
//!     │  init again ──► Err(AlreadyInitialized)
//!     ▼
//! shutdown()
//!     ├─► cancel listener + forwarder
//!     ├─► detach every listener
//!     └─► subscribe / notification ──► Err(ShutDown)
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use frame_connector::{Config, Connector, EventTable, MemoryTransport};
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = Connector::new(
//!         Arc::new(MemoryTransport::root()),
//!         Arc::new(EventTable::new()),
//!     );
//!     connector.init("root", Config::default())?;
//!
//!     connector.subscribe("ping", |payload| println!("got {payload}"))?;
//!     connector.notification("ping", json!({ "n": 1 }))?;
//!
//!     connector.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::endpoint::Endpoint;
use super::listener::{spawn_forwarder, spawn_inbound};
use super::role::Role;
use crate::config::Config;
use crate::error::ConnectorError;
use crate::events::{Bus, Event};
use crate::identity::ConnectorIdentity;
use crate::listeners::{CaptureMode, Handler, LocalDispatch, Target};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::transport::Transport;

/// State created by `init`.
struct Runtime {
    endpoint: Arc<Endpoint>,
    role: Role,
    token: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    subscribers: Mutex<Option<Arc<SubscriberSet>>>,
}

/// Public handle of one context.
pub struct Connector {
    transport: Arc<dyn Transport>,
    dispatch: Arc<dyn LocalDispatch>,
    pending_subscribers: Mutex<Vec<Arc<dyn Subscribe>>>,
    runtime: OnceLock<Runtime>,
    closed: AtomicBool,
}

impl Connector {
    /// Creates an uninitialized connector over the given collaborators.
    pub fn new(transport: Arc<dyn Transport>, dispatch: Arc<dyn LocalDispatch>) -> Self {
        Self {
            transport,
            dispatch,
            pending_subscribers: Mutex::new(Vec::new()),
            runtime: OnceLock::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Starts a builder for a connector with trace subscribers.
    pub fn builder(
        transport: Arc<dyn Transport>,
        dispatch: Arc<dyn LocalDispatch>,
    ) -> ConnectorBuilder {
        ConnectorBuilder::new(transport, dispatch)
    }

    /// Initializes the connector with a role name (`"root"`, `"nested"`, `"auto"`).
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    /// - [`ConnectorError::UnknownRole`] if `role` names no strategy.
    /// - [`ConnectorError::AlreadyInitialized`] on a second call, or if another
    ///   connector already owns the transport inbox.
    pub fn init(&self, role: &str, cfg: Config) -> Result<(), ConnectorError> {
        let role: Role = role.parse()?;
        self.init_role(role, cfg)
    }

    /// Typed form of [`init`](Self::init).
    pub fn init_role(&self, role: Role, cfg: Config) -> Result<(), ConnectorError> {
        if self.runtime.get().is_some() || self.closed.load(Ordering::Acquire) {
            return Err(ConnectorError::AlreadyInitialized);
        }
        let inbox = self
            .transport
            .take_inbox()
            .ok_or(ConnectorError::AlreadyInitialized)?;

        let is_root = role.is_root(self.transport.has_parent());
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let endpoint = Arc::new(Endpoint::new(
            cfg,
            is_root,
            self.transport.clone(),
            self.dispatch.clone(),
            bus.clone(),
        ));
        let token = CancellationToken::new();

        let mut tasks = Vec::with_capacity(2);
        let subs = std::mem::take(
            &mut *self
                .pending_subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let subscribers = if subs.is_empty() {
            None
        } else {
            let set = Arc::new(SubscriberSet::new(subs, bus));
            tasks.push(spawn_forwarder(&endpoint, set.clone(), token.clone()));
            Some(set)
        };
        tasks.push(spawn_inbound(endpoint.clone(), inbox, token.clone()));

        info!(
            context = %endpoint.context(),
            role = %role,
            is_root,
            key = endpoint.identity().key(),
            group = endpoint.identity().group_key(),
            "[connector] initialized"
        );

        let runtime = Runtime {
            endpoint,
            role,
            token,
            tasks: Mutex::new(tasks),
            subscribers: Mutex::new(subscribers),
        };
        if let Err(lost) = self.runtime.set(runtime) {
            lost.token.cancel();
            return Err(ConnectorError::AlreadyInitialized);
        }
        Ok(())
    }

    /// Subscribes `handler` to `event_name`, replacing any earlier handler for it.
    ///
    /// # Errors
    /// [`ConnectorError::NotInitialized`], [`ConnectorError::MissingEventName`].
    pub fn subscribe<F>(&self, event_name: &str, handler: F) -> Result<(), ConnectorError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe_with(event_name, Some(Handler::new(handler)))
    }

    /// Subscribes an optional handler.
    ///
    /// With `handler = None`, fails with [`ConnectorError::MissingHandler`] when
    /// `Config::require_handler` is set; otherwise installs a no-op listener.
    pub fn subscribe_with(
        &self,
        event_name: &str,
        handler: Option<Handler>,
    ) -> Result<(), ConnectorError> {
        let endpoint = self.endpoint()?;
        require_name(event_name)?;
        let handler = match handler {
            Some(h) => h,
            None if endpoint.config().require_handler => {
                return Err(ConnectorError::MissingHandler)
            }
            None => Handler::noop(),
        };
        endpoint.subscribe(event_name, handler);
        Ok(())
    }

    /// Subscribes on an explicit [`Target`] with the given [`CaptureMode`].
    ///
    /// Envelopes from the hierarchy are dispatched on [`Target::document`];
    /// listeners on other targets only see what the host dispatches there.
    pub fn subscribe_on<F>(
        &self,
        target: Target,
        event_name: &str,
        capture: CaptureMode,
        handler: F,
    ) -> Result<(), ConnectorError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let endpoint = self.endpoint()?;
        require_name(event_name)?;
        endpoint.subscribe_on(target, event_name, Handler::new(handler), capture);
        Ok(())
    }

    /// Removes the handler for `event_name`. Returns how many were removed.
    pub fn unsubscribe(&self, event_name: &str) -> Result<usize, ConnectorError> {
        let endpoint = self.endpoint()?;
        require_name(event_name)?;
        Ok(endpoint.unsubscribe(event_name))
    }

    /// Publishes `payload` under `event_name` to every connected context.
    ///
    /// A `null` payload is sent as an empty object.
    ///
    /// # Errors
    /// [`ConnectorError::NotInitialized`], [`ConnectorError::MissingEventName`].
    pub fn notification(&self, event_name: &str, payload: Value) -> Result<(), ConnectorError> {
        let endpoint = self.endpoint()?;
        require_name(event_name)?;
        endpoint.publish(event_name, payload);
        Ok(())
    }

    /// Alias of [`notification`](Self::notification).
    pub fn publish(&self, event_name: &str, payload: Value) -> Result<(), ConnectorError> {
        self.notification(event_name, payload)
    }

    /// Serializes `payload` and publishes it.
    pub fn publish_json<T>(&self, event_name: &str, payload: &T) -> Result<(), ConnectorError>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(payload)?;
        self.notification(event_name, value)
    }

    /// Identity resolved at `init`.
    pub fn identity(&self) -> Result<&ConnectorIdentity, ConnectorError> {
        Ok(self.runtime()?.endpoint.identity())
    }

    /// Role passed to `init`.
    pub fn role(&self) -> Result<Role, ConnectorError> {
        Ok(self.runtime()?.role)
    }

    /// True if this context converts upward traffic into fan-out.
    pub fn is_root(&self) -> Result<bool, ConnectorError> {
        Ok(self.runtime()?.endpoint.is_root())
    }

    /// True if the transport currently reports child contexts.
    pub fn has_children(&self) -> Result<bool, ConnectorError> {
        Ok(self.runtime()?.endpoint.has_children())
    }

    /// Active registrations for `event_name` (0 or 1 through the subscribe path).
    pub fn subscription_count(&self, event_name: &str) -> Result<usize, ConnectorError> {
        Ok(self.endpoint()?.subscription_count(event_name))
    }

    /// New receiver of trace events published after this call.
    pub fn trace(&self) -> Result<broadcast::Receiver<Event>, ConnectorError> {
        Ok(self.runtime()?.endpoint.bus().subscribe())
    }

    /// Stops background tasks and detaches every listener.
    ///
    /// Idempotent. After shutdown every API call fails with [`ConnectorError::ShutDown`].
    /// Before `init` this is a no-op.
    pub async fn shutdown(&self) {
        let Some(rt) = self.runtime.get() else {
            return;
        };
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        rt.token.cancel();
        let removed = rt.endpoint.clear();

        let tasks: Vec<JoinHandle<()>> =
            std::mem::take(&mut *rt.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for h in tasks {
            if let Err(e) = h.await {
                warn!(context = %rt.endpoint.context(), error = %e, "[connector] task failed");
            }
        }

        let subscribers = rt
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(set) = subscribers.and_then(|s| Arc::try_unwrap(s).ok()) {
            set.shutdown().await;
        }

        info!(context = %rt.endpoint.context(), removed, "[connector] shut down");
    }

    fn runtime(&self) -> Result<&Runtime, ConnectorError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnectorError::ShutDown);
        }
        self.runtime.get().ok_or(ConnectorError::NotInitialized)
    }

    fn endpoint(&self) -> Result<&Endpoint, ConnectorError> {
        Ok(self.runtime()?.endpoint.as_ref())
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        if let Some(rt) = self.runtime.get() {
            rt.token.cancel();
        }
    }
}

fn require_name(event_name: &str) -> Result<(), ConnectorError> {
    if event_name.is_empty() {
        return Err(ConnectorError::MissingEventName);
    }
    Ok(())
}

/// Builder for a [`Connector`] with optional trace subscribers.
pub struct ConnectorBuilder {
    transport: Arc<dyn Transport>,
    dispatch: Arc<dyn LocalDispatch>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ConnectorBuilder {
    pub fn new(transport: Arc<dyn Transport>, dispatch: Arc<dyn LocalDispatch>) -> Self {
        Self {
            transport,
            dispatch,
            subscribers: Vec::new(),
        }
    }

    /// Sets trace subscribers. Their workers start at `init`.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    pub fn build(self) -> Connector {
        let connector = Connector::new(self.transport, self.dispatch);
        *connector
            .pending_subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = self.subscribers;
        connector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listeners::EventTable;
    use crate::transport::MemoryTransport;
    use serde_json::json;

    fn root_connector() -> Connector {
        Connector::new(Arc::new(MemoryTransport::root()), Arc::new(EventTable::new()))
    }

    #[tokio::test]
    async fn api_fails_before_init() {
        let c = root_connector();
        assert!(matches!(c.subscribe("ping", |_| {}), Err(ConnectorError::NotInitialized)));
        assert!(matches!(
            c.notification("ping", json!({})),
            Err(ConnectorError::NotInitialized)
        ));
        assert!(matches!(c.identity(), Err(ConnectorError::NotInitialized)));
    }

    #[tokio::test]
    async fn unknown_role_is_rejected_and_init_can_retry() {
        let c = root_connector();
        assert!(matches!(
            c.init("sidebar", Config::default()),
            Err(ConnectorError::UnknownRole { .. })
        ));
        c.init("root", Config::default()).unwrap();
        assert!(matches!(
            c.init("root", Config::default()),
            Err(ConnectorError::AlreadyInitialized)
        ));
    }

    #[tokio::test]
    async fn empty_event_name_is_rejected() {
        let c = root_connector();
        c.init("root", Config::default()).unwrap();
        assert!(matches!(c.subscribe("", |_| {}), Err(ConnectorError::MissingEventName)));
        assert!(matches!(
            c.notification("", json!({})),
            Err(ConnectorError::MissingEventName)
        ));
        assert!(matches!(c.unsubscribe(""), Err(ConnectorError::MissingEventName)));
    }

    #[tokio::test]
    async fn missing_handler_follows_config() {
        let strict = root_connector();
        strict.init("root", Config::default()).unwrap();
        assert!(matches!(
            strict.subscribe_with("ping", None),
            Err(ConnectorError::MissingHandler)
        ));

        let lenient = root_connector();
        lenient
            .init(
                "root",
                Config {
                    require_handler: false,
                    ..Config::default()
                },
            )
            .unwrap();
        lenient.subscribe_with("ping", None).unwrap();
        assert_eq!(lenient.subscription_count("ping").unwrap(), 1);
    }

    #[tokio::test]
    async fn second_connector_on_same_transport_is_rejected() {
        let transport = Arc::new(MemoryTransport::root());
        let a = Connector::new(transport.clone(), Arc::new(EventTable::new()));
        let b = Connector::new(transport, Arc::new(EventTable::new()));
        a.init("root", Config::default()).unwrap();
        assert!(matches!(
            b.init("root", Config::default()),
            Err(ConnectorError::AlreadyInitialized)
        ));
    }

    #[tokio::test]
    async fn auto_role_resolves_from_transport() {
        let root_t = MemoryTransport::root();
        let child_t = root_t.spawn_child();

        let root = Connector::new(Arc::new(root_t), Arc::new(EventTable::new()));
        let child = Connector::new(Arc::new(child_t), Arc::new(EventTable::new()));
        root.init("auto", Config::default()).unwrap();
        child.init("auto", Config::default()).unwrap();

        assert!(root.is_root().unwrap());
        assert!(root.has_children().unwrap());
        assert!(!child.is_root().unwrap());
        assert_eq!(child.role().unwrap(), Role::Auto);
    }

    #[tokio::test]
    async fn shutdown_detaches_and_closes() {
        let table = Arc::new(EventTable::new());
        let c = Connector::new(Arc::new(MemoryTransport::root()), table.clone());
        c.init("root", Config::default()).unwrap();
        c.subscribe("a", |_| {}).unwrap();
        c.subscribe("b", |_| {}).unwrap();
        assert_eq!(table.total(), 2);

        c.shutdown().await;
        assert_eq!(table.total(), 0);
        assert!(matches!(c.notification("a", json!({})), Err(ConnectorError::ShutDown)));
        assert!(matches!(
            c.init("root", Config::default()),
            Err(ConnectorError::AlreadyInitialized)
        ));
        c.shutdown().await;
    }

    #[tokio::test]
    async fn publish_json_serializes_payload() {
        #[derive(Serialize)]
        struct Ping {
            n: u32,
        }

        let c = root_connector();
        c.init("root", Config::default()).unwrap();
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        c.subscribe("ping", move |v| *s.lock().unwrap() = Some(v.clone()))
            .unwrap();
        c.publish_json("ping", &Ping { n: 7 }).unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(json!({ "n": 7 })));
    }

    #[tokio::test]
    async fn subscribe_on_uses_explicit_target() {
        let table = Arc::new(EventTable::new());
        let c = Connector::new(Arc::new(MemoryTransport::root()), table.clone());
        c.init("root", Config::default()).unwrap();

        let hits = Arc::new(Mutex::new(0));
        let h = hits.clone();
        c.subscribe_on(Target::new("panel"), "ping", CaptureMode::Capture, move |_| {
            *h.lock().unwrap() += 1;
        })
        .unwrap();

        c.notification("ping", json!({})).unwrap();
        assert_eq!(*hits.lock().unwrap(), 0);

        let invoked = table.dispatch(&Target::new("panel"), "default.ping", &json!({}));
        assert_eq!(invoked, 1);
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn shutdown_before_init_leaves_connector_usable() {
        let c = root_connector();
        c.shutdown().await;
        c.init("root", Config::default()).unwrap();
        c.notification("ping", json!({})).unwrap();
    }
}

