//! # frame-connector
//!
//! **frame-connector** is a cross-context publish/subscribe library.
//!
//! Code running in different contexts of a parent/child hierarchy (a top-level
//! document and its nested frames, or any tree of addressable mailboxes)
//! exchanges named events without holding references to each other. The
//! hierarchy is the only channel.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                       ┌───────────────────────────┐
//!                       │  root context (Role::Root)│
//!                       │  up ──► down conversion   │
//!                       └─────┬───────────────┬─────┘
//!                  down ▲     │ down     down │    ▲ up
//!                       │     ▼               ▼    │
//!              ┌────────┴──────────┐   ┌───────────┴───────┐
//!              │ nested context A  │   │ nested context B  │
//!              │ dispatch + relay  │   │ dispatch + relay  │
//!              └────────┬──────────┘   └───────────────────┘
//!                       │ down ▲ up
//!                       ▼      │
//!              ┌───────────────┴───┐
//!              │ nested context A1 │
//!              └───────────────────┘
//! ```
//!
//! ### Propagation
//! ```text
//! notification(name, payload)
//!   └─► EventEnvelope { eventName: "{group}.{name}", senderKey, direction: up }
//!         ├─ nested: send_to_parent ─► ... ─► root
//!         └─ root:   direction := down
//!                     ├─► local dispatch (LocalDispatch)
//!                     └─► send_to_child(each child) ─► dispatch + relay ─► ...
//! ```
//! An envelope climbs to the root at most once and descends at most once;
//! nested contexts skip local dispatch of envelopes they published themselves.
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Connector**     | `init` / `subscribe` / `notification` / `shutdown`           | [`Connector`], [`Role`]                    |
//! | **Listeners**     | Local dispatch seam and detach-before-attach bookkeeping     | [`LocalDispatch`], [`ListenerRegistry`]    |
//! | **Transport**     | Parent/child message channels                                | [`Transport`], [`MemoryTransport`]         |
//! | **Wire**          | Envelope shape shared by every context                       | [`EventEnvelope`], [`Direction`]           |
//! | **Tracing**       | Routing decisions as events, pluggable subscribers           | [`Event`], [`Subscribe`], [`SubscriberSet`]|
//! | **Errors**        | Typed API and transport errors                               | [`ConnectorError`], [`TransportError`]     |
//! | **Configuration** | Identity, namespacing, echo and fan-out policy               | [`Config`]                                 |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a trace subscriber writing through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use frame_connector::{Config, Connector, EventTable, MemoryTransport};
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let top = MemoryTransport::root();
//!     let frame = top.spawn_child();
//!
//!     let root = Connector::new(Arc::new(top), Arc::new(EventTable::new()));
//!     let nested = Connector::new(Arc::new(frame), Arc::new(EventTable::new()));
//!     root.init("root", Config::default())?;
//!     nested.init("nested", Config::default())?;
//!
//!     root.subscribe("cart.updated", |payload| println!("root saw {payload}"))?;
//!     nested.notification("cart.updated", json!({ "items": 3 }))?;
//!
//!     // Delivery is asynchronous: let the root's listener run.
//!     tokio::time::sleep(Duration::from_millis(10)).await;
//!
//!     nested.shutdown().await;
//!     root.shutdown().await;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod envelope;
mod error;
mod events;
mod identity;
mod listeners;
mod subscribers;
mod transport;

// ---- Public re-exports ----

pub use crate::core::{Connector, ConnectorBuilder, Role};
pub use config::{Config, DEFAULT_BUS_CAPACITY, DEFAULT_GROUP_KEY};
pub use envelope::{Direction, EventEnvelope, Rejection, LIBRARY_TAG};
pub use error::{ConnectorError, TransportError};
pub use events::{Bus, Event, EventKind};
pub use identity::ConnectorIdentity;
pub use listeners::{CaptureMode, EventTable, Handler, ListenerRegistry, LocalDispatch, Target};
pub use subscribers::{Subscribe, SubscriberSet};
pub use transport::{ChildRef, ContextId, Inbound, Inbox, MemoryTransport, Origin, Transport};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
