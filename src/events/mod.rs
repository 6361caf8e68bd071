//! Trace events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] routing-decision classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the connector endpoint (every route/dispatch decision),
//!   the inbound listener (on exit), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the connector's subscriber forwarder (fans out to
//!   `SubscriberSet`) and anyone holding a receiver from [`Connector::trace`](crate::Connector::trace).

mod bus;
mod event;

pub use bus::Bus;
pub(crate) use event::panic_message;
pub use event::{Event, EventKind};
