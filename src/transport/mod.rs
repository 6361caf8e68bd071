//! # Transport collaborator: parent/child addressable channels.
//!
//! The connector never knows how contexts are connected. It only needs to:
//! - forward a structured message to its parent,
//! - enumerate its current children and send each of them a message,
//! - drain one inbox of messages addressed to it.
//!
//! ```text
//!               ┌──────────────┐
//!               │   root ctx   │◄──── send_to_parent (origin = Child(id))
//!               └──┬────────┬──┘
//!   send_to_child  │        │  send_to_child (origin = Parent)
//!                  ▼        ▼
//!           ┌──────────┐ ┌──────────┐
//!           │ child A  │ │ child B  │ ...
//!           └──────────┘ └──────────┘
//! ```
//!
//! Delivery is asynchronous and best-effort. A send that fails returns a
//! [`TransportError`]; the connector logs it and moves on.
//!
//! [`MemoryTransport`] is the in-process implementation.

mod memory;

use std::fmt;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::TransportError;

pub use memory::MemoryTransport;

/// Identifier of one context inside a hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Who handed a message to this context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Parent,
    Child(ContextId),
    /// Anything not part of the hierarchy (same-context scripts, tests).
    External,
}

/// One message arriving at a context.
#[derive(Clone, Debug)]
pub struct Inbound {
    pub origin: Origin,
    pub message: Value,
}

/// Receiving end of a context's inbound messages.
pub type Inbox = mpsc::UnboundedReceiver<Inbound>;

/// Handle to a child context as seen by its parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildRef {
    id: ContextId,
    groups: Vec<String>,
}

impl ChildRef {
    pub fn new(id: ContextId, groups: Vec<String>) -> Self {
        Self { id, groups }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Group markers the child is tagged with.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

/// Structured-message channel between a context, its parent and its children.
pub trait Transport: Send + Sync + 'static {
    /// Identifier of the context this transport belongs to.
    fn context_id(&self) -> ContextId;

    /// True if the context sits below another one.
    fn has_parent(&self) -> bool;

    /// Sends `message` to the parent context.
    fn send_to_parent(&self, message: Value) -> Result<(), TransportError>;

    /// Current child contexts. Enumerated fresh on every call.
    fn children(&self) -> Vec<ChildRef>;

    /// Sends `message` to one child context.
    fn send_to_child(&self, child: &ChildRef, message: Value) -> Result<(), TransportError>;

    /// Hands out the inbox. Returns `None` once it has been taken.
    fn take_inbox(&self) -> Option<Inbox>;
}
