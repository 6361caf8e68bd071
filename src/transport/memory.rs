//! # In-process transport built from Tokio channels.
//!
//! Every context owns an unbounded mpsc inbox. A child keeps a sender to its
//! parent's inbox; a parent keeps a list of links to its children's inboxes.
//! Unbounded mpsc preserves FIFO per sender, which is the only ordering the
//! protocol relies on.
//!
//! ```rust
//! use frame_connector::{MemoryTransport, Transport};
//!
//! let root = MemoryTransport::root();
//! let child = root.spawn_child();
//! let widget = root.spawn_child_in(&["widgets"]);
//!
//! assert!(!root.has_parent());
//! assert!(child.has_parent());
//! assert_eq!(root.children().len(), 2);
//! assert!(root.children()[1].has_group("widgets"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use serde_json::Value;
use tokio::sync::mpsc;

use super::{ChildRef, ContextId, Inbound, Inbox, Origin, Transport};
use crate::error::TransportError;

/// Process-wide context id allocator.
static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

struct ChildLink {
    child: ChildRef,
    tx: mpsc::UnboundedSender<Inbound>,
}

/// One context of an in-memory hierarchy.
pub struct MemoryTransport {
    id: ContextId,
    inbox_tx: mpsc::UnboundedSender<Inbound>,
    inbox_rx: Mutex<Option<Inbox>>,
    parent: Option<mpsc::UnboundedSender<Inbound>>,
    children: RwLock<Vec<ChildLink>>,
}

impl MemoryTransport {
    /// Creates a context with no parent.
    pub fn root() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<mpsc::UnboundedSender<Inbound>>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            id: ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)),
            inbox_tx,
            inbox_rx: Mutex::new(Some(inbox_rx)),
            parent,
            children: RwLock::new(Vec::new()),
        }
    }

    /// Creates a child context nested under this one.
    pub fn spawn_child(&self) -> Self {
        self.spawn_child_in(&[])
    }

    /// Creates a child context tagged with the given group markers.
    pub fn spawn_child_in(&self, groups: &[&str]) -> Self {
        let child = Self::with_parent(Some(self.inbox_tx.clone()));
        let link = ChildLink {
            child: ChildRef::new(child.id, groups.iter().map(|g| g.to_string()).collect()),
            tx: child.inbox_tx.clone(),
        };
        self.children
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(link);
        child
    }

    /// Detaches a child from this context. Later sends to it fail with
    /// [`TransportError::Detached`].
    pub fn remove_child(&self, id: ContextId) -> bool {
        let mut children = self.children.write().unwrap_or_else(PoisonError::into_inner);
        let before = children.len();
        children.retain(|link| link.child.id() != id);
        children.len() != before
    }

    /// Delivers a message to this context's own inbox as if it came from `origin`.
    ///
    /// Useful for modelling unrelated traffic sharing the channel.
    pub fn inject(&self, origin: Origin, message: Value) -> Result<(), TransportError> {
        self.inbox_tx
            .send(Inbound { origin, message })
            .map_err(|_| TransportError::Closed)
    }

    pub fn id(&self) -> ContextId {
        self.id
    }
}

impl Transport for MemoryTransport {
    fn context_id(&self) -> ContextId {
        self.id
    }

    fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    fn send_to_parent(&self, message: Value) -> Result<(), TransportError> {
        let parent = self.parent.as_ref().ok_or(TransportError::NoParent)?;
        parent
            .send(Inbound {
                origin: Origin::Child(self.id),
                message,
            })
            .map_err(|_| TransportError::Closed)
    }

    fn children(&self) -> Vec<ChildRef> {
        self.children
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|link| link.child.clone())
            .collect()
    }

    fn send_to_child(&self, child: &ChildRef, message: Value) -> Result<(), TransportError> {
        let tx = {
            let children = self.children.read().unwrap_or_else(PoisonError::into_inner);
            children
                .iter()
                .find(|link| link.child.id() == child.id())
                .map(|link| link.tx.clone())
                .ok_or(TransportError::Detached)?
        };
        tx.send(Inbound {
            origin: Origin::Parent,
            message,
        })
        .map_err(|_| TransportError::Closed)
    }

    fn take_inbox(&self) -> Option<Inbox> {
        self.inbox_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
