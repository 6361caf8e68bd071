//! Error types used by the connector and its transports.
//!
//! This module defines two error enums:
//!
//! - [`ConnectorError`]: errors raised synchronously to the caller of the public API.
//! - [`TransportError`]: delivery failures reported by a [`Transport`](crate::Transport).
//!
//! Transport errors never reach API callers: the connector logs them and treats
//! the message as lost. Both types provide `as_label` for logs/trace events.

use thiserror::Error;

/// # Errors produced by the connector API.
///
/// All variants are raised at the point of the offending call; none are retried
/// or recovered internally.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// `subscribe` / `notification` called with an empty event name.
    #[error("event name is missing")]
    MissingEventName,

    /// `subscribe` called without a handler while handlers are required.
    #[error("handler is missing")]
    MissingHandler,

    /// The API was used before [`Connector::init`](crate::Connector::init).
    #[error("connector is not initialized; call init first")]
    NotInitialized,

    /// `init` was called a second time on the same connector.
    #[error("connector is already initialized")]
    AlreadyInitialized,

    /// The connector was shut down; it is never re-created.
    #[error("connector has been shut down")]
    ShutDown,

    /// `init` was called with a role that does not name a known strategy.
    #[error("unknown connector role: {role:?}")]
    UnknownRole {
        /// The rejected role string.
        role: String,
    },

    /// A typed payload could not be converted into a structured value.
    #[error("payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),
}

impl ConnectorError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use frame_connector::ConnectorError;
    ///
    /// let err = ConnectorError::UnknownRole { role: "sidebar".into() };
    /// assert_eq!(err.as_label(), "unknown_role");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConnectorError::MissingEventName => "missing_event_name",
            ConnectorError::MissingHandler => "missing_handler",
            ConnectorError::NotInitialized => "not_initialized",
            ConnectorError::AlreadyInitialized => "already_initialized",
            ConnectorError::ShutDown => "shut_down",
            ConnectorError::UnknownRole { .. } => "unknown_role",
            ConnectorError::Payload(_) => "payload_invalid",
        }
    }
}

/// # Errors produced by a transport when a message cannot be handed off.
///
/// These are informational: the sender never retries.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// This context has no parent to forward to.
    #[error("context has no parent")]
    NoParent,

    /// The target context was removed from the hierarchy.
    #[error("target context detached")]
    Detached,

    /// The target context no longer reads its inbox.
    #[error("target inbox closed")]
    Closed,
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::NoParent => "no_parent",
            TransportError::Detached => "detached",
            TransportError::Closed => "inbox_closed",
        }
    }
}
