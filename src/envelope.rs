//! # Event envelope: the unit that travels between contexts.
//!
//! An [`EventEnvelope`] is created once per published event, stamped with the
//! publisher's identity, and then relayed unchanged through the hierarchy. The
//! only field that ever changes in transit is [`Direction`], and only at the root.
//!
//! ## Wire shape
//! ```text
//! {
//!   "originLibraryTag": "frame-connector",
//!   "eventName":        "default.ping",
//!   "senderKey":        "6a1f…",
//!   "groupKey":         "default",
//!   "payload":          { "n": 1 },
//!   "direction":        "up" | "down"
//! }
//! ```
//!
//! The local-only `raw_event_name` never goes on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identity::ConnectorIdentity;

/// Tag stamped on every envelope produced by this protocol.
pub const LIBRARY_TAG: &str = "frame-connector";

/// Where an envelope is heading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Still travelling toward the root.
    Up,
    /// Accepted by the root, fanning out.
    Down,
}

/// One published event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub origin_library_tag: String,
    /// Namespaced event name; derived once at creation.
    pub event_name: String,
    pub sender_key: String,
    pub group_key: String,
    pub payload: Value,
    pub direction: Direction,
    /// Name as the publisher passed it. Absent on decoded envelopes.
    #[serde(skip)]
    pub raw_event_name: Option<String>,
}

/// Why an inbound message was not accepted as an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The message carries no tag or another library's tag.
    Foreign,
    /// Tagged as ours but not decodable.
    Malformed(String),
}

impl Rejection {
    /// Returns a short stable label for trace events.
    pub fn as_label(&self) -> &'static str {
        match self {
            Rejection::Foreign => "foreign_envelope",
            Rejection::Malformed(_) => "malformed_envelope",
        }
    }
}

impl EventEnvelope {
    /// Builds an upward envelope for a locally published event.
    ///
    /// A `null` payload becomes an empty object.
    pub fn new(identity: &ConnectorIdentity, raw_event_name: &str, payload: Value) -> Self {
        Self {
            origin_library_tag: LIBRARY_TAG.to_string(),
            event_name: identity.derive_event_name(raw_event_name),
            sender_key: identity.key().to_string(),
            group_key: identity.group_key().to_string(),
            payload: normalize_payload(payload),
            direction: Direction::Up,
            raw_event_name: Some(raw_event_name.to_string()),
        }
    }

    /// Converts the envelope into the structured value sent over a transport.
    pub fn to_wire(&self) -> Value {
        // Every field is a string, an enum or a `Value`; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Parses an inbound structured message.
    ///
    /// Messages without our tag are [`Rejection::Foreign`] even if the rest of
    /// the shape matches.
    pub fn from_wire(message: Value) -> Result<Self, Rejection> {
        let tagged = message
            .get("originLibraryTag")
            .and_then(Value::as_str)
            .is_some_and(|tag| tag == LIBRARY_TAG);
        if !tagged {
            return Err(Rejection::Foreign);
        }
        serde_json::from_value(message).map_err(|e| Rejection::Malformed(e.to_string()))
    }

    /// True if `key` published this envelope.
    #[inline]
    pub fn is_from(&self, key: &str) -> bool {
        self.sender_key == key
    }
}

/// Replaces an absent payload with an empty object.
pub(crate) fn normalize_payload(payload: Value) -> Value {
    match payload {
        Value::Null => Value::Object(Map::new()),
        other => other,
    }
}
