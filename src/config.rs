//! # Connector configuration.
//!
//! Provides [`Config`], the options passed to [`Connector::init`](crate::Connector::init).
//! Every field has a documented default and is resolved exactly once, when the
//! connector is initialized; nothing is re-derived afterwards.
//!
//! Config can be built in code or read from a JSON options bag:
//! ```rust
//! use frame_connector::Config;
//!
//! let cfg = Config::from_json(r#"{ "groupKey": "shop", "childGroup": "widgets" }"#).unwrap();
//! assert_eq!(cfg.group_key, "shop");
//! assert!(cfg.suppress_self_echo);
//! ```
//!
//! ## Sentinel values
//! - `key = None` → a fresh UUID v4 is generated at `init`
//! - `event_namespace = None` → no suffix is appended to event names
//! - `child_group = None` → fan-out reaches every child

use serde::Deserialize;

/// Group key used when none is configured.
pub const DEFAULT_GROUP_KEY: &str = "default";

/// Trace bus capacity used when none is configured.
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Options for one connector instance.
///
/// ## Field semantics
/// - `key`: opaque identity of this instance (`None` = generate)
/// - `group_key`: namespace prefix shared by cooperating connectors
/// - `event_namespace`: optional symbolic suffix for event names
/// - `suppress_self_echo`: skip local dispatch of envelopes this instance sent
/// - `root_accepts_own`: the root dispatches its own envelopes regardless of `suppress_self_echo`
/// - `child_group`: only children tagged with this marker receive fan-out
/// - `require_handler`: `subscribe_with(.., None)` fails instead of installing a no-op
/// - `bus_capacity`: ring buffer size of the trace bus (min 1)
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Opaque identity token. Unique per connector instance.
    pub key: Option<String>,

    /// Group the connector belongs to. Prefixes every event name.
    pub group_key: String,

    /// Optional suffix appended to every event name.
    pub event_namespace: Option<String>,

    /// Identity-based echo check: when `true`, an envelope whose sender key equals
    /// this instance's key is not dispatched to local listeners.
    pub suppress_self_echo: bool,

    /// Role-based acceptance: when `true`, the root dispatches envelopes it sent
    /// itself even if `suppress_self_echo` is on.
    pub root_accepts_own: bool,

    /// Child-group filter for fan-out.
    pub child_group: Option<String>,

    /// Whether a subscription must carry a handler.
    pub require_handler: bool,

    /// Capacity of the trace event bus.
    pub bus_capacity: usize,
}

impl Config {
    /// Parses a JSON options bag. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the child-group marker, treating an empty string as unset.
    #[inline]
    pub fn child_group_filter(&self) -> Option<&str> {
        self.child_group.as_deref().filter(|g| !g.is_empty())
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `key = None` (generated)
    /// - `group_key = "default"`
    /// - `event_namespace = None`
    /// - `suppress_self_echo = true`
    /// - `root_accepts_own = true`
    /// - `child_group = None` (broadcast to all children)
    /// - `require_handler = true`
    /// - `bus_capacity = 256`
    fn default() -> Self {
        Self {
            key: None,
            group_key: DEFAULT_GROUP_KEY.to_string(),
            event_namespace: None,
            suppress_self_echo: true,
            root_accepts_own: true,
            child_group: None,
            require_handler: true,
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_documented_values() {
        let cfg = Config::default();
        assert!(cfg.key.is_none());
        assert_eq!(cfg.group_key, "default");
        assert!(cfg.event_namespace.is_none());
        assert!(cfg.suppress_self_echo);
        assert!(cfg.root_accepts_own);
        assert!(cfg.require_handler);
        assert_eq!(cfg.bus_capacity, 256);
    }

    #[test]
    fn json_bag_fills_missing_fields() {
        let cfg = Config::from_json(r#"{ "key": "abc", "suppressSelfEcho": false }"#).unwrap();
        assert_eq!(cfg.key.as_deref(), Some("abc"));
        assert!(!cfg.suppress_self_echo);
        assert_eq!(cfg.group_key, DEFAULT_GROUP_KEY);
    }

    #[test]
    fn empty_child_group_means_no_filter() {
        let cfg = Config {
            child_group: Some(String::new()),
            ..Config::default()
        };
        assert_eq!(cfg.child_group_filter(), None);
    }

    #[test]
    fn bus_capacity_is_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
