//! # Connector identity and event-name namespacing.
//!
//! [`ConnectorIdentity`] is resolved once from [`Config`] and never changes.
//! Its `key` marks envelopes this instance published; `group_key` and
//! `event_namespace` scope event names so independent connector groups can
//! share one transport.
//!
//! ```text
//! derive_event_name("ping")                       group_key="shop"
//!   namespace = None         →  "shop.ping"
//!   namespace = Some("v2")   →  "shop.ping.v2"
//! ```

use uuid::Uuid;

use crate::config::Config;

/// Immutable identity of one connector instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectorIdentity {
    key: String,
    group_key: String,
    event_namespace: Option<String>,
}

impl ConnectorIdentity {
    /// Resolves the identity from config, generating a key when none is set.
    pub fn resolve(cfg: &Config) -> Self {
        let key = cfg
            .key
            .clone()
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            key,
            group_key: cfg.group_key.clone(),
            event_namespace: cfg.event_namespace.clone().filter(|ns| !ns.is_empty()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    pub fn event_namespace(&self) -> Option<&str> {
        self.event_namespace.as_deref()
    }

    /// Scopes a raw event name to this connector's group.
    pub fn derive_event_name(&self, raw: &str) -> String {
        match &self.event_namespace {
            Some(ns) => format!("{}.{}.{}", self.group_key, raw, ns),
            None => format!("{}.{}", self.group_key, raw),
        }
    }

    /// Inverse of [`derive_event_name`](Self::derive_event_name).
    ///
    /// Returns `None` if `namespaced` does not belong to this group/namespace.
    pub fn raw_event_name<'a>(&self, namespaced: &'a str) -> Option<&'a str> {
        let rest = namespaced
            .strip_prefix(self.group_key.as_str())?
            .strip_prefix('.')?;
        match &self.event_namespace {
            Some(ns) => rest.strip_suffix(ns.as_str())?.strip_suffix('.'),
            None => Some(rest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with(group: &str, ns: Option<&str>) -> ConnectorIdentity {
        ConnectorIdentity::resolve(&Config {
            key: Some("me".into()),
            group_key: group.into(),
            event_namespace: ns.map(str::to_string),
            ..Config::default()
        })
    }

    #[test]
    fn generated_keys_are_unique() {
        let a = ConnectorIdentity::resolve(&Config::default());
        let b = ConnectorIdentity::resolve(&Config::default());
        assert_ne!(a.key(), b.key());
        assert!(!a.key().is_empty());
    }

    #[test]
    fn empty_key_is_treated_as_unset() {
        let id = ConnectorIdentity::resolve(&Config {
            key: Some(String::new()),
            ..Config::default()
        });
        assert!(!id.key().is_empty());
    }

    #[test]
    fn group_prefix_only() {
        let id = with("shop", None);
        assert_eq!(id.derive_event_name("ping"), "shop.ping");
        assert_eq!(id.raw_event_name("shop.ping"), Some("ping"));
    }

    #[test]
    fn namespace_suffix() {
        let id = with("shop", Some("v2"));
        assert_eq!(id.derive_event_name("cart.add"), "shop.cart.add.v2");
        assert_eq!(id.raw_event_name("shop.cart.add.v2"), Some("cart.add"));
    }

    #[test]
    fn other_group_names_do_not_invert() {
        let id = with("shop", None);
        assert_eq!(id.raw_event_name("blog.ping"), None);
        assert_eq!(id.raw_event_name("shopping.ping"), None);
    }
}
