//! # Connector roles.
//!
//! A role decides whether a context converts upward traffic into downward
//! fan-out (root) or relays it to its parent (nested).
//!
//! | string               | role           | resolves to                          |
//! |----------------------|----------------|--------------------------------------|
//! | `"root"`, `"top"`    | [`Role::Root`]   | root                                 |
//! | `"nested"`, `"frame"`| [`Role::Nested`] | not root                             |
//! | `"auto"`, `"browser"`| [`Role::Auto`]   | root iff the transport has no parent |

use std::fmt;
use std::str::FromStr;

use crate::error::ConnectorError;

/// Strategy a connector is initialized with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Top of the hierarchy: the only place upward envelopes turn downward.
    Root,
    /// Below another context: relays upward, dispatches and relays downward.
    Nested,
    /// Decided from the transport at `init`.
    Auto,
}

impl Role {
    /// Returns `true` if a context with this role acts as the root.
    pub fn is_root(self, has_parent: bool) -> bool {
        match self {
            Role::Root => true,
            Role::Nested => false,
            Role::Auto => !has_parent,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Root => "root",
            Role::Nested => "nested",
            Role::Auto => "auto",
        }
    }
}

impl FromStr for Role {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "root" | "top" => Ok(Role::Root),
            "nested" | "frame" => Ok(Role::Nested),
            "auto" | "browser" => Ok(Role::Auto),
            _ => Err(ConnectorError::UnknownRole {
                role: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
