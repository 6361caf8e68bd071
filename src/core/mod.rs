//! Connector core: the public handle and the propagation machinery behind it.
//!
//! The only public API from this module is [`Connector`] (with its builder) and
//! [`Role`]. Internal modules:
//! - [`endpoint`]: identity, listener registry and the routing state machine;
//! - [`listener`]: inbound-message and trace-forwarding tasks;
//! - [`role`]: role names accepted by `init`.

mod connector;
mod endpoint;
mod listener;
mod role;

pub use connector::{Connector, ConnectorBuilder};
pub use role::Role;
