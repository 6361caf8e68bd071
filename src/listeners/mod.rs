//! Local listeners: handler primitives, the dispatch seam and its bookkeeping.
//!
//! ## Contents
//! - [`Handler`], [`Target`], [`CaptureMode`] what gets attached, and where
//! - [`LocalDispatch`] the same-context delivery collaborator
//! - [`EventTable`] in-process `LocalDispatch` backed by a callback map
//! - [`ListenerRegistry`] per-connector record of attached listeners
//!
//! ## Wiring
//! ```text
//! Connector::subscribe ─► ListenerRegistry::replace ─► LocalDispatch::attach
//! Endpoint (down envelope) ──────────────────────────► LocalDispatch::dispatch
//! ```

mod dispatch;
mod handler;
mod registry;
mod table;

pub use dispatch::LocalDispatch;
pub use handler::{CaptureMode, Handler, Target};
pub use registry::ListenerRegistry;
pub use table::EventTable;
