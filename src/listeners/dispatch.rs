//! # Local dispatch collaborator.
//!
//! [`LocalDispatch`] is the seam between the connector and whatever delivers
//! events inside one context (native event dispatch, a callback table, a typed
//! bus). The connector only ever attaches to and dispatches on its own context.

use serde_json::Value;

use super::handler::{CaptureMode, Handler, Target};

/// Same-context event delivery.
///
/// Implementations must not hold internal locks while invoking handlers: a
/// handler may subscribe or publish again from inside the callback.
pub trait LocalDispatch: Send + Sync + 'static {
    /// Attaches `handler` to `event_name` on `target`.
    fn attach(&self, target: &Target, event_name: &str, handler: &Handler, capture: CaptureMode);

    /// Detaches the exact `(handler, capture)` pair previously attached.
    fn detach(&self, target: &Target, event_name: &str, handler: &Handler, capture: CaptureMode);

    /// Delivers `payload` to every listener of `event_name` on `target`.
    ///
    /// Returns the number of listeners invoked.
    fn dispatch(&self, target: &Target, event_name: &str, payload: &Value) -> usize;
}
