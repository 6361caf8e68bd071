//! # Handler, target and capture-mode primitives.
//!
//! A [`Handler`] is a shared callback receiving the event payload. Handlers are
//! compared by identity (the same `Arc`), never by behavior, which is what
//! `detach` needs to find the exact listener it attached.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Shared event callback.
#[derive(Clone)]
pub struct Handler(Arc<dyn Fn(&Value) + Send + Sync + 'static>);

impl Handler {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// A handler that ignores every payload.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Invokes the callback.
    #[inline]
    pub fn call(&self, payload: &Value) {
        (self.0)(payload)
    }

    /// True if both handles point at the same callback.
    #[inline]
    pub fn same(&self, other: &Handler) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

impl<F> From<F> for Handler
where
    F: Fn(&Value) + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Handler::new(f)
    }
}

/// Local object listeners are attached to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Target(String);

impl Target {
    /// Name of the target every `subscribe` uses.
    pub const DOCUMENT: &'static str = "document";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The context-wide default target.
    pub fn document() -> Self {
        Self::new(Self::DOCUMENT)
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::document()
    }
}

/// Listener phase. Capture listeners run before bubble listeners.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CaptureMode {
    #[default]
    Bubble,
    Capture,
}
