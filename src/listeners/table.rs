//! # EventTable: in-process [`LocalDispatch`] implementation.
//!
//! Keeps listeners in a map keyed by `(target, event name)`. Mirrors native
//! event-listener semantics closely enough for the connector:
//! - attaching the same `(handler, capture)` twice is a no-op,
//! - capture listeners run before bubble listeners, each group in attach order,
//! - dispatch works on a snapshot, so handlers may attach/detach re-entrantly,
//! - a panicking handler does not stop the others; the first panic is resumed
//!   once every handler has run.

use std::collections::HashMap;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::{PoisonError, RwLock};

use serde_json::Value;

use super::dispatch::LocalDispatch;
use super::handler::{CaptureMode, Handler, Target};

struct Attached {
    handler: Handler,
    capture: CaptureMode,
}

/// Callback table backing local dispatch.
#[derive(Default)]
pub struct EventTable {
    listeners: RwLock<HashMap<(Target, String), Vec<Attached>>>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of listeners attached to `event_name` on `target`.
    pub fn listener_count(&self, target: &Target, event_name: &str) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(target.clone(), event_name.to_string()))
            .map_or(0, Vec::len)
    }

    /// Total number of attached listeners across all targets and events.
    pub fn total(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }
}

impl LocalDispatch for EventTable {
    fn attach(&self, target: &Target, event_name: &str, handler: &Handler, capture: CaptureMode) {
        let mut map = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let slot = map
            .entry((target.clone(), event_name.to_string()))
            .or_default();
        if slot
            .iter()
            .any(|a| a.capture == capture && a.handler.same(handler))
        {
            return;
        }
        slot.push(Attached {
            handler: handler.clone(),
            capture,
        });
    }

    fn detach(&self, target: &Target, event_name: &str, handler: &Handler, capture: CaptureMode) {
        let mut map = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let key = (target.clone(), event_name.to_string());
        if let Some(slot) = map.get_mut(&key) {
            slot.retain(|a| !(a.capture == capture && a.handler.same(handler)));
            if slot.is_empty() {
                map.remove(&key);
            }
        }
    }

    fn dispatch(&self, target: &Target, event_name: &str, payload: &Value) -> usize {
        let snapshot: Vec<Handler> = {
            let map = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
            let Some(slot) = map.get(&(target.clone(), event_name.to_string())) else {
                return 0;
            };
            let capture = slot.iter().filter(|a| a.capture == CaptureMode::Capture);
            let bubble = slot.iter().filter(|a| a.capture == CaptureMode::Bubble);
            capture.chain(bubble).map(|a| a.handler.clone()).collect()
        };

        let mut first_panic = None;
        for handler in &snapshot {
            if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| handler.call(payload))) {
                first_panic.get_or_insert(panic_err);
            }
        }
        if let Some(panic_err) = first_panic {
            resume_unwind(panic_err);
        }
        snapshot.len()
    }
}
