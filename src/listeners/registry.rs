//! # Listener registry - bookkeeping for locally attached listeners.
//!
//! The registry remembers every `(target, event name, handler, capture)` it has
//! attached through a [`LocalDispatch`], so it can detach them again later.
//!
//! ## Rules
//! - `add` records and attaches; it does not check for duplicates.
//! - `remove_all` detaches **every** registration for a `(target, event name)` pair.
//! - Subscribe paths use [`replace`](ListenerRegistry::replace) (`remove_all` then `add`),
//!   so there is at most one active registration per pair.
//! - `clear` detaches everything; nothing is leaked on teardown.

use std::collections::HashMap;
use std::sync::Arc;

use super::dispatch::LocalDispatch;
use super::handler::{CaptureMode, Handler, Target};

/// One attached listener.
#[derive(Clone, Debug)]
struct Registration {
    target: Target,
    handler: Handler,
    capture: CaptureMode,
}

/// Per-event-name registrations owned by one connector.
pub struct ListenerRegistry {
    dispatch: Arc<dyn LocalDispatch>,
    entries: HashMap<String, Vec<Registration>>,
}

impl ListenerRegistry {
    pub fn new(dispatch: Arc<dyn LocalDispatch>) -> Self {
        Self {
            dispatch,
            entries: HashMap::new(),
        }
    }

    /// Records a registration and attaches the handler.
    pub fn add(
        &mut self,
        target: Target,
        event_name: &str,
        handler: Handler,
        capture: CaptureMode,
    ) {
        self.dispatch.attach(&target, event_name, &handler, capture);
        self.entries
            .entry(event_name.to_string())
            .or_default()
            .push(Registration {
                target,
                handler,
                capture,
            });
    }

    /// Detaches and forgets every registration matching `(target, event_name)`.
    ///
    /// Returns how many were removed; zero is not an error.
    pub fn remove_all(&mut self, target: &Target, event_name: &str) -> usize {
        let Some(list) = self.entries.get_mut(event_name) else {
            return 0;
        };

        let (gone, kept): (Vec<_>, Vec<_>) = list.drain(..).partition(|r| &r.target == target);
        for r in &gone {
            self.dispatch.detach(&r.target, event_name, &r.handler, r.capture);
        }

        if kept.is_empty() {
            self.entries.remove(event_name);
        } else {
            *list = kept;
        }
        gone.len()
    }

    /// `remove_all` followed by `add`. Returns how many registrations were replaced.
    pub fn replace(
        &mut self,
        target: Target,
        event_name: &str,
        handler: Handler,
        capture: CaptureMode,
    ) -> usize {
        let removed = self.remove_all(&target, event_name);
        self.add(target, event_name, handler, capture);
        removed
    }

    /// Detaches every registration. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let mut removed = 0;
        for (event_name, list) in self.entries.drain() {
            for r in list {
                self.dispatch.detach(&r.target, &event_name, &r.handler, r.capture);
                removed += 1;
            }
        }
        removed
    }

    /// Registrations for one `(target, event_name)` pair.
    pub fn count(&self, target: &Target, event_name: &str) -> usize {
        self.entries
            .get(event_name)
            .map_or(0, |list| list.iter().filter(|r| &r.target == target).count())
    }

    /// Total number of registrations.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for ListenerRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listeners::EventTable;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> Handler {
        let c = counter.clone();
        Handler::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn setup() -> (Arc<EventTable>, ListenerRegistry) {
        let table = Arc::new(EventTable::new());
        let registry = ListenerRegistry::new(table.clone());
        (table, registry)
    }

    #[test]
    fn replace_never_stacks() {
        let (table, mut reg) = setup();
        let doc = Target::document();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));

        assert_eq!(reg.replace(doc.clone(), "g.ping", counting(&a), CaptureMode::Bubble), 0);
        assert_eq!(reg.replace(doc.clone(), "g.ping", counting(&b), CaptureMode::Bubble), 1);
        assert_eq!(reg.count(&doc, "g.ping"), 1);

        table.dispatch(&doc, "g.ping", &json!({}));
        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_all_detaches_every_match() {
        let (table, mut reg) = setup();
        let doc = Target::document();
        reg.add(doc.clone(), "e", Handler::noop(), CaptureMode::Bubble);
        reg.add(doc.clone(), "e", Handler::noop(), CaptureMode::Capture);
        reg.add(Target::new("panel"), "e", Handler::noop(), CaptureMode::Bubble);

        assert_eq!(reg.remove_all(&doc, "e"), 2);
        assert_eq!(table.listener_count(&doc, "e"), 0);
        assert_eq!(reg.count(&Target::new("panel"), "e"), 1);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_all_without_entries_is_noop() {
        let (_table, mut reg) = setup();
        assert_eq!(reg.remove_all(&Target::document(), "missing"), 0);
        assert!(reg.is_empty());
    }

    #[test]
    fn clear_and_drop_detach_everything() {
        let (table, mut reg) = setup();
        reg.add(Target::document(), "a", Handler::noop(), CaptureMode::Bubble);
        reg.add(Target::document(), "b", Handler::noop(), CaptureMode::Bubble);
        assert_eq!(reg.clear(), 2);
        assert_eq!(table.total(), 0);

        reg.add(Target::document(), "c", Handler::noop(), CaptureMode::Bubble);
        drop(reg);
        assert_eq!(table.total(), 0);
    }
}
