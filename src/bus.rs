//! Event Bus Router.
//!
//! Two tiers of [`EventBus`]: one private bus per component instance and one
//! bus shared by the whole page. The tier is chosen explicitly by the caller
//! through [`EventScope`]; event names carry no routing meaning.
//!
//! Dispatch is synchronous and single-threaded. Listeners for one event run
//! in the order they subscribed, each to completion. A listener may emit or
//! subscribe while a dispatch is in progress: the dispatch works from a
//! snapshot of the listener list taken when it started.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Global event: the article index was (re)loaded. Payload: array of articles.
pub const INDEX_REFRESHED: &str = "fresh-index";
/// Global event: an article was saved. Payload: array holding the new article.
pub const ARTICLE_CREATED: &str = "new-article";
/// Global event: the login flow produced a verified session. Payload: session token.
pub const AUTH_VERIFIED: &str = "auth-verified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventScope {
    /// Delivered only to listeners on the emitting component.
    Local,
    /// Delivered to listeners on every component of the page.
    Global,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub scope: EventScope,
    pub payload: Value,
}

impl Event {
    pub fn new(name: &str, scope: EventScope, payload: Value) -> Self {
        Self {
            name: name.to_string(),
            scope,
            payload,
        }
    }
}

pub type Listener = Rc<dyn Fn(&Event)>;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT BUS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct EventBus {
    label: String,
    listeners: RefCell<Vec<(String, Listener)>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("label", &self.label)
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl EventBus {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn subscribe(&self, name: &str, listener: Listener) {
        self.listeners
            .borrow_mut()
            .push((name.to_string(), listener));
    }

    pub fn emit(&self, event: &Event) {
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(name, _)| *name == event.name)
            .map(|(_, listener)| listener.clone())
            .collect();

        trace!(
            bus = %self.label,
            event = %event.name,
            listeners = snapshot.len(),
            "dispatch"
        );
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(n, _)| n == name)
            .count()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTER
// ═══════════════════════════════════════════════════════════════════════════════

/// A component's view of the two tiers.
#[derive(Debug, Clone)]
pub struct EventRouter {
    local: Rc<EventBus>,
    global: Rc<EventBus>,
}

impl EventRouter {
    /// A router with a fresh private bus and the given shared bus.
    pub fn new(owner: &str, global: Rc<EventBus>) -> Self {
        Self {
            local: Rc::new(EventBus::new(owner)),
            global,
        }
    }

    fn bus(&self, scope: EventScope) -> &EventBus {
        match scope {
            EventScope::Local => &self.local,
            EventScope::Global => &self.global,
        }
    }

    pub fn emit(&self, scope: EventScope, name: &str, payload: Value) {
        self.bus(scope).emit(&Event::new(name, scope, payload));
    }

    pub fn subscribe(&self, scope: EventScope, name: &str, listener: Listener) {
        self.bus(scope).subscribe(name, listener);
    }

    pub fn local(&self) -> &Rc<EventBus> {
        &self.local
    }

    pub fn global(&self) -> &Rc<EventBus> {
        &self.global
    }
}
