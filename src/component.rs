//! Component Lifecycle Base.
//!
//! Every UI unit is a variant of [`Component`]: it declares a template and an
//! `on_mount` hook, and the page does the rest. The set of variants is closed
//! and known up front; a [`Registry`] maps each custom-element tag to the
//! constructor of its variant.
//!
//! ## Invariants
//!
//! 1. **Render before mount**: a non-empty template is rendered into the
//!    component's scope, and the custom elements inside that scope are
//!    connected, before `on_mount` runs.
//! 2. **Mount once**: `on_mount` runs exactly once per instance. A second
//!    attempt fails with `DM-ERR-COMPONENT-001`.
//! 3. **No shared state**: components never hold references to each other.
//!    They talk only through the event tiers of their [`ComponentContext`].

use markup5ever_rcdom::Handle;
use serde_json::Value;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::future::Future;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

use crate::bus::{Event, EventRouter, EventScope, Listener};
use crate::dom;
use crate::error::{ComponentError, FetchError};
use crate::fetch::{self, RequestOptions, Transport};
use crate::markdown::MarkdownRenderer;
use crate::page::PageShared;
use crate::scope::{RenderScope, ShadowRoot};
use crate::session::SessionStore;

pub trait Component {
    /// Custom-element tag this variant is registered under.
    fn tag(&self) -> &'static str;

    /// Markup rendered into the component's scope. Empty renders nothing.
    fn template(&self) -> &'static str {
        ""
    }

    fn on_mount(self: Rc<Self>, ctx: &Rc<ComponentContext>) -> Result<(), ComponentError>;
}

pub type Constructor = fn() -> Rc<dyn Component>;

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default, Clone)]
pub struct Registry {
    constructors: BTreeMap<String, Constructor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full Daymare catalog.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        crate::components::register_all(&mut registry);
        registry
    }

    /// Registers `constructor` for `tag`, replacing any earlier entry.
    pub fn register(&mut self, tag: &str, constructor: Constructor) {
        self.constructors
            .insert(tag.to_ascii_lowercase(), constructor);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    pub fn create(&self, tag: &str) -> Option<Rc<dyn Component>> {
        self.constructors.get(tag).map(|construct| construct())
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICES
// ═══════════════════════════════════════════════════════════════════════════════

/// Collaborators shared by every component of a page.
pub struct Services {
    pub transport: Rc<dyn Transport>,
    pub session: Rc<SessionStore>,
    pub markdown: Rc<dyn MarkdownRenderer>,
    /// Base URL that relative request paths resolve against.
    pub api_base: String,
}

/// Where [`ComponentContext::insert_component`] places the new element.
#[derive(Debug, Clone)]
pub enum InsertPosition {
    Append,
    Prepend,
    Before(Handle),
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-instance capability handle. Everything a component may touch goes
/// through here: its host, its scope, its two event tiers, the page's
/// collaborators and the UI executor.
pub struct ComponentContext {
    tag: String,
    host: Handle,
    scope: RenderScope,
    router: EventRouter,
    services: Rc<Services>,
    page: Weak<PageShared>,
    mounted: Cell<bool>,
}

impl ComponentContext {
    pub(crate) fn new(
        tag: &str,
        host: Handle,
        router: EventRouter,
        services: Rc<Services>,
        page: Weak<PageShared>,
    ) -> Self {
        Self {
            tag: tag.to_string(),
            host,
            scope: RenderScope::new(),
            router,
            services,
            page,
            mounted: Cell::new(false),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn host(&self) -> &Handle {
        &self.host
    }

    pub fn shadow(&self) -> Option<&ShadowRoot> {
        self.scope.shadow()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    pub fn session(&self) -> &SessionStore {
        &self.services.session
    }

    pub fn markdown(&self) -> &dyn MarkdownRenderer {
        self.services.markdown.as_ref()
    }

    fn page(&self) -> Result<Rc<PageShared>, ComponentError> {
        self.page.upgrade().ok_or(ComponentError::Detached)
    }

    /// Renders the template, connects the scope's custom elements and runs
    /// `on_mount`.
    pub(crate) fn mount(
        self: &Rc<Self>,
        component: Rc<dyn Component>,
    ) -> Result<(), ComponentError> {
        if self.mounted.replace(true) {
            return Err(ComponentError::AlreadyMounted(self.tag.clone()));
        }
        let page = self.page()?;

        let scope_root = self
            .scope
            .mount(&self.host, component.template(), page.templates())?
            .map(|shadow| shadow.root().clone());
        if let Some(root) = scope_root {
            page.connect_children(&root);
        }

        debug!(component = %self.tag, "mounted");
        component.on_mount(self)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// First node inside this component's scope matching `selector`.
    pub fn shadow_query(&self, selector: &str) -> Option<Handle> {
        self.scope.shadow().and_then(|s| s.query_one(selector))
    }

    /// Like [`shadow_query`](Self::shadow_query), but a miss is an error.
    pub fn require(&self, selector: &str) -> Result<Handle, ComponentError> {
        self.shadow_query(selector)
            .ok_or_else(|| ComponentError::MissingNode {
                tag: self.tag.clone(),
                selector: selector.to_string(),
            })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Remote calls
    // ─────────────────────────────────────────────────────────────────────────

    /// Issues a request through the page transport and parses the body as JSON.
    /// The returned future does not borrow the context.
    pub fn request_json(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> impl Future<Output = Result<Value, FetchError>> + 'static {
        fetch::request_json(
            self.services.transport.clone(),
            &self.services.api_base,
            url,
            options,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    pub fn emit_local(&self, name: &str, payload: Value) {
        self.router.emit(EventScope::Local, name, payload);
    }

    pub fn emit_global(&self, name: &str, payload: Value) {
        self.router.emit(EventScope::Global, name, payload);
    }

    pub fn on_local(&self, name: &str, listener: impl Fn(&Event) + 'static) {
        self.router
            .subscribe(EventScope::Local, name, Rc::new(listener));
    }

    pub fn on_global(&self, name: &str, listener: impl Fn(&Event) + 'static) {
        self.router
            .subscribe(EventScope::Global, name, Rc::new(listener));
    }

    /// Listens for DOM events (`submit`, `click`, ...) dispatched at `node`.
    pub fn listen(
        &self,
        node: &Handle,
        event: &str,
        listener: impl Fn(&Event) + 'static,
    ) -> Result<(), ComponentError> {
        let listener: Listener = Rc::new(listener);
        self.page()?.listen(node, event, listener);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scheduling and composition
    // ─────────────────────────────────────────────────────────────────────────

    /// Schedules a continuation on the UI executor. A continuation that ends in
    /// an error is reported once at `warn` and dropped.
    pub fn spawn<F>(&self, task: F) -> Result<(), ComponentError>
    where
        F: Future<Output = Result<(), ComponentError>> + 'static,
    {
        let tag = self.tag.clone();
        self.page()?.spawn(async move {
            if let Err(err) = task.await {
                warn!(component = %tag, code = err.code(), error = %err, "unhandled task failure");
            }
        })
    }

    /// Upgrades `node` and any custom elements below it.
    pub fn connect(&self, node: &Handle) -> Result<(), ComponentError> {
        self.page()?.connect_tree(node);
        Ok(())
    }

    /// Creates a `<tag>` element under `parent` and connects it. `tag` must be
    /// registered; nothing is inserted otherwise.
    pub fn insert_component(
        &self,
        parent: &Handle,
        tag: &str,
        position: InsertPosition,
    ) -> Result<Handle, ComponentError> {
        if !self.page()?.is_registered(tag) {
            return Err(ComponentError::Unregistered(tag.to_string()));
        }
        let element = dom::create_element(tag);
        match position {
            InsertPosition::Append => dom::append_child(parent, &element),
            InsertPosition::Prepend => dom::prepend_child(parent, &element),
            InsertPosition::Before(reference) => dom::insert_before(parent, &element, &reference),
        }
        self.connect(&element)?;
        Ok(element)
    }
}
