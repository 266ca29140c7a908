//! The page: document tree, component instances and the UI executor.
//!
//! A [`Page`] owns everything that lives for the lifetime of the view:
//!
//! - the light document (`<html><head></head><body></body></html>`)
//! - the single global [`EventBus`], injected into every component context
//! - the template cache shared by all rendering scopes
//! - the component instances, keyed by their host element
//! - DOM event listeners registered through [`ComponentContext::listen`]
//! - a `LocalPool` on which every continuation runs
//!
//! Nothing here is `Send`. All work happens on the thread that owns the page.

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use markup5ever_rcdom::{Handle, NodeData};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use tracing::{info, warn};

use crate::bus::{Event, EventBus, EventRouter, EventScope, Listener};
use crate::component::{Component, ComponentContext, Registry, Services};
use crate::dom;
use crate::error::{ComponentError, ScopeError};
use crate::scope::TemplateCache;
use crate::selector::{self, MatchContext, Selector};

struct Instance {
    // Kept alive for the listeners and continuations that refer back to it.
    _component: Rc<dyn Component>,
    ctx: Rc<ComponentContext>,
}

/// State shared between the page and the contexts it hands out.
pub struct PageShared {
    registry: Registry,
    services: Rc<Services>,
    global_bus: Rc<EventBus>,
    templates: TemplateCache,
    document: Handle,
    body: Handle,
    instances: RefCell<Vec<Instance>>,
    hosts: RefCell<HashMap<usize, Rc<ComponentContext>>>,
    node_listeners: RefCell<HashMap<usize, (Handle, Rc<EventBus>)>>,
    spawner: LocalSpawner,
}

impl PageShared {
    pub(crate) fn templates(&self) -> &TemplateCache {
        &self.templates
    }

    fn context_for(&self, node: &Handle) -> Option<Rc<ComponentContext>> {
        self.hosts.borrow().get(&dom::node_key(node)).cloned()
    }

    /// Creates the component instance for `node` and mounts it.
    fn upgrade(self: &Rc<Self>, node: &Handle) -> Result<Rc<ComponentContext>, ComponentError> {
        let tag = dom::tag_name(node).ok_or(ScopeError::NotAnElement)?;
        if self.hosts.borrow().contains_key(&dom::node_key(node)) {
            return Err(ComponentError::AlreadyMounted(tag));
        }
        let component = self
            .registry
            .create(&tag)
            .ok_or_else(|| ComponentError::Unregistered(tag.clone()))?;

        let router = EventRouter::new(&tag, self.global_bus.clone());
        let ctx = Rc::new(ComponentContext::new(
            &tag,
            node.clone(),
            router,
            self.services.clone(),
            Rc::downgrade(self),
        ));
        self.hosts
            .borrow_mut()
            .insert(dom::node_key(node), ctx.clone());
        self.instances.borrow_mut().push(Instance {
            _component: component.clone(),
            ctx: ctx.clone(),
        });

        ctx.mount(component)?;
        Ok(ctx)
    }

    pub(crate) fn is_registered(&self, tag: &str) -> bool {
        self.registry.contains(tag)
    }

    /// Upgrades `node` and every registered custom element below it that is
    /// not upgraded yet, in document order.
    pub(crate) fn connect_tree(self: &Rc<Self>, node: &Handle) {
        let mut nodes = vec![node.clone()];
        nodes.extend(dom::descendants(node));
        self.connect_all(nodes);
    }

    /// Like [`connect_tree`](Self::connect_tree), `root` itself excluded.
    pub(crate) fn connect_children(self: &Rc<Self>, root: &Handle) {
        self.connect_all(dom::descendants(root));
    }

    fn connect_all(self: &Rc<Self>, nodes: Vec<Handle>) {
        for node in nodes {
            let Some(tag) = dom::tag_name(&node) else {
                continue;
            };
            if !self.registry.contains(&tag) || self.context_for(&node).is_some() {
                continue;
            }
            if let Err(err) = self.upgrade(&node) {
                warn!(component = %tag, code = err.code(), error = %err, "component failed to mount");
            }
        }
    }

    pub(crate) fn listen(&self, node: &Handle, event: &str, listener: Listener) {
        let bus = self
            .node_listeners
            .borrow_mut()
            .entry(dom::node_key(node))
            .or_insert_with(|| {
                let label = dom::tag_name(node).unwrap_or_else(|| "#node".to_string());
                (node.clone(), Rc::new(EventBus::new(&label)))
            })
            .1
            .clone();
        bus.subscribe(event, listener);
    }

    pub(crate) fn spawn<F>(&self, task: F) -> Result<(), ComponentError>
    where
        F: Future<Output = ()> + 'static,
    {
        self.spawner
            .spawn_local(task)
            .map_err(|e| ComponentError::Spawn(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAGE
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Page {
    pool: LocalPool,
    shared: Rc<PageShared>,
}

impl Page {
    /// A page with the standard component catalog.
    pub fn new(services: Services) -> Self {
        Self::with_registry(Registry::standard(), services)
    }

    pub fn with_registry(registry: Registry, services: Services) -> Self {
        let document = dom::create_document();
        let html = dom::create_element("html");
        let head = dom::create_element("head");
        let body = dom::create_element("body");
        dom::append_child(&document, &html);
        dom::append_child(&html, &head);
        dom::append_child(&html, &body);

        let pool = LocalPool::new();
        let shared = Rc::new(PageShared {
            registry,
            services: Rc::new(services),
            global_bus: Rc::new(EventBus::new("global")),
            templates: TemplateCache::new(),
            document,
            body,
            instances: RefCell::new(Vec::new()),
            hosts: RefCell::new(HashMap::new()),
            node_listeners: RefCell::new(HashMap::new()),
            spawner: pool.spawner(),
        });
        Self { pool, shared }
    }

    pub fn document(&self) -> &Handle {
        &self.shared.document
    }

    pub fn body(&self) -> &Handle {
        &self.shared.body
    }

    pub fn global_bus(&self) -> &Rc<EventBus> {
        &self.shared.global_bus
    }

    pub fn templates(&self) -> &TemplateCache {
        &self.shared.templates
    }

    /// Appends `<tag>` to the body and mounts it.
    pub fn mount_root(&self, tag: &str) -> Result<Rc<ComponentContext>, ComponentError> {
        let element = dom::create_element(tag);
        dom::append_child(&self.shared.body, &element);
        info!(component = %tag, "mounting page root");
        self.shared.upgrade(&element)
    }

    /// Mounts the component for an element already in the tree. Mounting the
    /// same element twice fails with `DM-ERR-COMPONENT-001`.
    pub fn mount(&self, node: &Handle) -> Result<Rc<ComponentContext>, ComponentError> {
        self.shared.upgrade(node)
    }

    /// Upgrades every registered custom element at or below `node`.
    pub fn connect(&self, node: &Handle) {
        self.shared.connect_tree(node);
    }

    /// Delivers a DOM event to the listeners registered on `node`.
    pub fn dispatch(&self, node: &Handle, event: &str, payload: Value) {
        let bus = self
            .shared
            .node_listeners
            .borrow()
            .get(&dom::node_key(node))
            .map(|(_, bus)| bus.clone());
        if let Some(bus) = bus {
            bus.emit(&Event::new(event, EventScope::Local, payload));
        }
    }

    /// Runs every continuation that can make progress without waiting.
    pub fn run_until_stalled(&mut self) {
        self.pool.run_until_stalled();
    }

    /// Runs until every spawned continuation has finished.
    pub fn run(&mut self) {
        self.pool.run();
    }

    pub fn find_component(&self, tag: &str) -> Option<Rc<ComponentContext>> {
        self.shared
            .instances
            .borrow()
            .iter()
            .find(|i| i.ctx.tag() == tag)
            .map(|i| i.ctx.clone())
    }

    /// Every instance of `tag`, in mount order.
    pub fn components(&self, tag: &str) -> Vec<Rc<ComponentContext>> {
        self.shared
            .instances
            .borrow()
            .iter()
            .filter(|i| i.ctx.tag() == tag)
            .map(|i| i.ctx.clone())
            .collect()
    }

    pub fn component_for(&self, host: &Handle) -> Option<Rc<ComponentContext>> {
        self.shared.context_for(host)
    }

    /// First light-DOM element matching `selector`. Rendering scopes are not searched.
    pub fn query_one(&self, selector: &str) -> Option<Handle> {
        let sel = Selector::parse(selector).ok()?;
        selector::query_one(&self.shared.document, &sel, MatchContext::unscoped())
    }

    pub fn query_all(&self, selector: &str) -> Vec<Handle> {
        match Selector::parse(selector) {
            Ok(sel) => selector::query_all(&self.shared.document, &sel, MatchContext::unscoped()),
            Err(_) => Vec::new(),
        }
    }

    /// Serialises the composed page. Each rendering scope appears as a
    /// declarative `<template shadowrootmode="open">` inside its host.
    pub fn snapshot(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>");
        for child in self.shared.document.children.borrow().iter() {
            self.write_node(child, false, &mut out);
        }
        out
    }

    fn write_node(&self, node: &Handle, raw_text: bool, out: &mut String) {
        match &node.data {
            NodeData::Element { .. } => {
                let tag = dom::tag_name(node).unwrap_or_default();
                out.push('<');
                out.push_str(&tag);
                for (name, value) in dom::attributes(node) {
                    out.push_str(&format!(" {}=\"{}\"", name, dom::escape_attr(&value)));
                }
                out.push('>');
                if dom::VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }

                let scope_root = self
                    .shared
                    .context_for(node)
                    .and_then(|ctx| ctx.shadow().map(|s| s.root().clone()));
                if let Some(root) = scope_root {
                    out.push_str("<template shadowrootmode=\"open\">");
                    for child in root.children.borrow().iter() {
                        self.write_node(child, false, out);
                    }
                    out.push_str("</template>");
                }

                let raw = matches!(tag.as_str(), "style" | "script");
                for child in node.children.borrow().iter() {
                    self.write_node(child, raw, out);
                }
                out.push_str(&format!("</{}>", tag));
            }
            NodeData::Text { contents } => {
                let text = contents.borrow();
                if raw_text {
                    out.push_str(&text);
                } else {
                    out.push_str(&dom::escape_text(&text));
                }
            }
            NodeData::Comment { contents } => {
                out.push_str(&format!("<!--{}-->", contents));
            }
            _ => {}
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WIRING FROM CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "http")]
impl Page {
    /// A page talking to the real API, with the session kept under the
    /// configured storage directory.
    pub fn from_config(config: &crate::config::RuntimeConfig) -> Result<Self, crate::error::ConfigError> {
        use crate::fetch::HttpTransport;
        use crate::markdown::ComrakMarkdown;
        use crate::session::{FileStorage, SessionStore, SystemClock};

        let storage = FileStorage::new(config.resolved_storage_dir()?);
        let session = SessionStore::new(Rc::new(storage), Rc::new(SystemClock))
            .with_ttl(chrono::Duration::days(config.session_ttl_days));

        Ok(Self::new(Services {
            transport: Rc::new(HttpTransport::new()?),
            session: Rc::new(session),
            markdown: Rc::new(ComrakMarkdown),
            api_base: config.api_base.clone(),
        }))
    }
}
