//! Rendering Scope Manager.
//!
//! ## Invariants
//!
//! 1. **One scope per host**: [`RenderScope::mount`] succeeds at most once.
//!    A second call fails with `DM-ERR-SCOPE-001` and leaves the first
//!    scope's content as it was.
//! 2. **Detached root**: a scope's nodes hang off a parentless document node
//!    owned by the [`ShadowRoot`], never off the host. Queries from the page
//!    cannot descend into it, and queries from inside stop at its root.
//! 3. **Template reuse**: markup is parsed once per distinct template (keyed
//!    by its SHA-256 digest) and every instance receives a deep clone.
//! 4. **Empty templates render nothing**: mounting whitespace-only markup is
//!    a no-op and does not consume the scope.

use markup5ever_rcdom::Handle;
use sha2::{Digest, Sha256};
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use crate::dom;
use crate::error::ScopeError;
use crate::selector::{self, MatchContext, Selector};
use crate::style::{ComputedStyle, StyleSheet};

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Parsed templates keyed by the digest of their markup.
#[derive(Default)]
pub struct TemplateCache {
    entries: RefCell<HashMap<String, Vec<Handle>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute_hash(markup: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(markup.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Returns fresh copies of the template's top-level nodes.
    pub fn instantiate(&self, markup: &str) -> Vec<Handle> {
        let digest = Self::compute_hash(markup);
        let mut entries = self.entries.borrow_mut();
        let template = entries.entry(digest).or_insert_with(|| {
            debug!(bytes = markup.len(), "parsing template");
            dom::parse_fragment_nodes(markup)
        });
        template.iter().map(dom::deep_clone).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHADOW ROOT
// ═══════════════════════════════════════════════════════════════════════════════

/// An isolated subtree attached to a host element.
pub struct ShadowRoot {
    host: Handle,
    root: Handle,
    digest: String,
    styles: StyleSheet,
}

impl fmt::Debug for ShadowRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowRoot")
            .field("host", &dom::tag_name(&self.host))
            .field("digest", &self.digest)
            .field("children", &self.root.children.borrow().len())
            .finish()
    }
}

impl ShadowRoot {
    fn new(host: &Handle, markup: &str, cache: &TemplateCache) -> Self {
        let root = dom::create_document();
        for node in cache.instantiate(markup) {
            dom::append_child(&root, &node);
        }

        let mut styles = StyleSheet::default();
        for node in dom::descendants(&root) {
            if dom::tag_name(&node).as_deref() == Some("style") {
                styles.append(&dom::text_content(&node));
            }
        }

        Self {
            host: host.clone(),
            root,
            digest: TemplateCache::compute_hash(markup),
            styles,
        }
    }

    pub fn host(&self) -> &Handle {
        &self.host
    }

    /// The parentless container holding the scope's top-level nodes.
    pub fn root(&self) -> &Handle {
        &self.root
    }

    pub fn template_digest(&self) -> &str {
        &self.digest
    }

    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    fn context(&self) -> MatchContext<'_> {
        MatchContext::scoped(&self.host)
    }

    /// First element inside this scope matching `selector`. Invalid selectors match nothing.
    pub fn query_one(&self, selector: &str) -> Option<Handle> {
        match Selector::parse(selector) {
            Ok(sel) => selector::query_one(&self.root, &sel, self.context()),
            Err(err) => {
                warn!(%err, "query_one with invalid selector");
                None
            }
        }
    }

    pub fn query_all(&self, selector: &str) -> Vec<Handle> {
        match Selector::parse(selector) {
            Ok(sel) => selector::query_all(&self.root, &sel, self.context()),
            Err(err) => {
                warn!(%err, "query_all with invalid selector");
                Vec::new()
            }
        }
    }

    /// True when `node` belongs to this scope's tree.
    pub fn contains(&self, node: &Handle) -> bool {
        let mut current = dom::parent(node);
        while let Some(parent) = current {
            if std::rc::Rc::ptr_eq(&parent, &self.root) {
                return true;
            }
            current = dom::parent(&parent);
        }
        false
    }

    /// Light children of the host assigned to `slot` (`None` = default slot).
    pub fn assigned_nodes(&self, slot: Option<&str>) -> Vec<Handle> {
        self.host
            .children
            .borrow()
            .iter()
            .filter(|child| {
                let assigned = if dom::is_element(child) {
                    dom::get_attr(child, "slot")
                } else {
                    None
                };
                match slot {
                    Some(name) => assigned.as_deref() == Some(name),
                    None => assigned.is_none(),
                }
            })
            .cloned()
            .collect()
    }

    /// Style this scope's sheet gives `node`. Nodes the scope does not own,
    /// other than the host and its slotted children, get nothing.
    pub fn computed_style(&self, node: &Handle) -> ComputedStyle {
        let is_host = std::rc::Rc::ptr_eq(node, &self.host);
        let is_light_child = dom::parent(node)
            .map(|p| std::rc::Rc::ptr_eq(&p, &self.host))
            .unwrap_or(false);
        if !(is_host || is_light_child || self.contains(node)) {
            return ComputedStyle::new();
        }
        self.styles.computed_style(node, self.context())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER SCOPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-component slot that holds its rendering scope once mounted.
#[derive(Default)]
pub struct RenderScope {
    shadow: OnceCell<ShadowRoot>,
}

impl RenderScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the isolated subtree for `host` from `markup`.
    ///
    /// Returns `Ok(None)` for an empty template.
    pub fn mount(
        &self,
        host: &Handle,
        markup: &str,
        cache: &TemplateCache,
    ) -> Result<Option<&ShadowRoot>, ScopeError> {
        let Some(tag) = dom::tag_name(host) else {
            return Err(ScopeError::NotAnElement);
        };
        if self.shadow.get().is_some() {
            return Err(ScopeError::AlreadyAttached { host: tag });
        }
        if markup.trim().is_empty() {
            return Ok(None);
        }

        let shadow = ShadowRoot::new(host, markup, cache);
        debug!(host = %tag, digest = &shadow.digest[..12], "rendering scope attached");
        if self.shadow.set(shadow).is_err() {
            return Err(ScopeError::AlreadyAttached { host: tag });
        }
        Ok(self.shadow.get())
    }

    pub fn shadow(&self) -> Option<&ShadowRoot> {
        self.shadow.get()
    }

    pub fn is_attached(&self) -> bool {
        self.shadow.get().is_some()
    }
}
