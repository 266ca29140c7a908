//! DOM helpers over `markup5ever_rcdom`.
//!
//! The page, every rendering scope and every parsed template share the same
//! node type ([`Handle`]). These helpers cover the small slice of the DOM API
//! the runtime needs: building nodes, moving them around, attribute and text
//! access, fragment parsing and serialisation.

use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::{parse_fragment, Attribute, LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::RefCell;
use std::rc::Rc;
use tendril::{StrTendril, TendrilSink};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Elements serialised without a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

// ═══════════════════════════════════════════════════════════════════════════════
// NODE CONSTRUCTION
// ═══════════════════════════════════════════════════════════════════════════════

pub fn html_name(local: &str) -> QualName {
    QualName::new(
        None,
        Namespace::from(HTML_NAMESPACE),
        LocalName::from(local.to_ascii_lowercase()),
    )
}

fn attr_name(local: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(local))
}

/// A parentless container node. Used for the page document and for scope roots.
pub fn create_document() -> Handle {
    Node::new(NodeData::Document)
}

pub fn create_element(tag: &str) -> Handle {
    Node::new(NodeData::Element {
        name: html_name(tag),
        attrs: RefCell::new(Vec::new()),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

/// Stable identity of a node for side tables.
pub fn node_key(node: &Handle) -> usize {
    Rc::as_ptr(node) as usize
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE MUTATION
// ═══════════════════════════════════════════════════════════════════════════════

pub fn parent(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

/// Removes `node` from its parent, if it has one.
pub fn detach(node: &Handle) {
    if let Some(parent) = parent(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
    node.parent.set(None);
}

pub fn append_child(parent: &Handle, child: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
}

pub fn prepend_child(parent: &Handle, child: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().insert(0, child.clone());
}

/// Inserts `child` before `reference`; appends when `reference` is not a child of `parent`.
pub fn insert_before(parent: &Handle, child: &Handle, reference: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    let mut children = parent.children.borrow_mut();
    match children.iter().position(|c| Rc::ptr_eq(c, reference)) {
        Some(index) => children.insert(index, child.clone()),
        None => children.push(child.clone()),
    }
}

pub fn remove_children(node: &Handle) {
    let removed: Vec<Handle> = node.children.borrow_mut().drain(..).collect();
    for child in removed {
        child.parent.set(None);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INSPECTION
// ═══════════════════════════════════════════════════════════════════════════════

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

pub fn tag_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

pub fn get_attr(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

pub fn has_attr(node: &Handle, name: &str) -> bool {
    get_attr(node, name).is_some()
}

pub fn set_attr(node: &Handle, name: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|a| &*a.name.local == name) {
            Some(attr) => attr.value = StrTendril::from_slice(value),
            None => attrs.push(Attribute {
                name: attr_name(name),
                value: StrTendril::from_slice(value),
            }),
        }
    }
}

pub fn remove_attr(node: &Handle, name: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        attrs.borrow_mut().retain(|a| &*a.name.local != name);
    }
}

pub fn attributes(node: &Handle) -> Vec<(String, String)> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|a| (a.name.local.to_string(), a.value.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn classes(node: &Handle) -> Vec<String> {
    get_attr(node, "class")
        .map(|c| c.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|c| is_element(c))
        .cloned()
        .collect()
}

/// Every node below `node` in document order, `node` itself excluded.
pub fn descendants(node: &Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    let mut stack: Vec<Handle> = node.children.borrow().iter().rev().cloned().collect();
    while let Some(current) = stack.pop() {
        stack.extend(current.children.borrow().iter().rev().cloned());
        out.push(current);
    }
    out
}

pub fn text_content(node: &Handle) -> String {
    match &node.data {
        NodeData::Text { contents } => contents.borrow().to_string(),
        _ => {
            let mut out = String::new();
            for child in descendants(node) {
                if let NodeData::Text { contents } = &child.data {
                    out.push_str(&contents.borrow());
                }
            }
            out
        }
    }
}

pub fn set_text_content(node: &Handle, text: &str) {
    remove_children(node);
    if !text.is_empty() {
        append_child(node, &create_text(text));
    }
}

/// Form control value: text content for `<textarea>`, the `value` attribute otherwise.
pub fn value(node: &Handle) -> String {
    match tag_name(node).as_deref() {
        Some("textarea") => text_content(node),
        _ => get_attr(node, "value").unwrap_or_default(),
    }
}

pub fn set_value(node: &Handle, value: &str) {
    match tag_name(node).as_deref() {
        Some("textarea") => set_text_content(node, value),
        _ => set_attr(node, "value", value),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING, CLONING, SERIALISATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Parses markup as the content of a `<body>` element and returns the
/// resulting top-level nodes, detached from the parser's document.
pub fn parse_fragment_nodes(markup: &str) -> Vec<Handle> {
    let dom = parse_fragment(
        RcDom::default(),
        ParseOpts::default(),
        html_name("body"),
        Vec::new(),
    )
    .one(StrTendril::from_slice(markup));

    // html5ever places fragment content under a synthetic <html> element.
    let container = dom
        .document
        .children
        .borrow()
        .iter()
        .find(|c| is_element(c))
        .cloned();

    let Some(container) = container else {
        return Vec::new();
    };

    let nodes: Vec<Handle> = container.children.borrow_mut().drain(..).collect();
    for node in &nodes {
        node.parent.set(None);
    }
    nodes
}

/// Copies a subtree. The copy has no parent.
pub fn deep_clone(node: &Handle) -> Handle {
    let data = match &node.data {
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::Text { contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Element {
            name,
            attrs,
            mathml_annotation_xml_integration_point,
            ..
        } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: RefCell::new(None),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        },
        NodeData::ProcessingInstruction { target, contents } => {
            NodeData::ProcessingInstruction {
                target: target.clone(),
                contents: contents.clone(),
            }
        }
    };

    let copy = Node::new(data);
    for child in node.children.borrow().iter() {
        append_child(&copy, &deep_clone(child));
    }
    copy
}

/// Same node kinds, names, attributes, text and children, recursively.
pub fn structurally_equal(a: &Handle, b: &Handle) -> bool {
    let same_data = match (&a.data, &b.data) {
        (NodeData::Document, NodeData::Document) => true,
        (NodeData::Text { contents: x }, NodeData::Text { contents: y }) => {
            *x.borrow() == *y.borrow()
        }
        (NodeData::Comment { contents: x }, NodeData::Comment { contents: y }) => x == y,
        (NodeData::Element { name: n1, .. }, NodeData::Element { name: n2, .. }) => {
            n1 == n2 && attributes(a) == attributes(b)
        }
        (NodeData::Doctype { name: x, .. }, NodeData::Doctype { name: y, .. }) => x == y,
        _ => false,
    };
    if !same_data {
        return false;
    }

    let left = a.children.borrow();
    let right = b.children.borrow();
    left.len() == right.len()
        && left
            .iter()
            .zip(right.iter())
            .all(|(x, y)| structurally_equal(x, y))
}

/// Serialises the children of `node` as HTML.
pub fn inner_html(node: &Handle) -> String {
    let mut bytes = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };
    if serialize(&mut bytes, &SerializableHandle::from(node.clone()), opts).is_err() {
        return String::new();
    }
    String::from_utf8(bytes).unwrap_or_default()
}

pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
