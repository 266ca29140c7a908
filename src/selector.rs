//! A small CSS selector engine.
//!
//! Supports type, universal, `#id`, `.class`, `[attr]`, `[attr=value]`,
//! descendant and child combinators, selector lists, and the two
//! shadow-scoped pseudo selectors `:host` and `::slotted(..)`.
//!
//! Matching is bounded: ancestor walks stop at the first parentless node or
//! document node, so a selector evaluated inside a rendering scope can never
//! reach the page around it.

use markup5ever_rcdom::{Handle, NodeData};
use std::fmt;

use crate::dom;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid selector `{}`: {}", self.selector, self.reason)
    }
}

impl std::error::Error for SelectorError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrMatch {
    Exists(String),
    Equals(String, String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrMatch>,
    pub host: bool,
    pub slotted: Option<Box<Compound>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// One comma-separated branch: compounds joined by combinators, left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Complex {
    pub head: Compound,
    pub tail: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub source: String,
    pub branches: Vec<Complex>,
}

/// Specificity as (ids, classes/attributes/pseudos, types).
pub type Specificity = (u32, u32, u32);

/// What `:host` should resolve to while matching.
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    pub host: Option<&'a Handle>,
}

impl<'a> MatchContext<'a> {
    pub fn unscoped() -> Self {
        Self { host: None }
    }

    pub fn scoped(host: &'a Handle) -> Self {
        Self { host: Some(host) }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let mut branches = Vec::new();
        for branch in split_top_level(source, ',') {
            let branch = branch.trim();
            if branch.is_empty() {
                return Err(error(source, "empty selector"));
            }
            branches.push(parse_complex(source, branch)?);
        }
        if branches.is_empty() {
            return Err(error(source, "empty selector"));
        }
        Ok(Self {
            source: source.trim().to_string(),
            branches,
        })
    }

    /// True when any branch matches `node`.
    pub fn matches(&self, node: &Handle, ctx: MatchContext<'_>) -> bool {
        self.branches.iter().any(|b| b.matches(node, ctx))
    }

    /// Specificity of the most specific branch matching `node`.
    pub fn matching_specificity(&self, node: &Handle, ctx: MatchContext<'_>) -> Option<Specificity> {
        self.branches
            .iter()
            .filter(|b| b.matches(node, ctx))
            .map(Complex::specificity)
            .max()
    }
}

fn error(selector: &str, reason: &str) -> SelectorError {
    SelectorError {
        selector: selector.to_string(),
        reason: reason.to_string(),
    }
}

/// Splits on `sep` outside of brackets, parentheses and quotes.
fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '(') | (None, '[') => depth += 1,
            (None, ')') | (None, ']') => depth -= 1,
            (None, c) if c == sep && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn parse_complex(source: &str, branch: &str) -> Result<Complex, SelectorError> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;

    for c in branch.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                current.push(c);
            }
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth -= 1;
                current.push(c);
            }
            '>' if depth == 0 => {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_string());
                }
                current.clear();
                tokens.push(">".to_string());
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if quote.is_some() || depth != 0 {
        return Err(error(source, "unbalanced brackets or quotes"));
    }
    if !current.trim().is_empty() {
        tokens.push(current.trim().to_string());
    }

    let mut iter = tokens.into_iter();
    let first = iter.next().ok_or_else(|| error(source, "empty selector"))?;
    if first == ">" {
        return Err(error(source, "selector starts with a combinator"));
    }
    let head = parse_compound(source, &first)?;
    let mut tail = Vec::new();
    let mut pending = Combinator::Descendant;
    let mut expecting_compound = false;
    for token in iter {
        if token == ">" {
            if expecting_compound {
                return Err(error(source, "repeated combinator"));
            }
            pending = Combinator::Child;
            expecting_compound = true;
            continue;
        }
        tail.push((pending, parse_compound(source, &token)?));
        pending = Combinator::Descendant;
        expecting_compound = false;
    }
    if expecting_compound {
        return Err(error(source, "selector ends with a combinator"));
    }
    Ok(Complex { head, tail })
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && is_ident_char(chars[*pos]) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn parse_compound(source: &str, token: &str) -> Result<Compound, SelectorError> {
    let chars: Vec<char> = token.chars().collect();
    let mut pos = 0;
    let mut compound = Compound::default();

    if pos < chars.len() && chars[pos] == '*' {
        pos += 1;
    } else if pos < chars.len() && is_ident_char(chars[pos]) {
        compound.tag = Some(take_ident(&chars, &mut pos).to_ascii_lowercase());
    }

    while pos < chars.len() {
        match chars[pos] {
            '#' => {
                pos += 1;
                let id = take_ident(&chars, &mut pos);
                if id.is_empty() {
                    return Err(error(source, "empty id"));
                }
                compound.id = Some(id);
            }
            '.' => {
                pos += 1;
                let class = take_ident(&chars, &mut pos);
                if class.is_empty() {
                    return Err(error(source, "empty class"));
                }
                compound.classes.push(class);
            }
            '[' => {
                let end = chars[pos..]
                    .iter()
                    .position(|&c| c == ']')
                    .map(|i| pos + i)
                    .ok_or_else(|| error(source, "unterminated attribute selector"))?;
                let inner: String = chars[pos + 1..end].iter().collect();
                compound.attrs.push(parse_attr(source, &inner)?);
                pos = end + 1;
            }
            ':' => {
                let rest: String = chars[pos..].iter().collect();
                if let Some(after) = rest.strip_prefix("::slotted(") {
                    let close = after
                        .rfind(')')
                        .ok_or_else(|| error(source, "unterminated ::slotted("))?;
                    let inner = parse_compound(source, after[..close].trim())?;
                    compound.slotted = Some(Box::new(inner));
                    pos += "::slotted(".chars().count() + after[..=close].chars().count();
                } else if rest.starts_with(":host") {
                    compound.host = true;
                    pos += ":host".len();
                } else {
                    return Err(error(source, "unsupported pseudo selector"));
                }
            }
            _ => return Err(error(source, "unexpected character")),
        }
    }

    Ok(compound)
}

fn parse_attr(source: &str, inner: &str) -> Result<AttrMatch, SelectorError> {
    match inner.split_once('=') {
        None => {
            let name = inner.trim();
            if name.is_empty() {
                return Err(error(source, "empty attribute name"));
            }
            Ok(AttrMatch::Exists(name.to_string()))
        }
        Some((name, value)) => {
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            Ok(AttrMatch::Equals(name.trim().to_string(), value.to_string()))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MATCHING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parent within the current tree, stopping at document-like roots.
fn bounded_parent(node: &Handle) -> Option<Handle> {
    dom::parent(node).filter(|p| !matches!(p.data, NodeData::Document))
}

impl Compound {
    fn specificity(&self) -> Specificity {
        let mut s = (
            self.id.is_some() as u32,
            (self.classes.len() + self.attrs.len()) as u32 + self.host as u32,
            self.tag.is_some() as u32,
        );
        if let Some(inner) = &self.slotted {
            let i = inner.specificity();
            s = (s.0 + i.0, s.1 + i.1 + 1, s.2 + i.2);
        }
        s
    }

    fn matches_plain(&self, node: &Handle) -> bool {
        let Some(tag) = dom::tag_name(node) else {
            return false;
        };
        if let Some(want) = &self.tag {
            if *want != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if dom::get_attr(node, "id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let have = dom::classes(node);
            if !self.classes.iter().all(|c| have.contains(c)) {
                return false;
            }
        }
        self.attrs.iter().all(|attr| match attr {
            AttrMatch::Exists(name) => dom::has_attr(node, name),
            AttrMatch::Equals(name, value) => {
                dom::get_attr(node, name).as_deref() == Some(value.as_str())
            }
        })
    }

    fn matches(&self, node: &Handle, ctx: MatchContext<'_>) -> bool {
        // The host is featureless from inside its scope except through `:host`.
        let is_host_node = ctx
            .host
            .map(|h| std::rc::Rc::ptr_eq(h, node))
            .unwrap_or(false);
        if is_host_node && !self.host {
            return false;
        }
        if self.host {
            let Some(host) = ctx.host else {
                return false;
            };
            if !std::rc::Rc::ptr_eq(host, node) {
                return false;
            }
            return self.matches_plain(node);
        }
        if let Some(inner) = &self.slotted {
            // Slotted nodes are light children of the host carrying a `slot` attribute.
            let Some(host) = ctx.host else {
                return false;
            };
            let is_light_child = dom::parent(node)
                .map(|p| std::rc::Rc::ptr_eq(&p, host))
                .unwrap_or(false);
            return is_light_child && dom::has_attr(node, "slot") && inner.matches_plain(node);
        }
        self.matches_plain(node)
    }
}

impl Complex {
    fn specificity(&self) -> Specificity {
        let mut total = self.head.specificity();
        for (_, compound) in &self.tail {
            let s = compound.specificity();
            total = (total.0 + s.0, total.1 + s.1, total.2 + s.2);
        }
        total
    }

    fn matches(&self, node: &Handle, ctx: MatchContext<'_>) -> bool {
        let mut compounds: Vec<(Option<Combinator>, &Compound)> = vec![(None, &self.head)];
        compounds.extend(self.tail.iter().map(|(c, comp)| (Some(*c), comp)));
        match_from(&compounds, compounds.len() - 1, node, ctx)
    }
}

/// Host element seen from inside a scope: the `:host` compound may sit above
/// the scope root.
fn parent_or_host(node: &Handle, ctx: MatchContext<'_>) -> Option<Handle> {
    match bounded_parent(node) {
        Some(p) => Some(p),
        None => {
            let raw = dom::parent(node);
            let at_scope_root = raw
                .as_ref()
                .map(|p| matches!(p.data, NodeData::Document))
                .unwrap_or(false);
            if at_scope_root {
                ctx.host.cloned()
            } else {
                None
            }
        }
    }
}

fn match_from(
    compounds: &[(Option<Combinator>, &Compound)],
    index: usize,
    node: &Handle,
    ctx: MatchContext<'_>,
) -> bool {
    let (combinator, compound) = compounds[index];
    if !compound.matches(node, ctx) {
        return false;
    }
    let Some(combinator) = combinator else {
        return true;
    };
    let mut ancestor = parent_or_host(node, ctx);
    while let Some(current) = ancestor {
        if match_from(compounds, index - 1, &current, ctx) {
            return true;
        }
        if combinator == Combinator::Child {
            return false;
        }
        let is_host = ctx
            .host
            .map(|h| std::rc::Rc::ptr_eq(h, &current))
            .unwrap_or(false);
        ancestor = if is_host {
            None
        } else {
            parent_or_host(&current, ctx)
        };
    }
    false
}

/// First element below `root` (exclusive) matching `selector`.
pub fn query_one(root: &Handle, selector: &Selector, ctx: MatchContext<'_>) -> Option<Handle> {
    dom::descendants(root)
        .into_iter()
        .find(|n| dom::is_element(n) && selector.matches(n, ctx))
}

pub fn query_all(root: &Handle, selector: &Selector, ctx: MatchContext<'_>) -> Vec<Handle> {
    dom::descendants(root)
        .into_iter()
        .filter(|n| dom::is_element(n) && selector.matches(n, ctx))
        .collect()
}
