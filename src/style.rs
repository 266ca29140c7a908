//! Scoped style sheets.
//!
//! A rendering scope collects the text of its `<style>` elements into a
//! [`StyleSheet`]. Rules are only ever evaluated against nodes the scope owns
//! (plus its host and slotted light children), which is what keeps template
//! styles from leaking in either direction.

use lazy_static::lazy_static;
use markup5ever_rcdom::Handle;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

use crate::selector::{MatchContext, Selector, Specificity};

lazy_static! {
    static ref COMMENT_RE: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();
    static ref PROPERTY_RE: Regex = Regex::new(r"^(--[A-Za-z0-9_-]+|-?[A-Za-z][A-Za-z0-9-]*)$").unwrap();
    static ref VAR_RE: Regex = Regex::new(r"var\(\s*(--[A-Za-z0-9_-]+)\s*(?:,\s*([^)]*))?\)").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selector: Selector,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    pub rules: Vec<StyleRule>,
    /// Declarations dropped for not having a `property: value` shape.
    pub malformed: Vec<String>,
}

/// Resolved property values for one node.
pub type ComputedStyle = BTreeMap<String, String>;

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

impl StyleSheet {
    pub fn parse(css: &str) -> Self {
        let mut sheet = StyleSheet::default();
        sheet.append(css);
        sheet
    }

    /// Parses `css` and appends its rules after the existing ones.
    pub fn append(&mut self, css: &str) {
        let css = COMMENT_RE.replace_all(css, "");
        let mut rest: &str = &css;

        while let Some(open) = rest.find('{') {
            let prelude = rest[..open].trim();
            let Some(close) = rest[open..].find('}').map(|i| open + i) else {
                debug!(prelude, "unterminated style rule dropped");
                break;
            };
            let body = &rest[open + 1..close];
            rest = &rest[close + 1..];

            let selector = match Selector::parse(prelude) {
                Ok(sel) => sel,
                Err(err) => {
                    debug!(%err, "style rule with unsupported selector dropped");
                    continue;
                }
            };

            let mut declarations = Vec::new();
            for raw in body.split(';') {
                let raw = raw.trim();
                if raw.is_empty() {
                    continue;
                }
                match parse_declaration(raw) {
                    Some(decl) => declarations.push(decl),
                    None => {
                        debug!(declaration = raw, "malformed declaration ignored");
                        self.malformed.push(raw.to_string());
                    }
                }
            }

            self.rules.push(StyleRule {
                selector,
                declarations,
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Cascades every matching rule onto `node`: higher specificity wins,
    /// later rules win ties. Custom properties referenced through `var()` are
    /// substituted from the same result.
    pub fn computed_style(&self, node: &Handle, ctx: MatchContext<'_>) -> ComputedStyle {
        let mut matched: Vec<(Specificity, usize, &StyleRule)> = self
            .rules
            .iter()
            .enumerate()
            .filter_map(|(order, rule)| {
                rule.selector
                    .matching_specificity(node, ctx)
                    .map(|spec| (spec, order, rule))
            })
            .collect();
        matched.sort_by_key(|(spec, order, _)| (*spec, *order));

        let mut style = ComputedStyle::new();
        for (_, _, rule) in matched {
            for decl in &rule.declarations {
                style.insert(decl.property.clone(), decl.value.clone());
            }
        }
        resolve_vars(&mut style);
        style
    }
}

fn parse_declaration(raw: &str) -> Option<Declaration> {
    let (property, value) = raw.split_once(':')?;
    let property = property.trim();
    let value = value.trim();
    if !PROPERTY_RE.is_match(property) || value.is_empty() {
        return None;
    }
    Some(Declaration {
        property: property.to_ascii_lowercase(),
        value: value.to_string(),
    })
}

fn resolve_vars(style: &mut ComputedStyle) {
    let custom: BTreeMap<String, String> = style
        .iter()
        .filter(|(k, _)| k.starts_with("--"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    for value in style.values_mut() {
        if !value.contains("var(") {
            continue;
        }
        let resolved = VAR_RE.replace_all(value, |caps: &regex::Captures| {
            custom
                .get(&caps[1])
                .cloned()
                .or_else(|| caps.get(2).map(|m| m.as_str().trim().to_string()))
                .unwrap_or_default()
        });
        *value = resolved.into_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;

    #[test]
    fn test_malformed_declaration_is_dropped() {
        let sheet = StyleSheet::parse(":host div { color #666 }");
        assert_eq!(sheet.rules.len(), 1);
        assert!(sheet.rules[0].declarations.is_empty());
        assert_eq!(sheet.malformed, vec!["color #666".to_string()]);
    }

    #[test]
    fn test_comments_and_multiple_rules() {
        let sheet = StyleSheet::parse(
            "/* layout */ :host { display: block; width: 800px } :host textarea { display: block; }",
        );
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[0].declarations.len(), 2);
        assert_eq!(sheet.rules[0].declarations[1].value, "800px");
    }

    #[test]
    fn test_custom_property_substitution() {
        let host = dom::create_element("dm-footer");
        let sheet = StyleSheet::parse(":host { --color: #ccc; color: var(--color); border-top: 1px solid var(--color) }");
        let style = sheet.computed_style(&host, MatchContext::scoped(&host));
        assert_eq!(style.get("color").map(String::as_str), Some("#ccc"));
        assert_eq!(
            style.get("border-top").map(String::as_str),
            Some("1px solid #ccc")
        );
    }

    #[test]
    fn test_specificity_beats_order() {
        let root = dom::create_document();
        let p = dom::create_element("p");
        dom::set_attr(&p, "class", "lead");
        dom::append_child(&root, &p);

        let sheet = StyleSheet::parse("p.lead { color: red } p { color: blue }");
        let style = sheet.computed_style(&p, MatchContext::unscoped());
        assert_eq!(style.get("color").map(String::as_str), Some("red"));
    }
}
