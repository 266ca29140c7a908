//! Markdown rendering collaborator.
//!
//! Components only see [`MarkdownRenderer`]: a pure, deterministic
//! `convert(text) -> (html, metadata)`. [`ComrakMarkdown`] is the built-in
//! renderer. It reads front-matter (a leading block fenced by `---`, or by
//! showdown's `«««`/`»»»`) holding `key: value` lines, and renders the body
//! as CommonMark with the GFM extensions. Raw HTML and unsafe link schemes
//! are dropped.

use comrak::nodes::{AstNode, NodeValue};
use comrak::{format_html, parse_document, Arena, Options};
use std::collections::BTreeMap;
use tracing::warn;

const FRONT_MATTER_FENCE: &str = "---";
const GUILLEMET_OPEN: &str = "«««";
const GUILLEMET_CLOSE: &str = "»»»";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub date: Option<String>,
    /// Remaining front-matter keys.
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub metadata: Metadata,
}

pub trait MarkdownRenderer {
    fn convert(&self, markdown: &str) -> Rendered;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ComrakMarkdown;

impl MarkdownRenderer for ComrakMarkdown {
    fn convert(&self, markdown: &str) -> Rendered {
        let source = normalize_fences(&markdown.replace("\r\n", "\n"));

        let mut options = Options::default();
        options.extension.front_matter_delimiter = Some(FRONT_MATTER_FENCE.to_string());
        options.extension.strikethrough = true;
        options.extension.table = true;
        options.extension.autolink = true;
        options.extension.tasklist = true;

        let arena = Arena::new();
        let root = parse_document(&arena, &source, &options);
        let metadata = front_matter(root)
            .map(|block| parse_front_matter(&block))
            .unwrap_or_default();

        let mut out = Vec::new();
        if let Err(err) = format_html(root, &options, &mut out) {
            warn!(error = %err, "markdown render failed");
            return Rendered { html: String::new(), metadata };
        }

        Rendered {
            html: String::from_utf8_lossy(&out).trim_end().to_string(),
            metadata,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FRONT MATTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Rewrites a leading `«««` … `»»»` block to `---` fences. Anything else is
/// returned untouched.
fn normalize_fences(text: &str) -> String {
    let trimmed = text.trim_start_matches('\n');
    let Some(rest) = trimmed
        .strip_prefix(GUILLEMET_OPEN)
        .and_then(|r| r.strip_prefix('\n'))
    else {
        return text.to_string();
    };

    let mut lines = rest.split_inclusive('\n');
    let mut header = String::new();
    for line in lines.by_ref() {
        if line.trim_end() == GUILLEMET_CLOSE {
            let body: String = lines.collect();
            return format!("{FRONT_MATTER_FENCE}\n{header}{FRONT_MATTER_FENCE}\n{body}");
        }
        header.push_str(line);
    }
    text.to_string()
}

fn front_matter<'a>(root: &'a AstNode<'a>) -> Option<String> {
    root.children().find_map(|node| match &node.data.borrow().value {
        NodeValue::FrontMatter(block) => Some(block.clone()),
        _ => None,
    })
}

fn parse_front_matter(block: &str) -> Metadata {
    let mut metadata = Metadata::default();
    for line in block.lines() {
        if line.trim() == FRONT_MATTER_FENCE {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            continue;
        }
        let value = value.trim().trim_matches('"').to_string();
        match key.as_str() {
            "title" => metadata.title = Some(value),
            "date" => metadata.date = Some(value),
            _ => {
                metadata.extra.insert(key, value);
            }
        }
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(text: &str) -> String {
        ComrakMarkdown.convert(text).html
    }

    #[test]
    fn test_heading_without_front_matter() {
        let out = ComrakMarkdown.convert("# hi");
        assert_eq!(out.html, "<h1>hi</h1>");
        assert_eq!(out.metadata, Metadata::default());
    }

    #[test]
    fn test_front_matter_is_extracted() {
        let text = "---\ntitle: Night\ndate: 2024-03-01\ntags: dark\n---\nbody text";
        let out = ComrakMarkdown.convert(text);
        assert_eq!(out.metadata.title.as_deref(), Some("Night"));
        assert_eq!(out.metadata.date.as_deref(), Some("2024-03-01"));
        assert_eq!(out.metadata.extra.get("tags").map(String::as_str), Some("dark"));
        assert_eq!(out.html, "<p>body text</p>");
    }

    #[test]
    fn test_guillemet_front_matter() {
        let out = ComrakMarkdown.convert("«««\ntitle: Alt\n»»»\n# h");
        assert_eq!(out.metadata.title.as_deref(), Some("Alt"));
        assert_eq!(out.html, "<h1>h</h1>");
    }

    #[test]
    fn test_unterminated_front_matter_is_body() {
        let out = ComrakMarkdown.convert("---\ntitle: x");
        assert!(out.metadata.title.is_none());
        assert!(out.html.contains("title: x"));
    }

    #[test]
    fn test_block_forms() {
        assert_eq!(html("1. one\n2. two"), "<ol>\n<li>one</li>\n<li>two</li>\n</ol>");
        assert_eq!(html("> quote"), "<blockquote>\n<p>quote</p>\n</blockquote>");
        assert!(html("- one\n- two").starts_with("<ul>"));
        assert_eq!(
            html("```\n<b>raw</b>\n```"),
            "<pre><code>&lt;b&gt;raw&lt;/b&gt;\n</code></pre>"
        );
    }

    #[test]
    fn test_nested_emphasis() {
        assert_eq!(
            html("**a *b* c**"),
            "<p><strong>a <em>b</em> c</strong></p>"
        );
    }

    #[test]
    fn test_unsafe_links_and_raw_html_are_dropped() {
        let link = html("[x](javascript:alert(1))");
        assert!(!link.contains("javascript"));
        assert!(link.contains(">x</a>"));

        let raw = html("a <script>alert(1)</script>");
        assert!(!raw.contains("<script>"));
    }

    #[test]
    fn test_control_bytes_pass_through_as_text() {
        let out = html("a \u{0}0\u{0} `code`");
        assert!(out.contains("<code>code</code>"));
        assert!(out.starts_with("<p>a "));
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let text = "# t\n\nsome *text*";
        assert_eq!(ComrakMarkdown.convert(text), ComrakMarkdown.convert(text));
    }
}
