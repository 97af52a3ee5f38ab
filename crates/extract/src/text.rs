// ABOUTME: HTML to plain-text normalization shared by every extraction strategy.
// ABOUTME: Drops script/style/frame subtrees, collapses whitespace and keeps block breaks as single newlines.

//! Plain-text normalization.
//!
//! Text is gathered by walking the parsed tree rather than flattening it, so
//! subtrees that never render (scripts, styles, embedded frames) can be skipped
//! wholesale and block-level boundaries survive as line breaks.

use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node};

/// Elements whose whole subtree is ignored.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "frame", "template", "head", "svg",
];

/// Elements that start a new line of text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "header", "footer", "aside", "nav", "main", "blockquote", "pre", "table", "tr", "dl", "dt",
    "dd", "hr", "form", "fieldset", "figure", "figcaption",
];

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Converts an HTML fragment or document into normalized plain text.
///
/// Paragraph-level elements become single newlines, all other whitespace is
/// collapsed and blank lines are removed. Returns an empty string for empty input.
pub fn html_to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(html);
    document_text(&fragment)
}

/// Normalized text of an already-parsed document.
pub fn document_text(doc: &Html) -> String {
    let mut raw = String::new();
    collect_text(doc.tree.root(), &mut raw);
    finish(&raw)
}

/// Normalized text of a single element and its descendants.
pub fn element_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(*el, &mut raw);
    finish(&raw)
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                } else {
                    // inline boundaries still separate words
                    out.push(' ');
                }
                collect_text(child, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn finish(raw: &str) -> String {
    raw.lines()
        .map(normalize_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
