// ABOUTME: Ordered selector helpers for pulling text, HTML and attributes out of a parsed page.
// ABOUTME: Each helper walks its selector list in order and returns the first non-empty match.

//! Selector-based locators.
//!
//! Key behaviors:
//! - Selectors are tried in order; the first one yielding a non-empty value wins.
//! - Within a selector, elements are tried in document order.
//! - Invalid selectors are skipped rather than reported.
//! - Text is whitespace-normalized; empty strings are treated as no match.

use scraper::{ElementRef, Html, Selector};

use crate::text::{element_text, normalize_whitespace};

/// Elements matching `css`, or nothing when the selector does not parse.
pub fn select_all<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(sel) => doc.select(&sel).collect(),
        Err(_) => Vec::new(),
    }
}

/// Single-line text of the first element, across `selectors`, whose text is non-empty.
pub fn first_text(doc: &Html, selectors: &[&str]) -> Option<String> {
    for &css in selectors {
        for el in select_all(doc, css) {
            let text = normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "));
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Inner HTML and normalized text of the first element with non-empty text.
pub fn first_block(doc: &Html, selectors: &[&str]) -> Option<(String, String)> {
    for &css in selectors {
        for el in select_all(doc, css) {
            let text = element_text(el);
            if !text.is_empty() {
                return Some((el.inner_html().trim().to_string(), text));
            }
        }
    }
    None
}

/// Trimmed value of `attr` on the first matching element that carries it non-empty.
pub fn first_attr(doc: &Html, selectors: &[&str], attr: &str) -> Option<String> {
    for &css in selectors {
        for el in select_all(doc, css) {
            if let Some(value) = el.value().attr(attr) {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}
