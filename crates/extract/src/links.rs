// ABOUTME: Link discovery for listing pages: detail-page URLs and the next listing page.
// ABOUTME: Next page prefers an explicit rel=next link, else synthesizes one from the trailing page number.

use indexmap::IndexSet;
use url::Url;

use crate::page::Page;
use crate::select::{first_attr, select_all};

/// Path marker identifying a detail page.
pub const DETAIL_MARKER: &str = "/projects/";

/// Markers that disqualify an otherwise matching detail link.
pub const EXCLUDED_MARKERS: &[&str] = &["/contests/", "/repost"];

/// Explicit "next" navigation, in priority order.
const NEXT_PAGE_LOCATORS: &[&str] = &[
    "link[rel='next']",
    "a[rel='next']",
    ".pagination a[rel='next']",
];

/// What a listing page points at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovered {
    /// Absolute detail URLs in first-seen order, without duplicates.
    pub detail_urls: IndexSet<String>,
    pub next_page_url: Option<String>,
}

/// Runs detail-link and next-page discovery over a listing page.
pub fn discover(page: &Page, current_page: u32) -> Discovered {
    Discovered {
        detail_urls: detail_urls(page),
        next_page_url: next_page_url(page, current_page),
    }
}

/// Every anchor whose resolved path carries the detail marker and no excluded marker.
pub fn detail_urls(page: &Page) -> IndexSet<String> {
    select_all(page.document(), "a[href]")
        .into_iter()
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| page.resolve(href))
        .filter(|url| is_detail_path(url.path()))
        .map(String::from)
        .collect()
}

fn is_detail_path(path: &str) -> bool {
    path.contains(DETAIL_MARKER) && !EXCLUDED_MARKERS.iter().any(|m| path.contains(m))
}

/// Explicit rel=next if the markup exposes one, else the synthesized successor.
pub fn next_page_url(page: &Page, current_page: u32) -> Option<String> {
    first_attr(page.document(), NEXT_PAGE_LOCATORS, "href")
        .and_then(|href| page.resolve(&href))
        .map(String::from)
        .or_else(|| synthesize_next_page(page.url(), current_page))
}

/// Replaces a trailing numeric path segment (or appends one) with `current_page + 1`.
pub fn synthesize_next_page(url: &Url, current_page: u32) -> Option<String> {
    let mut segments: Vec<&str> = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .collect();
    if segments
        .last()
        .map_or(false, |s| s.chars().all(|c| c.is_ascii_digit()))
    {
        segments.pop();
    }
    let next = current_page.checked_add(1)?.to_string();
    segments.push(&next);

    let mut out = url.clone();
    out.set_path(&format!("/{}", segments.join("/")));
    Some(out.into())
}
