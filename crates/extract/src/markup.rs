// ABOUTME: Markup strategy resolving record fields from visible HTML through ordered locator chains.
// ABOUTME: Each field walks from the most page-specific selector to a generic text-pattern scan.

//! Markup extraction.
//!
//! Class names on the source site change between deployments, so every field
//! is resolved by an ordered locator table rather than a single selector. The
//! tables below are the contract: earlier entries win, later ones are
//! progressively more generic, and a page-wide pattern scan comes last.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::page::Page;
use crate::record::PartialExtraction;
use crate::select::{first_attr, first_block, first_text, select_all};
use crate::text::normalize_whitespace;

/// Title: page-specific heading, generic "title" classes, first `<h1>`.
pub const TITLE_LOCATORS: &[&str] = &[
    "h1.PageProjectViewLogout-title",
    "h1[class*='project-title']",
    "[class*='ProjectTitle']",
    "h1[class*='title'], h1[class*='Title']",
    ".title, .job-title",
    "h1",
];

/// Budget: page-specific budget class, then anything budget- or price-like.
pub const BUDGET_LOCATORS: &[&str] = &[
    "p.PageProjectViewLogout-budget",
    "[class*='ProjectBudget']",
    "[class*='Budget'], [class*='budget']",
    "[class*='Price'], [class*='price']",
];

/// Description: page-specific detail container, description classes, first article.
pub const DESCRIPTION_LOCATORS: &[&str] = &[
    "div.PageProjectViewLogout-detail",
    ".project-details",
    "[class*='ProjectDescription']",
    "[class*='description'], [class*='Description']",
    "article",
];

pub const COMPANY_LOCATORS: &[&str] = &[
    "[class*='AboutBuyer'] a",
    "[class*='client'] a",
    "[class*='employer'] a",
    ".ClientInfo a",
];

pub const LOCATION_LOCATORS: &[&str] = &["[class*='Location']", "[class*='location']"];

/// Elements consulted for the job type when the page text names none.
const JOB_TYPE_FALLBACK_LOCATORS: &[&str] = &["[class*='type'], [class*='Type']"];

const FIXED_PRICE: &str = "Fixed Price";
const HOURLY: &str = "Hourly";

/// Phrase families for the job type; lowercase, matched against lowercase text.
const FIXED_PRICE_PHRASES: &[&str] = &["fixed price", "fixed-price", "fixed budget"];
const HOURLY_PHRASES: &[&str] = &["hourly", "per hour"];

/// Skill taxonomy links: `/jobs/<slug>` with nothing after the slug.
static TAXONOMY_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/jobs/[A-Za-z0-9_-]+/?$").unwrap());

static CURRENCY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (?:[$€£₹]\s?\d[\d,]*(?:\.\d+)?(?:\s*[-–]\s*[$€£₹]?\s?\d[\d,]*(?:\.\d+)?)?(?:\s*(?:USD|EUR|GBP|AUD|CAD|INR))?)
        |
        (?:\b(?:USD|EUR|GBP|AUD|CAD|INR)\s?\d[\d,]*(?:\.\d+)?(?:\s*[-–]\s*\d[\d,]*(?:\.\d+)?)?)
        ",
    )
    .unwrap()
});

static POSTED_AGO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:posted\s+)?(?:\d+\s+(?:second|minute|hour|day|week|month|year)s?\s+ago|less than (?:a|an|one|\d+)\s+\w+\s+ago)",
    )
    .unwrap()
});

static URL_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|[-/])(\d+)/?$").unwrap());
static PROJECT_ID_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)project\s*id[:#\s]*(\d+)").unwrap());
static BID_COUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*bids?\b").unwrap());

static JOB_TYPE_MATCHER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasickBuilder::new()
        .match_kind(MatchKind::LeftmostFirst)
        .build(FIXED_PRICE_PHRASES.iter().chain(HOURLY_PHRASES))
        .unwrap()
});

const MIN_SKILL_CHARS: usize = 2;
const MAX_SKILL_CHARS: usize = 49;

/// Best-effort extraction from visible markup. Never fails; missing fields stay `None`.
pub fn extract(page: &Page) -> PartialExtraction {
    let doc = page.document();
    let (description_html, description_text) = match first_block(doc, DESCRIPTION_LOCATORS) {
        Some((html, text)) => (Some(html), Some(text)),
        None => (None, None),
    };

    PartialExtraction {
        title: first_text(doc, TITLE_LOCATORS),
        company: first_text(doc, COMPANY_LOCATORS),
        location: first_text(doc, LOCATION_LOCATORS),
        salary_text: budget(page),
        job_type: job_type(page),
        skills: skills(page),
        date_posted: date_posted(page),
        description_html,
        description_text,
        external_id: external_id(page),
        bid_count: capture(&BID_COUNT_RE, page.text()),
        ..Default::default()
    }
}

fn budget(page: &Page) -> Option<String> {
    first_text(page.document(), BUDGET_LOCATORS).or_else(|| {
        CURRENCY_RE
            .find(page.text())
            .map(|m| normalize_whitespace(m.as_str()))
    })
}

/// Page text first; typed elements only when the text names neither family.
fn job_type(page: &Page) -> Option<String> {
    if let Some(kind) = classify_job_type(&page.text().to_lowercase()) {
        return Some(kind.to_string());
    }
    for &css in JOB_TYPE_FALLBACK_LOCATORS {
        for el in select_all(page.document(), css) {
            let text = el.text().collect::<String>().to_lowercase();
            if let Some(kind) = classify_job_type(&text) {
                return Some(kind.to_string());
            }
        }
    }
    None
}

/// The family whose phrase appears earliest in `lowercase` wins.
fn classify_job_type(lowercase: &str) -> Option<&'static str> {
    let found = JOB_TYPE_MATCHER.find(lowercase)?;
    if found.pattern().as_usize() < FIXED_PRICE_PHRASES.len() {
        Some(FIXED_PRICE)
    } else {
        Some(HOURLY)
    }
}

fn skills(page: &Page) -> IndexSet<String> {
    let mut out = IndexSet::new();
    for anchor in select_all(page.document(), "a[href]") {
        let Some(target) = anchor.value().attr("href").and_then(|h| page.resolve(h)) else {
            continue;
        };
        if !TAXONOMY_PATH_RE.is_match(target.path()) {
            continue;
        }
        let label = normalize_whitespace(&anchor.text().collect::<Vec<_>>().join(" "));
        let len = label.chars().count();
        if len < MIN_SKILL_CHARS || len > MAX_SKILL_CHARS {
            continue;
        }
        if label.to_lowercase().contains("browse") {
            continue;
        }
        out.insert(label);
    }
    out
}

fn date_posted(page: &Page) -> Option<String> {
    let doc = page.document();
    first_attr(doc, &["time[datetime]"], "datetime")
        .or_else(|| first_text(doc, &["time"]))
        .or_else(|| {
            POSTED_AGO_RE
                .find(page.text())
                .map(|m| normalize_whitespace(m.as_str()))
        })
}

/// Numeric suffix of the URL path, else an explicit "Project ID" label.
fn external_id(page: &Page) -> Option<String> {
    capture(&URL_ID_RE, page.url().path()).or_else(|| capture(&PROJECT_ID_LABEL_RE, page.text()))
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
