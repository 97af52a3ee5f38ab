// ABOUTME: Record merger reducing priority-ordered partial extractions into one canonical Record.
// ABOUTME: First non-empty value wins per field; skills always come from markup; description text is derived.

//! Record merging.
//!
//! Field resolution table:
//!
//! | field              | rule                                                          |
//! |--------------------|---------------------------------------------------------------|
//! | title              | first non-empty in source order; its origin is recorded      |
//! | company, location, salary_text, job_type, date_posted, description_html, external_id, bid_count | first non-empty in source order |
//! | skills             | markup source only, order of first appearance                 |
//! | description_text   | markup text if present, else text of the winning description_html |
//! | category           | crawl input, then any source, then a guess from the URL path  |

use crate::page::Page;
use crate::record::{Origin, PartialExtraction, Record};
use crate::text::html_to_text;
use crate::{markup, structured};

/// Path prefixes whose following segment names a category.
pub const CATEGORY_PATH_PREFIXES: &[&str] = &["jobs", "projects"];

/// One strategy's output, tagged with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub origin: Origin,
    pub partial: PartialExtraction,
}

impl Source {
    pub fn new(origin: Origin, partial: PartialExtraction) -> Self {
        Self { origin, partial }
    }
}

/// Static context a record is merged under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeContext {
    pub source_url: String,
    /// Category requested as crawl input, if any.
    pub category: Option<String>,
}

impl MergeContext {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category.filter(|c| !c.trim().is_empty());
        self
    }
}

/// Merges `sources`, highest priority first, into one record.
///
/// The result is not gated; callers check [`Record::has_content`] before emitting.
pub fn merge(sources: &[Source], ctx: &MergeContext) -> Record {
    let pick = |get: fn(&PartialExtraction) -> Option<&String>| first_non_empty(sources, get);

    let title = pick(|p| p.title.as_ref());
    let description_html = pick(|p| p.description_html.as_ref()).map(|(_, v)| v);

    let markup = sources.iter().find(|s| s.origin == Origin::Markup);
    let description_text = markup
        .and_then(|s| non_empty(s.partial.description_text.as_ref()))
        .or_else(|| {
            description_html
                .as_deref()
                .map(html_to_text)
                .filter(|t| !t.is_empty())
        });

    let category = ctx
        .category
        .clone()
        .or_else(|| pick(|p| p.category.as_ref()).map(|(_, v)| v))
        .or_else(|| category_from_url(&ctx.source_url));

    Record {
        origin: title.as_ref().map(|(origin, _)| *origin),
        title: title.map(|(_, v)| v),
        company: pick(|p| p.company.as_ref()).map(|(_, v)| v),
        category,
        location: pick(|p| p.location.as_ref()).map(|(_, v)| v),
        salary_text: pick(|p| p.salary_text.as_ref()).map(|(_, v)| v),
        job_type: pick(|p| p.job_type.as_ref()).map(|(_, v)| v),
        skills: markup.map(|s| s.partial.skills.clone()).unwrap_or_default(),
        date_posted: pick(|p| p.date_posted.as_ref()).map(|(_, v)| v),
        description_html,
        description_text,
        external_id: pick(|p| p.external_id.as_ref()).map(|(_, v)| v),
        bid_count: pick(|p| p.bid_count.as_ref()).map(|(_, v)| v),
        source_url: ctx.source_url.clone(),
    }
}

/// Runs the detail-page strategy chain, structured data before markup, and merges the results.
pub fn resolve(page: &Page, ctx: &MergeContext) -> Record {
    let mut sources = Vec::with_capacity(2);
    if let Some(partial) = structured::extract(page) {
        sources.push(Source::new(Origin::StructuredData, partial));
    }
    sources.push(Source::new(Origin::Markup, markup::extract(page)));
    merge(&sources, ctx)
}

fn first_non_empty(
    sources: &[Source],
    get: fn(&PartialExtraction) -> Option<&String>,
) -> Option<(Origin, String)> {
    sources
        .iter()
        .find_map(|s| non_empty(get(&s.partial)).map(|v| (s.origin, v)))
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Segment after a known prefix, hyphens to spaces, title-cased.
///
/// `/jobs/web-design/3` gives `Web Design`. Numeric segments are not categories.
pub fn category_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();
    let slug = segments
        .windows(2)
        .find(|w| CATEGORY_PATH_PREFIXES.contains(&w[0]))
        .map(|w| w[1])?;
    if slug.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let words: Vec<String> = slug
        .split(|c| c == '-' || c == '_')
        .filter(|w| !w.is_empty())
        .map(title_case)
        .collect();
    (!words.is_empty()).then(|| words.join(" "))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
