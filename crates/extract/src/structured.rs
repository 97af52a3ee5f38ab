// ABOUTME: Structured-data strategy reading embedded JSON-LD JobPosting blocks.
// ABOUTME: The first JobPosting in document order wins; malformed blocks are skipped silently.

//! JSON-LD `JobPosting` extraction.
//!
//! A page may carry several `application/ld+json` scripts, each holding a
//! single object, an array of objects, or an object with an `@graph` array.
//! Candidates are visited in document order and the first one typed
//! `JobPosting` is mapped with a fixed field table.

use scraper::Html;
use serde_json::Value;

use crate::record::PartialExtraction;
use crate::select::select_all;

const JOB_POSTING_TYPE: &str = "JobPosting";

/// Extracts a partial record from the first JSON-LD `JobPosting` on the page.
///
/// Returns `None` only when no block on the page matches the type filter.
pub fn extract(page: &crate::Page) -> Option<PartialExtraction> {
    extract_from_document(page.document())
}

fn extract_from_document(doc: &Html) -> Option<PartialExtraction> {
    for script in select_all(doc, "script[type='application/ld+json']") {
        let raw = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(raw.trim()) else {
            continue;
        };
        if let Some(posting) = candidates(&value).into_iter().find(|c| is_job_posting(c)) {
            return Some(map_posting(posting));
        }
    }
    None
}

/// Candidate objects of one block, in document order.
fn candidates(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(candidates).collect(),
        Value::Object(map) => {
            let mut out = vec![value];
            if let Some(Value::Array(graph)) = map.get("@graph") {
                out.extend(graph.iter().filter(|v| v.is_object()));
            }
            out
        }
        _ => Vec::new(),
    }
}

fn is_job_posting(value: &Value) -> bool {
    let declared = value.get("@type").or_else(|| value.get("type"));
    match declared {
        Some(Value::String(s)) => s == JOB_POSTING_TYPE,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(JOB_POSTING_TYPE)),
        _ => false,
    }
}

fn map_posting(posting: &Value) -> PartialExtraction {
    PartialExtraction {
        title: first_string(posting, &[&["title"], &["name"]]),
        company: first_string(posting, &[&["hiringOrganization", "name"]]),
        location: location(posting),
        salary_text: salary(posting),
        date_posted: first_string(posting, &[&["datePosted"]]),
        job_type: employment_type(posting),
        description_html: first_string(posting, &[&["description"]]),
        ..Default::default()
    }
}

/// Locality, then region, then the location's own name.
fn location(posting: &Value) -> Option<String> {
    let place = match posting.get("jobLocation")? {
        Value::Array(places) => places.first()?,
        place => place,
    };
    first_string(
        place,
        &[
            &["address", "addressLocality"],
            &["address", "addressRegion"],
            &["name"],
        ],
    )
}

/// `baseSalary.value.value`, then a scalar `baseSalary.value`, then a `min-max` pair.
fn salary(posting: &Value) -> Option<String> {
    let base = posting.get("baseSalary")?;
    if let Some(value) = first_string(base, &[&["value", "value"]]) {
        return Some(value);
    }
    if let Some(value) = base.get("value").and_then(scalar) {
        return Some(value);
    }
    let range = base
        .get("value")
        .filter(|v| v.get("minValue").is_some())
        .unwrap_or(base);
    let min = range.get("minValue").and_then(scalar)?;
    let max = range.get("maxValue").and_then(scalar)?;
    Some(format!("{}-{}", min, max))
}

fn employment_type(posting: &Value) -> Option<String> {
    match posting.get("employmentType")? {
        Value::Array(kinds) => {
            let joined = kinds.iter().filter_map(scalar).collect::<Vec<_>>().join(", ");
            (!joined.is_empty()).then_some(joined)
        }
        other => scalar(other),
    }
}

/// First non-empty scalar reached by any of `paths`, in order.
fn first_string(value: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| {
        path.iter()
            .try_fold(value, |v, key| v.get(*key))
            .and_then(scalar)
    })
}

/// Strings are trimmed, numbers rendered as written; anything else is no value.
fn scalar(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Page;
    use pretty_assertions::assert_eq;

    fn page(blocks: &[&str]) -> Page {
        let scripts: String = blocks
            .iter()
            .map(|b| format!(r#"<script type="application/ld+json">{}</script>"#, b))
            .collect();
        Page::parse(
            "https://www.freelancer.com/projects/php/site-1",
            &format!("<html><head>{}</head><body></body></html>", scripts),
        )
        .unwrap()
    }

    #[test]
    fn maps_full_job_posting() {
        let p = page(&[r#"{
            "@context": "https://schema.org",
            "@type": "JobPosting",
            "title": "Senior PHP developer",
            "hiringOrganization": {"@type": "Organization", "name": "Acme"},
            "jobLocation": {"address": {"addressLocality": "Berlin", "addressRegion": "BE"}},
            "baseSalary": {"currency": "USD", "value": {"value": 500}},
            "datePosted": "2024-05-01",
            "employmentType": "CONTRACTOR",
            "description": "<p>Build <b>things</b></p>"
        }"#]);
        let got = extract(&p).unwrap();
        assert_eq!(
            got,
            PartialExtraction {
                title: Some("Senior PHP developer".to_string()),
                company: Some("Acme".to_string()),
                location: Some("Berlin".to_string()),
                salary_text: Some("500".to_string()),
                date_posted: Some("2024-05-01".to_string()),
                job_type: Some("CONTRACTOR".to_string()),
                description_html: Some("<p>Build <b>things</b></p>".to_string()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn returns_none_without_job_posting() {
        let p = page(&[r#"{"@type": "Organization", "name": "Acme"}"#]);
        assert!(extract(&p).is_none());
        assert!(extract(&page(&[])).is_none());
    }

    #[test]
    fn malformed_block_is_skipped() {
        let p = page(&[
            r#"{"@type": "JobPosting", "title": "broken""#,
            r#"{"@type": "JobPosting", "title": "Second block"}"#,
        ]);
        assert_eq!(extract(&p).unwrap().title.as_deref(), Some("Second block"));
    }

    #[test]
    fn first_matching_candidate_wins() {
        let p = page(&[
            r#"[{"@type": "BreadcrumbList"}, {"@type": "JobPosting", "name": "First"}]"#,
            r#"{"@type": "JobPosting", "title": "Later"}"#,
        ]);
        assert_eq!(extract(&p).unwrap().title.as_deref(), Some("First"));
    }

    #[test]
    fn type_array_and_plain_type_key_are_accepted() {
        let p = page(&[r#"{"type": ["Thing", "JobPosting"], "title": "Typed"}"#]);
        assert_eq!(extract(&p).unwrap().title.as_deref(), Some("Typed"));
    }

    #[test]
    fn graph_members_are_candidates() {
        let p = page(&[r#"{"@graph": [{"@type": "WebPage"}, {"@type": "JobPosting", "title": "In graph"}]}"#]);
        assert_eq!(extract(&p).unwrap().title.as_deref(), Some("In graph"));
    }

    #[test]
    fn location_falls_back_to_region_then_name() {
        let region = page(&[r#"{"@type": "JobPosting", "jobLocation": {"address": {"addressRegion": "Ontario"}, "name": "Remote"}}"#]);
        assert_eq!(extract(&region).unwrap().location.as_deref(), Some("Ontario"));

        let named = page(&[r#"{"@type": "JobPosting", "jobLocation": [{"name": "Remote"}]}"#]);
        assert_eq!(extract(&named).unwrap().location.as_deref(), Some("Remote"));
    }

    #[test]
    fn salary_falls_back_to_min_max_pair() {
        let p = page(&[r#"{"@type": "JobPosting", "baseSalary": {"minValue": 250, "maxValue": 750}}"#]);
        assert_eq!(extract(&p).unwrap().salary_text.as_deref(), Some("250-750"));

        let nested = page(&[r#"{"@type": "JobPosting", "baseSalary": {"value": {"minValue": 30, "maxValue": "45"}}}"#]);
        assert_eq!(extract(&nested).unwrap().salary_text.as_deref(), Some("30-45"));

        let half = page(&[r#"{"@type": "JobPosting", "baseSalary": {"minValue": 250}}"#]);
        assert!(extract(&half).unwrap().salary_text.is_none());
    }

    #[test]
    fn scalar_base_salary_value_is_used() {
        let p = page(&[r#"{"@type": "JobPosting", "baseSalary": {"value": "1000"}}"#]);
        assert_eq!(extract(&p).unwrap().salary_text.as_deref(), Some("1000"));
    }

    #[test]
    fn employment_type_array_is_joined() {
        let p = page(&[r#"{"@type": "JobPosting", "employmentType": ["FULL_TIME", "CONTRACTOR"]}"#]);
        assert_eq!(
            extract(&p).unwrap().job_type.as_deref(),
            Some("FULL_TIME, CONTRACTOR")
        );
    }
}
