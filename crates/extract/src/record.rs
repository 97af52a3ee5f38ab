// ABOUTME: Canonical Record output type and the per-strategy PartialExtraction it is merged from.
// ABOUTME: Origin tags which strategy supplied a record's title.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// The extraction strategy that produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    RemoteApi,
    StructuredData,
    Markup,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Origin::RemoteApi => "remote_api",
            Origin::StructuredData => "structured_data",
            Origin::Markup => "markup",
        };
        write!(f, "{}", s)
    }
}

/// What a single strategy found on a page. Absent fields mean "nothing found".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialExtraction {
    pub title: Option<String>,
    pub company: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub salary_text: Option<String>,
    pub job_type: Option<String>,
    pub skills: IndexSet<String>,
    pub date_posted: Option<String>,
    pub description_html: Option<String>,
    pub description_text: Option<String>,
    pub external_id: Option<String>,
    pub bid_count: Option<String>,
}

impl PartialExtraction {
    /// Returns true if the strategy found nothing at all.
    pub fn is_empty(&self) -> bool {
        *self == PartialExtraction::default()
    }
}

/// One job/project posting. `source_url` is the identity key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: Option<String>,
    pub company: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub salary_text: Option<String>,
    pub job_type: Option<String>,
    #[serde(default)]
    pub skills: IndexSet<String>,
    pub date_posted: Option<String>,
    pub description_html: Option<String>,
    pub description_text: Option<String>,
    pub external_id: Option<String>,
    pub bid_count: Option<String>,
    pub source_url: String,
    pub origin: Option<Origin>,
}

impl Record {
    /// A record carrying only its URL and category, emitted when detail pages are not collected.
    pub fn listing_only(source_url: impl Into<String>, category: Option<String>) -> Self {
        Self {
            source_url: source_url.into(),
            category,
            ..Default::default()
        }
    }

    /// Acceptance gate: a record is worth emitting only with a title or description text.
    pub fn has_content(&self) -> bool {
        non_blank(&self.title) || non_blank(&self.description_text)
    }
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |v| !v.trim().is_empty())
}
