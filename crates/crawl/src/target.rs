// ABOUTME: CrawlTarget - one listing or detail fetch, created when discovered and consumed exactly once.
// ABOUTME: Also defines the per-target state machine and drop reasons used in run diagnostics.

use serde::Serialize;

/// Which kind of page a target points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    List,
    Detail,
}

/// A pending fetch. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub url: String,
    pub kind: TargetKind,
    /// Position in its listing chain; detail targets inherit their listing's page.
    pub page_number: u32,
    pub referer: Option<String>,
}

impl CrawlTarget {
    /// First page of a listing chain.
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: TargetKind::List,
            page_number: 1,
            referer: None,
        }
    }

    /// The listing page following `self` in its chain.
    pub fn next_page(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: TargetKind::List,
            page_number: self.page_number + 1,
            referer: Some(self.url.clone()),
        }
    }

    /// A detail page discovered on listing `self`.
    pub fn detail(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: TargetKind::Detail,
            page_number: self.page_number,
            referer: Some(self.url.clone()),
        }
    }
}

/// Why a fetched target produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Every strategy came back without a title or description.
    LowYield,
    /// A record with the same source URL was already emitted.
    Duplicate,
    /// The result budget was spent before this record could be saved.
    OverBudget,
}

/// Where a dequeued target ended up: `Fetched -> {Extracted, Dropped, Failed}`.
///
/// Targets still waiting in the run queue are pending and carry no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    Fetched,
    Extracted,
    Dropped(DropReason),
    Failed,
}
