// ABOUTME: Frontier controller: drives listing and detail targets through a bounded tokio worker pool.
// ABOUTME: Workers reserve budget and dedupe slots through the Frontier; the run loop alone talks to the sink.

use std::collections::VecDeque;
use std::sync::Arc;

use harvest_extract::{links, merge, MergeContext, Page, Record};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::api::{FreelancerApi, ListingApi};
use crate::config::RunConfig;
use crate::error::CrawlError;
use crate::fetch::{FetchOptions, FetchedPage, Fetcher, HttpFetcher};
use crate::frontier::{Frontier, SaveDecision};
use crate::sink::RecordSink;
use crate::target::{CrawlTarget, DropReason, TargetKind, TargetState};

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub saved: u64,
    pub listing_pages: u64,
    pub api_pages: u64,
    pub detail_pages: u64,
    pub dropped_low_yield: u64,
    pub dropped_duplicate: u64,
    pub dropped_over_budget: u64,
    pub failed: u64,
    /// Pending targets abandoned once the budget was reached.
    pub skipped: u64,
}

impl RunSummary {
    fn absorb(&mut self, outcome: &Outcome) {
        match (outcome.target.kind, outcome.state) {
            (_, TargetState::Failed) => self.failed += 1,
            (TargetKind::List, _) => {
                self.listing_pages += 1;
                if outcome.via_api {
                    self.api_pages += 1;
                }
            }
            (TargetKind::Detail, _) => self.detail_pages += 1,
        }
        for reason in &outcome.drops {
            match reason {
                DropReason::LowYield => self.dropped_low_yield += 1,
                DropReason::Duplicate => self.dropped_duplicate += 1,
                DropReason::OverBudget => self.dropped_over_budget += 1,
            }
        }
    }
}

/// What processing one target produced. Records in it have already passed the save gate.
#[derive(Debug)]
struct Outcome {
    target: CrawlTarget,
    state: TargetState,
    records: Vec<Record>,
    children: Vec<CrawlTarget>,
    drops: Vec<DropReason>,
    via_api: bool,
}

impl Outcome {
    fn new(target: CrawlTarget, state: TargetState) -> Self {
        Self {
            target,
            state,
            records: Vec::new(),
            children: Vec::new(),
            drops: Vec::new(),
            via_api: false,
        }
    }
}

struct Shared {
    config: RunConfig,
    category: Option<String>,
    fetcher: Arc<dyn Fetcher>,
    api: Option<Arc<dyn ListingApi>>,
    frontier: Frontier,
}

/// Runs one crawl over a [`RunConfig`].
pub struct Crawler {
    shared: Arc<Shared>,
}

impl Crawler {
    /// A crawler over explicit collaborators. `api` is only consulted when the config asks for it.
    pub fn new(
        config: RunConfig,
        fetcher: Arc<dyn Fetcher>,
        api: Option<Arc<dyn ListingApi>>,
    ) -> Self {
        let frontier = Frontier::new(
            config.results_wanted,
            config.max_pages_per_chain,
            config.dedupe,
        );
        Self {
            shared: Arc::new(Shared {
                category: config.requested_category(),
                config,
                fetcher,
                api,
                frontier,
            }),
        }
    }

    /// A crawler using [`HttpFetcher`] and, when enabled, [`FreelancerApi`] on the same client.
    pub fn from_config(config: RunConfig, fetch_opts: FetchOptions) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::new(fetch_opts)?;
        let api: Option<Arc<dyn ListingApi>> = if config.use_remote_api_first {
            Some(Arc::new(FreelancerApi::from_fetcher(
                &fetcher,
                config.site_base.clone(),
            )))
        } else {
            None
        };
        Ok(Self::new(config, Arc::new(fetcher), api))
    }

    /// Crawls until the frontier is empty or the budget is spent and in-flight targets have resolved.
    ///
    /// Records reach `sink` in the order their targets finish. Only seeding and
    /// sink failures end the run early.
    pub async fn run<S: RecordSink + ?Sized>(&self, sink: &mut S) -> Result<RunSummary, CrawlError> {
        let shared = &self.shared;
        let seeds = shared.config.seed_targets()?;
        info!(
            seeds = seeds.len(),
            budget = shared.config.results_wanted,
            max_pages = shared.config.max_pages_per_chain,
            "starting crawl"
        );

        let mut pending: VecDeque<CrawlTarget> = seeds
            .into_iter()
            .filter(|seed| shared.frontier.try_enqueue(&seed.url))
            .collect();
        let mut in_flight = JoinSet::new();
        let mut summary = RunSummary::default();
        let concurrency = shared.config.concurrency.max(1);

        loop {
            while in_flight.len() < concurrency {
                if shared.frontier.budget_reached() {
                    summary.skipped += pending.len() as u64;
                    pending.clear();
                    break;
                }
                let Some(target) = pending.pop_front() else {
                    break;
                };
                in_flight.spawn(process(Arc::clone(shared), target));
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(error = %err, "crawl task did not complete");
                    summary.failed += 1;
                    continue;
                }
            };

            summary.absorb(&outcome);
            for record in &outcome.records {
                sink.accept(record)?;
            }
            pending.extend(outcome.children);
        }

        sink.finish()?;
        let state = shared.frontier.snapshot();
        summary.saved = state.saved_count;
        info!(
            saved = summary.saved,
            seen = state.seen_urls.len(),
            listing_pages = summary.listing_pages,
            detail_pages = summary.detail_pages,
            failed = summary.failed,
            "crawl finished"
        );
        Ok(summary)
    }
}

async fn process(shared: Arc<Shared>, target: CrawlTarget) -> Outcome {
    let fetched = match shared.fetcher.fetch(&target).await {
        Ok(fetched) => fetched,
        Err(err) => {
            if err.is_ssrf() {
                warn!(url = %target.url, error = %err, "refused private address");
            } else if err.is_status() {
                info!(url = %target.url, status = ?err.status, "page unavailable");
            } else {
                warn!(url = %target.url, error = %err, "fetch failed");
            }
            return Outcome::new(target, TargetState::Failed);
        }
    };

    match target.kind {
        TargetKind::List => {
            let api_records = match shared.api {
                Some(ref api) if shared.config.use_remote_api_first => {
                    api.fetch_listing(
                        target.page_number,
                        shared.config.keyword.as_deref(),
                        shared.category.as_deref(),
                    )
                    .await
                }
                _ => None,
            };
            shared.resolve_listing(target, &fetched, api_records)
        }
        TargetKind::Detail => shared.resolve_detail(target, &fetched),
    }
}

impl Shared {
    fn resolve_listing(
        &self,
        target: CrawlTarget,
        fetched: &FetchedPage,
        api_records: Option<Vec<Record>>,
    ) -> Outcome {
        let page = match Page::parse(&fetched.final_url, &fetched.body) {
            Ok(page) => page,
            Err(err) => {
                warn!(url = %target.url, error = %err, "unusable listing URL");
                return Outcome::new(target, TargetState::Failed);
            }
        };
        let mut outcome = Outcome::new(target, TargetState::Extracted);
        let page_number = outcome.target.page_number;
        let discovered = links::discover(&page, page_number);

        if let Some(records) = api_records {
            outcome.via_api = true;
            info!(url = %outcome.target.url, page = page_number, projects = records.len(), "listing page from API");
            for record in records {
                if !self.config.collect_details {
                    if self.frontier.budget_reached() {
                        break;
                    }
                    let record = Record::listing_only(record.source_url, self.category.clone());
                    self.gate(record, &mut outcome);
                } else if record.has_content() {
                    self.gate(record, &mut outcome);
                } else {
                    debug!(url = %record.source_url, "dropping API project without title or description");
                    outcome.drops.push(DropReason::LowYield);
                }
            }
        } else {
            let detail_urls = discovered.detail_urls;
            info!(url = %outcome.target.url, page = page_number, links = detail_urls.len(), "listing page");
            if self.config.collect_details {
                let remaining = self.frontier.remaining();
                for url in detail_urls {
                    if outcome.children.len() >= remaining {
                        break;
                    }
                    if self.frontier.try_enqueue(&url) {
                        let child = outcome.target.detail(url);
                        outcome.children.push(child);
                    }
                }
            } else {
                for url in detail_urls {
                    if self.frontier.budget_reached() {
                        break;
                    }
                    self.gate(Record::listing_only(url, self.category.clone()), &mut outcome);
                }
            }
        }

        if self.frontier.may_paginate(page_number) {
            if let Some(next) = discovered.next_page_url {
                if self.frontier.try_enqueue(&next) {
                    debug!(url = %next, page = page_number + 1, "next listing page");
                    let child = outcome.target.next_page(next);
                    outcome.children.push(child);
                }
            }
        }
        outcome
    }

    fn resolve_detail(&self, target: CrawlTarget, fetched: &FetchedPage) -> Outcome {
        let page = match Page::parse(&target.url, &fetched.body) {
            Ok(page) => page,
            Err(err) => {
                warn!(url = %target.url, error = %err, "unusable detail URL");
                return Outcome::new(target, TargetState::Failed);
            }
        };

        let ctx = MergeContext::new(target.url.as_str()).with_category(self.category.clone());
        let record = merge::resolve(&page, &ctx);

        let mut outcome = Outcome::new(target, TargetState::Fetched);
        if !record.has_content() {
            info!(url = %outcome.target.url, "dropping detail page without title or description");
            outcome.state = TargetState::Dropped(DropReason::LowYield);
            outcome.drops.push(DropReason::LowYield);
            return outcome;
        }
        self.gate(record, &mut outcome);
        outcome.state = match outcome.drops.last() {
            Some(reason) => TargetState::Dropped(*reason),
            None => TargetState::Extracted,
        };
        outcome
    }

    /// Reserves budget for `record` and files it as saved or dropped.
    fn gate(&self, record: Record, outcome: &mut Outcome) {
        match self.frontier.try_save(&record.source_url) {
            SaveDecision::Saved => {
                debug!(url = %record.source_url, saved = self.frontier.saved_count(), "saved record");
                outcome.records.push(record);
            }
            SaveDecision::Duplicate => outcome.drops.push(DropReason::Duplicate),
            SaveDecision::BudgetExhausted => outcome.drops.push(DropReason::OverBudget),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::sink::MemorySink;
    use async_trait::async_trait;
    use harvest_extract::Origin;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves canned HTML by URL; anything else is a 404.
    struct StaticFetcher {
        pages: HashMap<String, String>,
        hits: AtomicUsize,
    }

    impl StaticFetcher {
        fn new(pages: &[(&str, String)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.clone()))
                    .collect(),
                hits: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, target: &CrawlTarget) -> Result<FetchedPage, FetchError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            match self.pages.get(&target.url) {
                Some(body) => Ok(FetchedPage {
                    url: target.url.clone(),
                    final_url: target.url.clone(),
                    status: 200,
                    content_type: Some("text/html".to_string()),
                    body: body.clone(),
                }),
                None => Err(FetchError::status(target.url.as_str(), "Fetch", 404)),
            }
        }
    }

    struct FixedApi(Option<Vec<Record>>);

    #[async_trait]
    impl ListingApi for FixedApi {
        async fn fetch_listing(&self, _: u32, _: Option<&str>, _: Option<&str>) -> Option<Vec<Record>> {
            self.0.clone()
        }
    }

    const BASE: &str = "https://jobs.example.com";

    fn listing(detail_slugs: &[&str]) -> String {
        let anchors: String = detail_slugs
            .iter()
            .map(|slug| format!("<a href=\"/projects/web/{}\">{}</a>", slug, slug))
            .collect();
        format!("<html><body>{}</body></html>", anchors)
    }

    fn detail(title: &str) -> String {
        format!(
            "<html><body><h1>{}</h1><div class='project-details'><p>About {}</p></div></body></html>",
            title, title
        )
    }

    fn config() -> crate::config::RunConfigBuilder {
        RunConfig::builder()
            .seed_url(format!("{}/jobs/web", BASE))
            .use_remote_api_first(false)
            .max_pages_per_chain(1)
    }

    #[tokio::test]
    async fn detail_pages_become_records() {
        let fetcher = StaticFetcher::new(&[
            ("https://jobs.example.com/jobs/web", listing(&["a-1", "b-2", "a-1"])),
            ("https://jobs.example.com/projects/web/a-1", detail("Alpha")),
            ("https://jobs.example.com/projects/web/b-2", detail("Beta")),
        ]);
        let crawler = Crawler::new(config().build().unwrap(), Arc::new(fetcher), None);
        let mut sink = MemorySink::new();
        let summary = crawler.run(&mut sink).await.unwrap();

        let mut titles: Vec<_> = sink
            .records()
            .iter()
            .filter_map(|r| r.title.clone())
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["Alpha", "Beta"]);
        assert_eq!(summary.saved, 2);
        assert_eq!(summary.listing_pages, 1);
        assert_eq!(summary.detail_pages, 2);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn low_yield_and_failed_details_are_counted() {
        let fetcher = StaticFetcher::new(&[
            ("https://jobs.example.com/jobs/web", listing(&["good-1", "empty-2", "missing-3"])),
            ("https://jobs.example.com/projects/web/good-1", detail("Good")),
            (
                "https://jobs.example.com/projects/web/empty-2",
                "<html><body><nav>menu</nav></body></html>".to_string(),
            ),
        ]);
        let crawler = Crawler::new(config().build().unwrap(), Arc::new(fetcher), None);
        let mut sink = MemorySink::new();
        let summary = crawler.run(&mut sink).await.unwrap();

        assert_eq!(sink.records().len(), 1);
        assert_eq!(summary.dropped_low_yield, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.saved, 1);
    }

    #[tokio::test]
    async fn details_enqueued_only_up_to_remaining_budget() {
        let fetcher = Arc::new(StaticFetcher::new(&[
            ("https://jobs.example.com/jobs/web", listing(&["a-1", "b-2", "c-3", "d-4"])),
            ("https://jobs.example.com/projects/web/a-1", detail("A")),
            ("https://jobs.example.com/projects/web/b-2", detail("B")),
            ("https://jobs.example.com/projects/web/c-3", detail("C")),
            ("https://jobs.example.com/projects/web/d-4", detail("D")),
        ]));
        let crawler = Crawler::new(
            config().results_wanted(2).build().unwrap(),
            fetcher.clone(),
            None,
        );
        let mut sink = MemorySink::new();
        let summary = crawler.run(&mut sink).await.unwrap();

        assert_eq!(sink.records().len(), 2);
        assert_eq!(summary.saved, 2);
        // one listing page plus two details
        assert_eq!(fetcher.hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn api_records_bypass_detail_pages() {
        let fetcher = Arc::new(StaticFetcher::new(&[(
            "https://jobs.example.com/jobs/web",
            listing(&["a-1", "b-2"]),
        )]));
        let mut from_api = Record::listing_only("https://jobs.example.com/projects/api-1", None);
        from_api.title = Some("From API".to_string());
        from_api.origin = Some(Origin::RemoteApi);
        let api = Arc::new(FixedApi(Some(vec![from_api.clone(), from_api.clone()])));

        let crawler = Crawler::new(
            config().use_remote_api_first(true).build().unwrap(),
            fetcher.clone(),
            Some(api),
        );
        let mut sink = MemorySink::new();
        let summary = crawler.run(&mut sink).await.unwrap();

        assert_eq!(sink.records(), &[from_api]);
        assert_eq!(summary.api_pages, 1);
        assert_eq!(summary.dropped_duplicate, 1);
        assert_eq!(summary.detail_pages, 0);
        assert_eq!(fetcher.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn api_disabled_by_config_is_not_called() {
        let fetcher = Arc::new(StaticFetcher::new(&[
            ("https://jobs.example.com/jobs/web", listing(&["a-1"])),
            ("https://jobs.example.com/projects/web/a-1", detail("A")),
        ]));
        let api = Arc::new(FixedApi(Some(vec![Record::listing_only("x", None)])));
        let crawler = Crawler::new(config().build().unwrap(), fetcher, Some(api));
        let mut sink = MemorySink::new();
        let summary = crawler.run(&mut sink).await.unwrap();

        assert_eq!(summary.api_pages, 0);
        assert_eq!(sink.records()[0].title.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn listing_only_records_when_details_are_off() {
        let fetcher = StaticFetcher::new(&[(
            "https://jobs.example.com/jobs/web",
            listing(&["a-1", "b-2"]),
        )]);
        let crawler = Crawler::new(
            config()
                .collect_details(false)
                .category("Web Design")
                .build()
                .unwrap(),
            Arc::new(fetcher),
            None,
        );
        let mut sink = MemorySink::new();
        crawler.run(&mut sink).await.unwrap();

        assert_eq!(
            sink.records(),
            &[
                Record::listing_only(
                    "https://jobs.example.com/projects/web/a-1",
                    Some("Web Design".to_string())
                ),
                Record::listing_only(
                    "https://jobs.example.com/projects/web/b-2",
                    Some("Web Design".to_string())
                ),
            ]
        );
    }

    #[tokio::test]
    async fn api_projects_without_content_are_dropped() {
        let fetcher = Arc::new(StaticFetcher::new(&[(
            "https://jobs.example.com/jobs/web",
            listing(&["a-1"]),
        )]));
        let empty = Record::listing_only("https://jobs.example.com/projects/empty-1", None);
        let mut described = Record::listing_only("https://jobs.example.com/projects/full-2", None);
        described.description_text = Some("Needs a landing page".to_string());
        let api = Arc::new(FixedApi(Some(vec![empty, described.clone()])));

        let crawler = Crawler::new(
            config().use_remote_api_first(true).build().unwrap(),
            fetcher,
            Some(api),
        );
        let mut sink = MemorySink::new();
        let summary = crawler.run(&mut sink).await.unwrap();

        assert_eq!(sink.records(), &[described]);
        assert_eq!(summary.dropped_low_yield, 1);
        assert_eq!(summary.saved, 1);
    }

    #[tokio::test]
    async fn api_records_reduced_to_urls_when_details_are_off() {
        let fetcher = Arc::new(StaticFetcher::new(&[(
            "https://jobs.example.com/jobs/web",
            listing(&["a-1"]),
        )]));
        let mut from_api = Record::listing_only("https://jobs.example.com/projects/api-1", None);
        from_api.title = Some("From API".to_string());
        from_api.description_text = Some("body".to_string());
        from_api.origin = Some(Origin::RemoteApi);
        let untitled = Record::listing_only("https://jobs.example.com/projects/api-2", None);
        let api = Arc::new(FixedApi(Some(vec![from_api, untitled])));

        let crawler = Crawler::new(
            config()
                .use_remote_api_first(true)
                .collect_details(false)
                .category("Web Design")
                .build()
                .unwrap(),
            fetcher.clone(),
            Some(api),
        );
        let mut sink = MemorySink::new();
        let summary = crawler.run(&mut sink).await.unwrap();

        assert_eq!(
            sink.records(),
            &[
                Record::listing_only(
                    "https://jobs.example.com/projects/api-1",
                    Some("Web Design".to_string())
                ),
                Record::listing_only(
                    "https://jobs.example.com/projects/api-2",
                    Some("Web Design".to_string())
                ),
            ]
        );
        assert_eq!(summary.api_pages, 1);
        assert_eq!(summary.detail_pages, 0);
        assert_eq!(fetcher.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unusable_seeds_abort_before_fetching() {
        let fetcher = Arc::new(StaticFetcher::new(&[]));
        let crawler = Crawler::new(
            RunConfig::builder().seed_url("::::").build().unwrap(),
            fetcher.clone(),
            None,
        );
        let err = crawler.run(&mut MemorySink::new()).await.unwrap_err();
        assert!(matches!(err, CrawlError::NoSeeds(_)));
        assert_eq!(fetcher.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn summary_serializes_counters() {
        let summary = RunSummary {
            saved: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["saved"], 3);
        assert_eq!(json["skipped"], 0);
    }
}
