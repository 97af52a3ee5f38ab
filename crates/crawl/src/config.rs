// ABOUTME: Run configuration for a crawl: RunConfig, its fluent builder and the JSON input document.
// ABOUTME: Also resolves seed targets, synthesizing a listing URL from the category when none is given.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::error::CrawlError;
use crate::fetch::FetchOptions;
use crate::frontier::UNBOUNDED;
use crate::target::CrawlTarget;

pub const DEFAULT_SITE_BASE: &str = "https://www.freelancer.com";
pub const DEFAULT_RESULTS_WANTED: u64 = 100;
pub const DEFAULT_MAX_PAGES: u32 = 20;
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Bounds applied to a user-supplied request delay.
pub const MIN_REQUEST_DELAY: Duration = Duration::from_millis(500);
pub const MAX_REQUEST_DELAY: Duration = Duration::from_millis(10_000);
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(1_500);

/// Settings the frontier controller runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub keyword: Option<String>,
    pub category: Option<String>,
    /// At least 1; [`UNBOUNDED`] for no limit.
    pub results_wanted: u64,
    pub max_pages_per_chain: u32,
    /// When false, listing links are emitted as URL-only records and no detail page is fetched.
    pub collect_details: bool,
    pub dedupe: bool,
    pub use_remote_api_first: bool,
    pub seed_urls: Vec<String>,
    pub site_base: String,
    pub concurrency: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            keyword: None,
            category: None,
            results_wanted: DEFAULT_RESULTS_WANTED,
            max_pages_per_chain: DEFAULT_MAX_PAGES,
            collect_details: true,
            dedupe: true,
            use_remote_api_first: true,
            seed_urls: Vec::new(),
            site_base: DEFAULT_SITE_BASE.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl RunConfig {
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::new()
    }

    /// Listing targets the run starts from.
    ///
    /// Explicit seeds that do not parse as http(s) URLs are discarded; if every
    /// explicit seed is discarded, or a seed cannot be synthesized, the run cannot start.
    pub fn seed_targets(&self) -> Result<Vec<CrawlTarget>, CrawlError> {
        if self.seed_urls.is_empty() {
            let url = synthesize_seed(&self.site_base, self.category.as_deref())?;
            return Ok(vec![CrawlTarget::seed(url)]);
        }

        let mut seeds = Vec::new();
        for raw in &self.seed_urls {
            match Url::parse(raw.trim()) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                    seeds.push(CrawlTarget::seed(String::from(url)));
                }
                Ok(_) => warn!(url = %raw, "discarding seed URL with unsupported scheme"),
                Err(err) => warn!(url = %raw, error = %err, "discarding malformed seed URL"),
            }
        }
        if seeds.is_empty() {
            return Err(CrawlError::NoSeeds(format!(
                "none of the {} start URLs is a valid http(s) URL",
                self.seed_urls.len()
            )));
        }
        Ok(seeds)
    }

    /// Category requested as crawl input, ignoring blank values.
    pub fn requested_category(&self) -> Option<String> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }
}

/// `{site_base}/jobs[/{category-slug}]`.
pub fn synthesize_seed(site_base: &str, category: Option<&str>) -> Result<String, CrawlError> {
    let mut url = Url::parse(site_base)
        .map_err(|e| CrawlError::NoSeeds(format!("site base {:?}: {}", site_base, e)))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| CrawlError::NoSeeds(format!("site base {:?} cannot hold a path", site_base)))?;
        segments.pop_if_empty().push("jobs");
        if let Some(slug) = category.map(category_slug).filter(|s| !s.is_empty()) {
            segments.push(&slug);
        }
    }
    Ok(url.into())
}

/// Lowercased, trimmed, whitespace runs replaced by `-`.
pub fn category_slug(category: &str) -> String {
    category
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Interprets a `results_wanted` value: numbers clamp to at least 1, non-numeric text means unbounded.
pub fn parse_results_wanted(raw: &str) -> u64 {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => clamp_count(n),
        _ => UNBOUNDED,
    }
}

/// Interprets a `max_pages` value: numbers clamp to at least 1, anything else is the default.
pub fn parse_max_pages(raw: &str) -> u32 {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => u32::try_from(clamp_count(n)).unwrap_or(u32::MAX),
        _ => DEFAULT_MAX_PAGES,
    }
}

fn clamp_count(n: f64) -> u64 {
    if n < 1.0 {
        1
    } else if n >= u64::MAX as f64 {
        UNBOUNDED
    } else {
        n as u64
    }
}

/// Clamps a requested delay between requests. Zero means unset.
pub fn clamp_request_delay(delay: Duration) -> Duration {
    if delay.is_zero() {
        return DEFAULT_REQUEST_DELAY;
    }
    delay.clamp(MIN_REQUEST_DELAY, MAX_REQUEST_DELAY)
}

/// Builder for [`RunConfig`].
#[derive(Debug, Clone, Default)]
pub struct RunConfigBuilder {
    cfg: RunConfig,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: RunConfig::default(),
        }
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.cfg.keyword = Some(keyword.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.cfg.category = Some(category.into());
        self
    }

    /// Values below 1 are raised to 1.
    pub fn results_wanted(mut self, n: u64) -> Self {
        self.cfg.results_wanted = n.max(1);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.cfg.results_wanted = UNBOUNDED;
        self
    }

    /// Values below 1 are raised to 1.
    pub fn max_pages_per_chain(mut self, n: u32) -> Self {
        self.cfg.max_pages_per_chain = n.max(1);
        self
    }

    pub fn collect_details(mut self, collect: bool) -> Self {
        self.cfg.collect_details = collect;
        self
    }

    pub fn dedupe(mut self, dedupe: bool) -> Self {
        self.cfg.dedupe = dedupe;
        self
    }

    pub fn use_remote_api_first(mut self, use_api: bool) -> Self {
        self.cfg.use_remote_api_first = use_api;
        self
    }

    /// Add a seed listing URL.
    pub fn seed_url(mut self, url: impl Into<String>) -> Self {
        self.cfg.seed_urls.push(url.into());
        self
    }

    pub fn site_base(mut self, base: impl Into<String>) -> Self {
        self.cfg.site_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Number of targets processed at once; at least 1.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.cfg.concurrency = n.max(1);
        self
    }

    /// Build the configuration, rejecting an unusable site base.
    pub fn build(self) -> Result<RunConfig, CrawlError> {
        let base = Url::parse(&self.cfg.site_base)
            .map_err(|e| CrawlError::config(format!("site base {:?}: {}", self.cfg.site_base, e)))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(CrawlError::config(format!(
                "site base {:?} must be http or https",
                self.cfg.site_base
            )));
        }
        Ok(self.cfg)
    }
}

/// A start URL given either as a bare string or as `{ "url": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StartUrl {
    Plain(String),
    Object { url: String },
}

impl StartUrl {
    pub fn url(&self) -> &str {
        match self {
            StartUrl::Plain(url) | StartUrl::Object { url } => url,
        }
    }
}

/// The JSON input document accepted by `harvest crawl --input`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub results_wanted: Option<Value>,
    pub max_pages: Option<Value>,
    #[serde(rename = "collectDetails")]
    pub collect_details: Option<bool>,
    #[serde(rename = "startUrl")]
    pub start_url: Option<String>,
    #[serde(rename = "startUrls")]
    pub start_urls: Vec<StartUrl>,
    pub url: Option<String>,
    pub dedupe: Option<bool>,
    #[serde(rename = "useApiFirst")]
    pub use_api_first: Option<bool>,
    #[serde(rename = "requestDelay")]
    pub request_delay: Option<u64>,
    #[serde(rename = "proxyUrl")]
    pub proxy_url: Option<String>,
    #[serde(rename = "minBudget")]
    pub min_budget: Option<Value>,
    #[serde(rename = "maxBudget")]
    pub max_budget: Option<Value>,
    #[serde(rename = "jobType")]
    pub job_type: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

impl InputConfig {
    pub fn from_json(json: &str) -> Result<Self, CrawlError> {
        serde_json::from_str(json).map_err(|e| CrawlError::config(format!("input document: {}", e)))
    }

    /// Start URLs in input order: `startUrls`, then `startUrl`, then `url`.
    pub fn seed_urls(&self) -> Vec<String> {
        self.start_urls
            .iter()
            .map(|s| s.url().to_string())
            .chain(self.start_url.clone())
            .chain(self.url.clone())
            .filter(|u| !u.trim().is_empty())
            .collect()
    }

    /// Filters present in the input that the crawl does not apply.
    pub fn unapplied_filters(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.min_budget.as_ref().map_or(false, |v| !v.is_null()) {
            out.push("minBudget");
        }
        if self.max_budget.as_ref().map_or(false, |v| !v.is_null()) {
            out.push("maxBudget");
        }
        if self.job_type.as_deref().map_or(false, |t| t != "all") {
            out.push("jobType");
        }
        if self.sort_by.as_deref().map_or(false, |s| s != "relevance") {
            out.push("sortBy");
        }
        out
    }

    /// Folds the input document into `builder`. Values absent from the input leave the builder untouched.
    pub fn apply(&self, mut builder: RunConfigBuilder) -> RunConfigBuilder {
        for filter in self.unapplied_filters() {
            warn!(filter, "filter is accepted but not applied to requests or results");
        }
        if let Some(keyword) = self.keyword.clone().filter(|k| !k.trim().is_empty()) {
            builder = builder.keyword(keyword);
        }
        if let Some(category) = self.category.clone().filter(|c| !c.trim().is_empty()) {
            builder = builder.category(category);
        }
        if let Some(raw) = self.results_wanted.as_ref().and_then(value_text) {
            builder.cfg.results_wanted = parse_results_wanted(&raw);
        }
        if let Some(raw) = self.max_pages.as_ref().and_then(value_text) {
            builder = builder.max_pages_per_chain(parse_max_pages(&raw));
        }
        if let Some(collect) = self.collect_details {
            builder = builder.collect_details(collect);
        }
        if let Some(dedupe) = self.dedupe {
            builder = builder.dedupe(dedupe);
        }
        if let Some(use_api) = self.use_api_first {
            builder = builder.use_remote_api_first(use_api);
        }
        for url in self.seed_urls() {
            builder = builder.seed_url(url);
        }
        builder
    }

    /// Applies the fetch-related input fields to `opts`.
    pub fn apply_fetch_options(&self, opts: &mut FetchOptions) {
        if let Some(ms) = self.request_delay {
            opts.request_delay = clamp_request_delay(Duration::from_millis(ms));
        }
        if let Some(proxy) = self.proxy_url.clone().filter(|p| !p.trim().is_empty()) {
            opts.proxy = Some(proxy);
        }
    }
}

/// Text form of a scalar JSON value; null and structures have none.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
