// ABOUTME: Remote listing API: the ListingApi seam and FreelancerApi, which maps project JSON straight to Records.
// ABOUTME: Any failure yields None so the caller falls back to markup for the whole listing page.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use harvest_extract::{html_to_text, Origin, Record};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::fetch::{check_public_host, HttpFetcher};

/// Projects requested per listing page.
pub const PAGE_SIZE: u32 = 50;

const ACTIVE_PROJECTS_PATH: &str = "/api/projects/0.1/projects/active";

/// A backing data endpoint that can supply a whole listing page of records.
#[async_trait]
pub trait ListingApi: Send + Sync {
    /// Records for listing page `page` (1-based), or `None` when the page must be parsed from markup.
    async fn fetch_listing(
        &self,
        page: u32,
        keyword: Option<&str>,
        category: Option<&str>,
    ) -> Option<Vec<Record>>;
}

/// Client for the freelancer.com active-projects endpoint.
#[derive(Debug, Clone)]
pub struct FreelancerApi {
    client: reqwest::Client,
    site_base: String,
    request_delay: Duration,
    allow_private_networks: bool,
}

impl FreelancerApi {
    /// A client with no request delay that refuses private hosts.
    pub fn new(client: reqwest::Client, site_base: impl Into<String>) -> Self {
        Self {
            client,
            site_base: site_base.into().trim_end_matches('/').to_string(),
            request_delay: Duration::ZERO,
            allow_private_networks: false,
        }
    }

    /// Shares the fetcher's client, politeness delay and private-network policy.
    pub fn from_fetcher(fetcher: &HttpFetcher, site_base: impl Into<String>) -> Self {
        let opts = fetcher.options();
        Self::new(fetcher.client().clone(), site_base)
            .with_request_delay(opts.request_delay)
            .allow_private_networks(opts.allow_private_networks)
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.allow_private_networks = allow;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.site_base, ACTIVE_PROJECTS_PATH)
    }

    async fn request(
        &self,
        page: u32,
        keyword: Option<&str>,
        category: Option<&str>,
    ) -> anyhow::Result<ApiResponse> {
        let offset = page.saturating_sub(1).saturating_mul(PAGE_SIZE);
        let mut params: Vec<(&str, String)> = vec![
            ("compact", "true".to_string()),
            ("limit", PAGE_SIZE.to_string()),
            ("offset", offset.to_string()),
            ("full_description", "true".to_string()),
            ("job_details", "true".to_string()),
            ("user_details", "true".to_string()),
        ];
        if let Some(keyword) = keyword.filter(|k| !k.trim().is_empty()) {
            params.push(("query", keyword.to_string()));
        }
        if let Some(category) = category.filter(|c| !c.trim().is_empty()) {
            params.push(("jobs[]", category.to_string()));
        }

        let endpoint = self.endpoint();
        if !self.allow_private_networks {
            let parsed = Url::parse(&endpoint)?;
            check_public_host(&parsed, &endpoint, "private IP addresses are not allowed").await?;
        }
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let response = self
            .client
            .get(&endpoint)
            .header("Accept", "application/json")
            .query(&params)
            .send()
            .await?;
        if !self.allow_private_networks {
            let final_url = response.url().clone();
            check_public_host(&final_url, final_url.as_str(), "redirected to private IP address")
                .await?;
        }
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP status {}", status.as_u16());
        }
        Ok(response.json::<ApiResponse>().await?)
    }

    /// All projects or none: a project without an identity leaves the page to markup.
    fn map_projects(&self, projects: Vec<ApiProject>, category: Option<&str>) -> Option<Vec<Record>> {
        projects
            .into_iter()
            .map(|p| self.map_project(p, category))
            .collect()
    }

    fn map_project(&self, p: ApiProject, category: Option<&str>) -> Option<Record> {
        let slug = p
            .seo_url
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| p.id.map(|id| id.to_string()))?;

        let salary_text = p.budget.as_ref().map(|budget| {
            let code = p
                .currency
                .as_ref()
                .and_then(|c| c.code.as_deref())
                .unwrap_or("USD");
            format!(
                "{} {}-{}",
                code,
                budget.minimum.map(number_text).unwrap_or_default(),
                budget.maximum.map(number_text).unwrap_or_default()
            )
        });
        let job_type = if p.kind.as_deref() == Some("hourly") {
            "Hourly"
        } else {
            "Fixed Price"
        };
        let date_posted = p
            .time_submitted
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true));
        let description_text = p
            .description
            .as_deref()
            .map(html_to_text)
            .filter(|t| !t.is_empty());
        let owner = p.owner.as_ref();

        Some(Record {
            title: non_empty(p.title),
            company: owner.and_then(|o| o.username.clone()).and_then(|u| non_empty(Some(u))),
            category: category.map(str::to_string),
            location: owner
                .and_then(|o| o.location.as_ref())
                .and_then(|l| l.country.as_ref())
                .and_then(|c| c.name.clone())
                .and_then(|n| non_empty(Some(n))),
            salary_text,
            job_type: Some(job_type.to_string()),
            skills: p
                .jobs
                .into_iter()
                .filter_map(|j| j.name)
                .filter(|n| !n.trim().is_empty())
                .collect(),
            date_posted,
            description_html: non_empty(p.description),
            description_text,
            external_id: p.id.map(|id| id.to_string()),
            bid_count: p.bid_stats.and_then(|b| b.bid_count).map(|c| c.to_string()),
            source_url: format!("{}/projects/{}", self.site_base, slug.trim_start_matches('/')),
            origin: Some(Origin::RemoteApi),
        })
    }
}

#[async_trait]
impl ListingApi for FreelancerApi {
    async fn fetch_listing(
        &self,
        page: u32,
        keyword: Option<&str>,
        category: Option<&str>,
    ) -> Option<Vec<Record>> {
        let response = match self.request(page, keyword, category).await {
            Ok(response) => response,
            Err(err) => {
                warn!(page, error = %err, "listing API request failed");
                return None;
            }
        };
        let Some(records) = self.map_projects(response.result.projects, category) else {
            warn!(page, "listing API returned a project without id or seo_url");
            return None;
        };
        if records.is_empty() {
            debug!(page, "listing API returned no projects");
            return None;
        }
        info!(page, count = records.len(), "listing API page");
        Some(records)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Whole numbers print without a fractional part.
fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    result: ApiResult,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    projects: Vec<ApiProject>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiProject {
    id: Option<u64>,
    title: Option<String>,
    seo_url: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    currency: Option<ApiCurrency>,
    budget: Option<ApiBudget>,
    time_submitted: Option<i64>,
    jobs: Vec<ApiJob>,
    bid_stats: Option<ApiBidStats>,
    owner: Option<ApiOwner>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiCurrency {
    code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiBudget {
    minimum: Option<f64>,
    maximum: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiJob {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiBidStats {
    bid_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiOwner {
    username: Option<String>,
    location: Option<ApiLocation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiLocation {
    country: Option<ApiCountry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiCountry {
    name: Option<String>,
}
