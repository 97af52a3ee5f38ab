// ABOUTME: Page fetching for crawl targets: the Fetcher seam and its reqwest-backed HttpFetcher.
// ABOUTME: Handles SSRF protection, content-length limits, charset decoding, retries and politeness delays.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use ipnet::{Ipv4Net, Ipv6Net};
use tracing::{debug, warn};
use url::Url;

use crate::error::{CrawlError, FetchError};
use crate::target::CrawlTarget;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

const OP: &str = "Fetch";

/// Options for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub user_agent: String,
    pub headers: HashMap<String, String>,
    pub allow_private_networks: bool,
    /// Pause before every request, and the base of the retry backoff.
    pub request_delay: Duration,
    /// Extra attempts after a retryable failure.
    pub max_retries: u32,
    pub proxy: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        let mut headers = HashMap::new();
        headers.insert(
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        );
        headers.insert("Accept-Language".to_string(), "en-US,en;q=0.9".to_string());
        Self {
            timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (compatible; harvest/0.1)".to_string(),
            headers,
            allow_private_networks: false,
            request_delay: crate::config::DEFAULT_REQUEST_DELAY,
            max_retries: 2,
            proxy: None,
        }
    }
}

/// A fetched page, decoded to text.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// Retrieves the document behind a target.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, target: &CrawlTarget) -> Result<FetchedPage, FetchError>;
}

/// [`Fetcher`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    opts: FetchOptions,
}

impl HttpFetcher {
    pub fn new(opts: FetchOptions) -> Result<Self, CrawlError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(&opts.user_agent)
            .timeout(opts.timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .deflate(true);
        if let Some(ref proxy) = opts.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| CrawlError::config(format!("proxy {:?}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| CrawlError::config(format!("HTTP client: {}", e)))?;
        Ok(Self { client, opts })
    }

    /// The underlying client, shared with the listing API.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Options this fetcher was built with.
    pub fn options(&self) -> &FetchOptions {
        &self.opts
    }

    async fn fetch_once(&self, target: &CrawlTarget) -> Result<FetchedPage, FetchError> {
        let url = target.url.as_str();
        if url.is_empty() {
            return Err(FetchError::invalid_url(url, OP, None));
        }
        let parsed = Url::parse(url).map_err(|e| {
            FetchError::invalid_url(url, OP, Some(anyhow::anyhow!("invalid URL: {}", e)))
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FetchError::invalid_url(
                url,
                OP,
                Some(anyhow::anyhow!("scheme must be http or https")),
            ));
        }

        if !self.opts.allow_private_networks {
            check_public_host(&parsed, url, "private IP addresses are not allowed").await?;
        }

        let mut request = self.client.get(url);
        for (key, value) in &self.opts.headers {
            request = request.header(key, value);
        }
        if let Some(ref referer) = target.referer {
            request = request.header("Referer", referer);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url, OP, Some(anyhow::anyhow!("request timed out: {}", e)))
            } else {
                FetchError::fetch(url, OP, Some(anyhow::anyhow!("request failed: {}", e)))
            }
        })?;

        // the redirect chain may have landed somewhere private
        if !self.opts.allow_private_networks {
            check_public_host(
                response.url(),
                url,
                "redirect to private IP address is not allowed",
            )
            .await?;
        }

        let content_length = response.content_length().or_else(|| {
            response
                .headers()
                .get("content-length")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
        });
        if let Some(len) = content_length {
            if len > MAX_CONTENT_LENGTH as u64 {
                return Err(FetchError::too_large(url, OP));
            }
        }

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_lowercase());

        if status != 200 {
            return Err(FetchError::status(url, OP, status));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url, OP, Some(anyhow::anyhow!("body timed out: {}", e)))
            } else {
                FetchError::fetch(url, OP, Some(anyhow::anyhow!("failed to read body: {}", e)))
            }
        })?;
        if body.len() > MAX_CONTENT_LENGTH {
            return Err(FetchError::too_large(url, OP));
        }

        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            status,
            body: decode_body(&body, content_type.as_deref()),
            content_type,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, target: &CrawlTarget) -> Result<FetchedPage, FetchError> {
        let attempts = self.opts.max_retries.saturating_add(1);
        let mut attempt = 1;
        loop {
            if !self.opts.request_delay.is_zero() {
                tokio::time::sleep(self.opts.request_delay * attempt).await;
            }
            match self.fetch_once(target).await {
                Ok(page) => {
                    debug!(url = %page.url, status = page.status, bytes = page.body.len(), "fetched");
                    return Ok(page);
                }
                Err(err) if err.is_retryable() && attempt < attempts => {
                    warn!(url = %target.url, attempt, error = %err, "retrying fetch");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Rejects `target` when its host is, or resolves to, a private address.
pub(crate) async fn check_public_host(target: &Url, url: &str, reason: &'static str) -> Result<(), FetchError> {
    let Some(host) = target.host_str() else {
        return Ok(());
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(FetchError::ssrf(url, OP, Some(anyhow::anyhow!(reason))));
        }
        return Ok(());
    }

    let port = target.port_or_known_default().unwrap_or(80);
    let addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
        FetchError::fetch(url, OP, Some(anyhow::anyhow!("DNS lookup failed: {}", e)))
    })?;
    for socket_addr in addrs {
        if is_private_ip(&socket_addr.ip()) {
            return Err(FetchError::ssrf(url, OP, Some(anyhow::anyhow!(reason))));
        }
    }
    Ok(())
}

/// Check if an IP address is in a private/reserved range.
pub(crate) fn is_private_ip(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(ip) => {
            let ranges: [Ipv4Net; 5] = [
                Ipv4Net::new_assert([10, 0, 0, 0].into(), 8),
                Ipv4Net::new_assert([172, 16, 0, 0].into(), 12),
                Ipv4Net::new_assert([192, 168, 0, 0].into(), 16),
                Ipv4Net::new_assert([127, 0, 0, 0].into(), 8),
                Ipv4Net::new_assert([169, 254, 0, 0].into(), 16),
            ];
            ip.is_unspecified() || ranges.iter().any(|net| net.contains(ip))
        }
        IpAddr::V6(ip) => {
            if ip.is_loopback() || ip.is_unspecified() {
                return true;
            }
            if let Some(v4) = ip.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(v4));
            }
            let unique_local = Ipv6Net::new_assert([0xfc00, 0, 0, 0, 0, 0, 0, 0].into(), 7);
            let link_local = Ipv6Net::new_assert([0xfe80, 0, 0, 0, 0, 0, 0, 0].into(), 10);
            unique_local.contains(ip) || link_local.contains(ip)
        }
    }
}

/// Decode body bytes using the Content-Type charset, or detection when absent.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(encoding) = content_type
        .and_then(extract_charset)
        .and_then(|charset| encoding_rs::Encoding::for_label(charset.as_bytes()))
    {
        let (decoded, _, _) = encoding.decode(body);
        return decoded.into_owned();
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type.to_lowercase().split(';').find_map(|part| {
        part.trim()
            .strip_prefix("charset=")
            .map(|c| c.trim_matches('"').trim_matches('\'').to_string())
    })
}
