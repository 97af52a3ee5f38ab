// ABOUTME: Error types for the crawl layer: FetchError (ErrorCode + context) and the run-level CrawlError.
// ABOUTME: Fetch failures are reported per target; only configuration, seeding and sink failures end a run.

use std::fmt;

/// Categories of fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidUrl,
    Fetch,
    Status,
    Timeout,
    Ssrf,
    TooLarge,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidUrl => "invalid URL",
            ErrorCode::Fetch => "fetch error",
            ErrorCode::Status => "unexpected status",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Ssrf => "SSRF blocked",
            ErrorCode::TooLarge => "content too large",
        };
        write!(f, "{}", s)
    }
}

/// A target could not be fetched. Distinct from a page that was fetched but yielded nothing.
#[derive(Debug, thiserror::Error)]
pub struct FetchError {
    pub code: ErrorCode,
    pub url: String,
    pub op: String,
    /// HTTP status, when the server answered.
    pub status: Option<u16>,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "harvest: {} {}: {}", self.op, self.url, self.code)?;
        if let Some(status) = self.status {
            write!(f, " {}", status)?;
        }
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl FetchError {
    fn new(
        code: ErrorCode,
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            url: url.into(),
            op: op.into(),
            status: None,
            source,
        }
    }

    /// Create an InvalidUrl error.
    pub fn invalid_url(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::InvalidUrl, url, op, source)
    }

    /// Create a Fetch (transport) error.
    pub fn fetch(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Fetch, url, op, source)
    }

    /// Create a Status error for a non-200 answer.
    pub fn status(url: impl Into<String>, op: impl Into<String>, status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::new(ErrorCode::Status, url, op, None)
        }
    }

    /// Create a Timeout error.
    pub fn timeout(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Timeout, url, op, source)
    }

    /// Create an SSRF error.
    pub fn ssrf(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorCode::Ssrf, url, op, source)
    }

    /// Create a TooLarge error.
    pub fn too_large(url: impl Into<String>, op: impl Into<String>) -> Self {
        Self::new(ErrorCode::TooLarge, url, op, None)
    }

    /// Returns true if this is a Timeout error.
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::Timeout
    }

    /// Returns true if this is an SSRF error.
    pub fn is_ssrf(&self) -> bool {
        self.code == ErrorCode::Ssrf
    }

    /// Returns true if this is a Status error.
    pub fn is_status(&self) -> bool {
        self.code == ErrorCode::Status
    }

    /// Transport failures, timeouts, 429 and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self.code {
            ErrorCode::Fetch | ErrorCode::Timeout => true,
            ErrorCode::Status => matches!(self.status, Some(429) | Some(500..=599)),
            ErrorCode::InvalidUrl | ErrorCode::Ssrf | ErrorCode::TooLarge => false,
        }
    }
}

/// Errors that end a crawl run.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// The run configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No seed target could be produced.
    #[error("no usable seed URL: {0}")]
    NoSeeds(String),

    /// The output sink rejected a record.
    #[error("output sink failed: {0}")]
    Sink(#[from] std::io::Error),

    /// A record could not be serialized for the sink.
    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CrawlError {
    pub fn config(msg: impl Into<String>) -> Self {
        CrawlError::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_op_url_code_and_status() {
        let err = FetchError::status("https://example.com/jobs", "Fetch", 503);
        assert_eq!(
            err.to_string(),
            "harvest: Fetch https://example.com/jobs: unexpected status 503"
        );
    }

    #[test]
    fn display_includes_source() {
        let err = FetchError::fetch(
            "https://example.com",
            "Fetch",
            Some(anyhow::anyhow!("connection reset")),
        );
        assert!(err.to_string().ends_with("fetch error: connection reset"));
    }

    #[test]
    fn retryable_classification() {
        assert!(FetchError::fetch("u", "Fetch", None).is_retryable());
        assert!(FetchError::timeout("u", "Fetch", None).is_retryable());
        assert!(FetchError::status("u", "Fetch", 429).is_retryable());
        assert!(FetchError::status("u", "Fetch", 502).is_retryable());
        assert!(!FetchError::status("u", "Fetch", 404).is_retryable());
        assert!(!FetchError::ssrf("u", "Fetch", None).is_retryable());
        assert!(!FetchError::invalid_url("u", "Fetch", None).is_retryable());
        assert!(!FetchError::too_large("u", "Fetch").is_retryable());
    }
}
