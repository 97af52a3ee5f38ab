// ABOUTME: Error types for the extraction library.
// ABOUTME: Only page construction can fail; strategy-level parse failures are absorbed by the strategies.

use thiserror::Error;

/// Errors that can occur while building a page for extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The page URL could not be parsed as an absolute URL.
    #[error("invalid page URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ExtractError {
    /// Creates an InvalidUrl error from an underlying URL parse failure.
    pub fn invalid_url(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ExtractError::InvalidUrl {
            url: url.into(),
            reason: err.to_string(),
        }
    }
}
