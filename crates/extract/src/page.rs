// ABOUTME: Normalized page content model consumed by every extractor.
// ABOUTME: Bundles the parsed markup tree, the visible page text and the absolute page URL.

use scraper::Html;
use url::Url;

use crate::error::ExtractError;
use crate::text::document_text;

/// A fetched page, parsed once and shared by all strategies.
///
/// `Html` is not `Send`, so a `Page` is built and consumed synchronously after
/// the fetch completes; it never crosses an await point.
pub struct Page {
    url: Url,
    document: Html,
    text: String,
}

impl Page {
    /// Parses `html` fetched from `url`.
    pub fn parse(url: &str, html: &str) -> Result<Self, ExtractError> {
        let url = Url::parse(url).map_err(|e| ExtractError::invalid_url(url, e))?;
        let document = Html::parse_document(html);
        let text = document_text(&document);
        Ok(Self {
            url,
            document,
            text,
        })
    }

    /// The absolute URL the page was fetched from.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    /// Visible page text, one block per line.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Resolves `href` against the page URL. Malformed targets yield `None`.
    pub fn resolve(&self, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() || href.starts_with("javascript:") || href.starts_with("mailto:") {
            return None;
        }
        let mut resolved = self.url.join(href).ok()?;
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            return None;
        }
        resolved.set_fragment(None);
        Some(resolved)
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("url", &self.url.as_str())
            .field("text_len", &self.text.len())
            .finish()
    }
}
