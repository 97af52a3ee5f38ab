// ABOUTME: Library entry point for the harvest extraction strategies.
// ABOUTME: Re-exports the page model, the per-page extractors, link discovery and the record merger.

//! Harvest extract - turns a fetched job/project page into one canonical record.
//!
//! Every strategy in this crate is a pure function over a [`Page`]:
//!
//! - [`structured::extract`] reads embedded JSON-LD `JobPosting` blocks.
//! - [`markup::extract`] walks ordered locator chains over the visible markup.
//! - [`links::discover`] finds detail links and the next listing page.
//! - [`merge::merge`] reduces the partial results, in priority order, into a [`Record`].
//!
//! # Example
//!
//! ```
//! use harvest_extract::{merge, markup, structured, MergeContext, Origin, Page, Source};
//!
//! let html = r#"<html><body><h1>Build a website</h1></body></html>"#;
//! let page = Page::parse("https://www.freelancer.com/projects/php/build-a-website-42", html).unwrap();
//!
//! let mut sources = Vec::new();
//! if let Some(partial) = structured::extract(&page) {
//!     sources.push(Source::new(Origin::StructuredData, partial));
//! }
//! sources.push(Source::new(Origin::Markup, markup::extract(&page)));
//!
//! let record = merge::merge(&sources, &MergeContext::new(page.url().as_str()));
//! assert_eq!(record.title.as_deref(), Some("Build a website"));
//! assert_eq!(record.external_id.as_deref(), Some("42"));
//! ```

pub mod error;
pub mod links;
pub mod markup;
pub mod merge;
pub mod page;
pub mod record;
pub mod select;
pub mod structured;
pub mod text;

pub use crate::error::ExtractError;
pub use crate::links::Discovered;
pub use crate::merge::{MergeContext, Source};
pub use crate::page::Page;
pub use crate::record::{Origin, PartialExtraction, Record};
pub use crate::text::html_to_text;
