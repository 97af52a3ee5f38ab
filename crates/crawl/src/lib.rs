// ABOUTME: Library entry point for the harvest crawler.
// ABOUTME: Re-exports run configuration, the frontier controller, fetch and API collaborators, and sinks.

//! Harvest crawl - a budgeted, deduplicating crawl over listing and detail pages.
//!
//! A [`Crawler`] seeds listing targets from a [`RunConfig`], fetches them through
//! a [`Fetcher`], asks a [`ListingApi`] for whole listing pages when enabled, and
//! otherwise follows detail links and pagination. Shared crawl state lives in a
//! single [`Frontier`]; accepted records are handed to a [`RecordSink`].

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod frontier;
pub mod sink;
pub mod target;

pub use crate::api::{FreelancerApi, ListingApi};
pub use crate::config::{InputConfig, RunConfig, RunConfigBuilder};
pub use crate::controller::{Crawler, RunSummary};
pub use crate::error::{CrawlError, ErrorCode, FetchError};
pub use crate::fetch::{FetchOptions, FetchedPage, Fetcher, HttpFetcher};
pub use crate::frontier::{Frontier, SaveDecision, UNBOUNDED};
pub use crate::sink::{JsonLinesSink, MemorySink, RecordSink};
pub use crate::target::{CrawlTarget, DropReason, TargetKind, TargetState};
