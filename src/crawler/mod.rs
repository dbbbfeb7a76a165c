//! Crawler module for walking the catalog and fetching item details
//!
//! This module contains the core crawling logic, including:
//! - The fetch collaborator and its HTTP implementation
//! - Paginated listing walkers, one per category
//! - Detail fetching and normalization of listed items
//! - The work queue and stop signal shared by crawl tasks
//! - Overall crawl coordination and reporting

mod coordinator;
mod detail;
mod fetcher;
mod report;
mod scheduler;
mod walker;

pub use coordinator::{CrawlHandle, Coordinator};
pub use detail::{DetailError, DetailFetcher};
pub use fetcher::{
    build_http_client, fetch_with_timeout, Fetch, FetchRequest, FetchResponse, HttpFetcher, Method,
};
pub use report::{CrawlEvent, CrawlFailure, CrawlSummary, FailureKind};
pub use scheduler::{work_queue, StopSignal, WorkReceiver, WorkSender};
pub use walker::{listing_url, parse_listing, ListingWalker, WalkError};

use crate::catalog::CategoryId;
use crate::config::Config;
use crate::output::Sink;
use crate::CrawlError;
use std::sync::Arc;

/// Runs a complete crawl of the configured categories over HTTP
///
/// This is the main entry point for embedding the crawler. It will:
/// 1. Parse the category ids from the configuration
/// 2. Build the HTTP fetcher
/// 3. Walk every category and write each record to `sink`
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl finished (possibly with per-item failures)
/// * `Err(CrawlError)` - The run as a whole could not proceed
pub async fn crawl(config: Config, sink: Arc<dyn Sink>) -> Result<CrawlSummary, CrawlError> {
    let categories = CategoryId::parse_all(config.categories.clone())?;
    Coordinator::with_http(config, sink)?.run(categories).await
}
