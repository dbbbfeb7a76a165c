//! Detail fetcher
//!
//! Fetches the detail document of one item reference and hands it to the
//! normalizer, using the listing-time category title as the section.

use super::fetcher::{fetch_with_timeout, Fetch, FetchRequest};
use crate::catalog::{CanonicalRecord, DetailPayload, ItemReference};
use crate::config::Config;
use crate::normalize::Normalizer;
use crate::{FetchError, NormalizationError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Reason one item produced no record
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DetailError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Normalization(#[from] NormalizationError),
}

pub struct DetailFetcher {
    fetcher: Arc<dyn Fetch>,
    config: Arc<Config>,
    normalizer: Normalizer,
    timeout: Duration,
}

impl DetailFetcher {
    pub fn new(fetcher: Arc<dyn Fetch>, config: Arc<Config>) -> Self {
        let normalizer = Normalizer::new(config.api.catalog_url.clone());
        let timeout = config.crawler.fetch_budget();
        Self {
            fetcher,
            config,
            normalizer,
            timeout,
        }
    }

    pub fn detail_request(&self, reference: &ItemReference) -> FetchRequest {
        FetchRequest::get(self.config.api.detail_endpoint(&reference.item_url))
            .with_headers(self.config.api.request_headers())
    }

    /// Fetches and normalizes one item
    ///
    /// A body that is not a detail document is reported as
    /// `NormalizationError::Malformed`. When the document has no `url`, the
    /// reference's slug is used.
    pub async fn fetch_detail(
        &self,
        reference: &ItemReference,
    ) -> Result<CanonicalRecord, DetailError> {
        let request = self.detail_request(reference);
        let body = fetch_with_timeout(self.fetcher.as_ref(), request, self.timeout).await?;

        let mut payload =
            DetailPayload::from_json(&body).map_err(|e| NormalizationError::Malformed {
                item: reference.item_url.clone(),
                message: e.to_string(),
            })?;
        if payload.url.as_deref().map_or(true, |u| u.trim().is_empty()) {
            payload.url = Some(reference.item_url.clone());
        }

        Ok(self
            .normalizer
            .normalize(&payload, &reference.category_title)?)
    }
}
