//! Crawl events and run summary

use crate::catalog::{CanonicalRecord, CategoryId, ItemReference};
use crate::output::WriteError;
use crate::state::WalkState;
use crate::{FetchError, NormalizationError, SchemaError};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Observable outcome of a running crawl
#[derive(Debug)]
pub enum CrawlEvent {
    /// A record was written to the sink
    Record(CanonicalRecord),

    /// A page or item failed; the rest of the crawl continues
    Failure(CrawlFailure),

    /// A category's walk ended
    ///
    /// `state` is `Active` when the walk was cut short by a stop request.
    CategoryFinished {
        category: CategoryId,
        state: WalkState,
        pages: u32,
        items: u64,
    },
}

/// One failure, attributed to the category page or item that caused it
#[derive(Debug, Error)]
pub enum CrawlFailure {
    #[error("Listing page {page} of {category} failed: {error}")]
    ListingFetch {
        category: CategoryId,
        page: u32,
        error: FetchError,
    },

    #[error("Listing page {page} of {category} is malformed: {error}")]
    ListingSchema {
        category: CategoryId,
        page: u32,
        error: SchemaError,
    },

    #[error("Detail of {} failed: {error}", .reference.item_url)]
    DetailFetch {
        reference: ItemReference,
        error: FetchError,
    },

    #[error("Item {} could not be normalized: {error}", .reference.item_url)]
    Normalization {
        reference: ItemReference,
        error: NormalizationError,
    },

    #[error("Record {rpc} could not be written: {error}")]
    Write { rpc: String, error: WriteError },
}

impl CrawlFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ListingFetch { .. } => FailureKind::ListingFetch,
            Self::ListingSchema { .. } => FailureKind::ListingSchema,
            Self::DetailFetch { .. } => FailureKind::DetailFetch,
            Self::Normalization { .. } => FailureKind::Normalization,
            Self::Write { .. } => FailureKind::Write,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    ListingFetch,
    ListingSchema,
    DetailFetch,
    Normalization,
    Write,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListingFetch => "listing_fetch",
            Self::ListingSchema => "listing_schema",
            Self::DetailFetch => "detail_fetch",
            Self::Normalization => "normalization",
            Self::Write => "write",
        }
    }
}

/// Counters of one finished crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub categories: usize,
    pub categories_exhausted: usize,
    pub categories_failed: usize,

    /// Walks cut short by a stop request
    pub categories_stopped: usize,

    pub pages_fetched: u64,
    pub items_discovered: u64,

    /// References skipped because the same item was already queued
    pub duplicates_skipped: u64,

    pub records_written: u64,

    /// Queued references discarded after a stop request
    pub cancelled: u64,

    pub failures: BTreeMap<FailureKind, u64>,
    pub duration: Duration,
    pub stopped: bool,
}

impl CrawlSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }

    pub fn failures_of(&self, kind: FailureKind) -> u64 {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    /// Share of discovered items that ended up written, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.items_discovered == 0 {
            return 0.0;
        }
        (self.records_written as f64 / self.items_discovered as f64) * 100.0
    }
}

/// Shared, lock-protected summary updated by every crawl task
#[derive(Debug)]
pub(crate) struct Tally {
    started: Instant,
    summary: Mutex<CrawlSummary>,
}

impl Tally {
    pub fn new(categories: usize) -> Self {
        Self {
            started: Instant::now(),
            summary: Mutex::new(CrawlSummary {
                categories,
                ..CrawlSummary::default()
            }),
        }
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut CrawlSummary) -> R) -> R {
        let mut summary = self.summary.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut summary)
    }

    pub fn failure(&self, kind: FailureKind) {
        self.update(|s| *s.failures.entry(kind).or_insert(0) += 1);
    }

    pub fn category_finished(&self, state: WalkState) {
        self.update(|s| match state {
            WalkState::Exhausted => s.categories_exhausted += 1,
            WalkState::Failed => s.categories_failed += 1,
            WalkState::Active => s.categories_stopped += 1,
        });
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn finish(&self, stopped: bool) -> CrawlSummary {
        let elapsed = self.elapsed();
        self.update(|s| {
            s.duration = elapsed;
            s.stopped = stopped;
            s.clone()
        })
    }
}
