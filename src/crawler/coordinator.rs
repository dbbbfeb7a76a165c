//! Crawler coordinator - main crawl orchestration logic
//!
//! One run wires together:
//! - one listing walker per category, at most `max-concurrent-categories`
//!   of them active at a time
//! - a bounded queue of item references between walkers and workers
//! - `max-concurrent-detail-fetches` detail workers writing to the sink
//! - a bounded event channel drained by the caller
//!
//! A failure is confined to the page or item that caused it. Only a sink
//! that cannot be flushed or a panicked task fails the run as a whole.

use super::detail::{DetailError, DetailFetcher};
use super::fetcher::{Fetch, HttpFetcher};
use super::report::{CrawlEvent, CrawlFailure, CrawlSummary, Tally};
use super::scheduler::{work_queue, StopSignal, WorkReceiver, WorkSender};
use super::walker::{ListingWalker, WalkError};
use crate::catalog::CategoryId;
use crate::config::Config;
use crate::output::Sink;
use crate::CrawlError;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

/// Capacity of the event channel between the crawl and its caller
const EVENT_CAPACITY: usize = 256;

/// Records between two progress log lines
const PROGRESS_INTERVAL: u64 = 100;

/// Main crawler coordinator structure
///
/// A coordinator owns one stop signal; once stopped, later runs end
/// immediately.
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetch>,
    sink: Arc<dyn Sink>,
    stop: StopSignal,
}

impl Coordinator {
    pub fn new(config: Config, fetcher: Arc<dyn Fetch>, sink: Arc<dyn Sink>) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            sink,
            stop: StopSignal::new(),
        }
    }

    /// Creates a coordinator fetching over HTTP with settings from `config`
    pub fn with_http(config: Config, sink: Arc<dyn Sink>) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::new(&config.crawler)?;
        Ok(Self::new(config, Arc::new(fetcher), sink))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Signal that stops every run of this coordinator
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Starts a crawl in the background
    ///
    /// Duplicate categories are crawled once. Events must be drained through
    /// the returned handle, or the crawl stalls once the channel is full.
    ///
    /// # Errors
    ///
    /// `CrawlError::NoCategories` if `categories` is empty.
    pub fn spawn(&self, categories: Vec<CategoryId>) -> Result<CrawlHandle, CrawlError> {
        let categories = dedup_categories(categories);
        if categories.is_empty() {
            return Err(CrawlError::NoCategories);
        }

        let settings = &self.config.crawler;
        tracing::info!(
            "Starting crawl of {} categories ({} concurrent, {} detail workers)",
            categories.len(),
            settings.max_concurrent_categories,
            settings.max_concurrent_detail_fetches
        );

        let (work_tx, work_rx) = work_queue(settings.queue_capacity as usize);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);
        let tally = Arc::new(Tally::new(categories.len()));
        let seen = Arc::new(Mutex::new(HashSet::new()));
        let permits = Arc::new(Semaphore::new(
            settings.max_concurrent_categories.max(1) as usize,
        ));

        let mut walkers = JoinSet::new();
        for category in categories {
            let task = CategoryTask {
                walker: ListingWalker::new(category, self.fetcher.clone(), self.config.clone()),
                permits: permits.clone(),
                queue: work_tx.clone(),
                events: event_tx.clone(),
                stop: self.stop.clone(),
                tally: tally.clone(),
                seen: seen.clone(),
            };
            walkers.spawn(task.run());
        }
        drop(work_tx);

        let detail = Arc::new(DetailFetcher::new(
            self.fetcher.clone(),
            self.config.clone(),
        ));
        let mut workers = JoinSet::new();
        for worker_id in 0..settings.max_concurrent_detail_fetches.max(1) {
            let worker = DetailWorker {
                id: worker_id,
                detail: detail.clone(),
                queue: work_rx.clone(),
                sink: self.sink.clone(),
                events: event_tx.clone(),
                stop: self.stop.clone(),
                tally: tally.clone(),
            };
            workers.spawn(worker.run());
        }
        drop(work_rx);
        drop(event_tx);

        let sink = self.sink.clone();
        let stop = self.stop.clone();
        let task = tokio::spawn(async move {
            while let Some(joined) = walkers.join_next().await {
                joined?;
            }
            while let Some(joined) = workers.join_next().await {
                joined?;
            }
            sink.flush().await?;
            Ok::<_, CrawlError>(tally.finish(stop.is_stopped()))
        });

        Ok(CrawlHandle {
            events: event_rx,
            stop: self.stop.clone(),
            task,
        })
    }

    /// Runs a crawl to completion, discarding events
    pub async fn run(&self, categories: Vec<CategoryId>) -> Result<CrawlSummary, CrawlError> {
        let summary = self.spawn(categories)?.finish().await?;

        tracing::info!(
            "Crawl completed: {} records written, {} failures, {} cancelled in {:.1}s",
            summary.records_written,
            summary.total_failures(),
            summary.cancelled,
            summary.duration.as_secs_f64()
        );

        Ok(summary)
    }
}

/// Handle on a running crawl
pub struct CrawlHandle {
    events: mpsc::Receiver<CrawlEvent>,
    stop: StopSignal,
    task: JoinHandle<Result<CrawlSummary, CrawlError>>,
}

impl CrawlHandle {
    /// Next event, or `None` once every task has finished
    pub async fn next_event(&mut self) -> Option<CrawlEvent> {
        self.events.recv().await
    }

    pub fn stop_handle(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Requests a stop; in-flight fetches still complete
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Drains remaining events and waits for the summary
    pub async fn finish(mut self) -> Result<CrawlSummary, CrawlError> {
        while self.events.recv().await.is_some() {}
        self.task.await?
    }
}

fn dedup_categories(categories: Vec<CategoryId>) -> Vec<CategoryId> {
    let mut seen = HashSet::new();
    categories
        .into_iter()
        .filter(|category| {
            let first = seen.insert(category.clone());
            if !first {
                tracing::warn!("Category {} listed more than once", category);
            }
            first
        })
        .collect()
}

async fn report(events: &mpsc::Sender<CrawlEvent>, event: CrawlEvent) {
    // A caller that dropped its handle no longer wants events
    let _ = events.send(event).await;
}

/// Walks one category and feeds the work queue
struct CategoryTask {
    walker: ListingWalker,
    permits: Arc<Semaphore>,
    queue: WorkSender,
    events: mpsc::Sender<CrawlEvent>,
    stop: StopSignal,
    tally: Arc<Tally>,
    seen: Arc<Mutex<HashSet<String>>>,
}

impl CategoryTask {
    async fn run(mut self) {
        let category = self.walker.category().clone();

        let permit = tokio::select! {
            biased;
            _ = self.stop.stopped() => None,
            permit = self.permits.clone().acquire_owned() => permit.ok(),
        };

        if permit.is_some() {
            tracing::info!("Walking category {}", category);
            self.walk().await;
        }
        drop(permit);

        let state = self.walker.state();
        let pages = self.walker.pages_fetched();
        self.tally.category_finished(state);
        self.tally.update(|s| s.pages_fetched += u64::from(pages));
        tracing::info!(
            "Category {} finished ({}): {} pages, {} items",
            category,
            state,
            pages,
            self.walker.items_emitted()
        );
        report(
            &self.events,
            CrawlEvent::CategoryFinished {
                category,
                state,
                pages,
                items: self.walker.items_emitted(),
            },
        )
        .await;
    }

    async fn walk(&mut self) {
        while !self.stop.is_stopped() {
            let page = self.walker.cursor().page();
            let items = match self.walker.next_page().await {
                Ok(Some(items)) => items,
                Ok(None) => return,
                Err(error) => {
                    self.page_failed(page, error).await;
                    return;
                }
            };

            for reference in items {
                if !self.first_sighting(&reference.item_url) {
                    tracing::debug!("Skipping duplicate item {}", reference.item_url);
                    self.tally.update(|s| s.duplicates_skipped += 1);
                    continue;
                }
                if !self.queue.push(reference, &self.stop).await {
                    return;
                }
                self.tally.update(|s| s.items_discovered += 1);
            }
        }
    }

    async fn page_failed(&self, page: u32, error: WalkError) {
        let category = self.walker.category().clone();
        tracing::warn!("Category {} page {} failed: {}", category, page, error);

        let failure = match error {
            WalkError::Fetch(error) => CrawlFailure::ListingFetch {
                category,
                page,
                error,
            },
            WalkError::Schema(error) => CrawlFailure::ListingSchema {
                category,
                page,
                error,
            },
        };
        self.tally.failure(failure.kind());
        report(&self.events, CrawlEvent::Failure(failure)).await;
    }

    fn first_sighting(&self, item_url: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.insert(item_url.to_string())
    }
}

/// Consumes item references until the queue closes
struct DetailWorker {
    id: u32,
    detail: Arc<DetailFetcher>,
    queue: WorkReceiver,
    sink: Arc<dyn Sink>,
    events: mpsc::Sender<CrawlEvent>,
    stop: StopSignal,
    tally: Arc<Tally>,
}

impl DetailWorker {
    async fn run(self) {
        tracing::debug!("Detail worker {} started", self.id);

        while let Some(reference) = self.queue.next().await {
            if self.stop.is_stopped() {
                self.tally.update(|s| s.cancelled += 1);
                continue;
            }

            let outcome = self.detail.fetch_detail(&reference).await;
            let failure = match outcome {
                Ok(record) => {
                    let written = self.sink.write(&record).await;
                    match written {
                        Ok(()) => {
                            self.record_written();
                            report(&self.events, CrawlEvent::Record(record)).await;
                            continue;
                        }
                        Err(error) => CrawlFailure::Write {
                            rpc: record.rpc,
                            error,
                        },
                    }
                }
                Err(DetailError::Fetch(error)) => CrawlFailure::DetailFetch { reference, error },
                Err(DetailError::Normalization(error)) => {
                    CrawlFailure::Normalization { reference, error }
                }
            };

            tracing::warn!("{}", failure);
            self.tally.failure(failure.kind());
            report(&self.events, CrawlEvent::Failure(failure)).await;
        }

        tracing::debug!("Detail worker {} finished", self.id);
    }

    fn record_written(&self) {
        let written = self.tally.update(|s| {
            s.records_written += 1;
            s.records_written
        });
        if written % PROGRESS_INTERVAL == 0 {
            let elapsed = self.tally.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                written as f64 / elapsed
            } else {
                0.0
            };
            tracing::info!("Progress: {} records written, {:.2} records/sec", written, rate);
        }
    }
}
