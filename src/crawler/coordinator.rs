//! Entity crawler - batch orchestration over unprocessed shards
//!
//! This module contains the crawl batch that coordinates:
//! - Selecting unprocessed shards from storage
//! - Fetching each listing with bounded retries
//! - Parsing rows and committing them with the processed flag
//! - Retrying commits while the database is busy
//! - Handling interrupts between shards

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{Page, PageFetcher};
use crate::crawler::parser::{ParsedListing, RowParser};
use crate::state::{ShardRun, ShardState};
use crate::storage::{self, CommitOutcome, ShardRecord, Storage};
use crate::{HarvestError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Counts from one crawl batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Unprocessed shards selected for the batch
    pub selected: usize,

    /// Shards whose rows were written and flagged processed
    pub committed: usize,

    /// Shards whose listing had no parseable rows
    pub empty: usize,

    /// Shards that ran out of fetch attempts or busy retries
    pub failed: usize,

    /// Shards another writer committed first
    pub already_processed: usize,

    /// Entity rows written across all committed shards
    pub entities_written: usize,

    /// True when shutdown was requested before every shard started
    pub interrupted: bool,
}

impl CrawlReport {
    fn record(&mut self, outcome: ShardOutcome) {
        match outcome {
            ShardOutcome::Committed { entities } => {
                self.committed += 1;
                self.entities_written += entities;
            }
            ShardOutcome::Empty => self.empty += 1,
            ShardOutcome::Failed => self.failed += 1,
            ShardOutcome::AlreadyProcessed => self.already_processed += 1,
        }
    }
}

/// How a single shard ended within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShardOutcome {
    Committed { entities: usize },
    Empty,
    Failed,
    AlreadyProcessed,
}

/// Processes one shard at a time; cloned into every shard task
struct ShardWorker<S> {
    storage: Arc<Mutex<S>>,
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<RowParser>,
    busy_retries: u32,
    busy_delay: Duration,
}

impl<S> Clone for ShardWorker<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            fetcher: Arc::clone(&self.fetcher),
            parser: Arc::clone(&self.parser),
            busy_retries: self.busy_retries,
            busy_delay: self.busy_delay,
        }
    }
}

impl<S: Storage + 'static> ShardWorker<S> {
    /// Walks one shard through fetch, parse and commit
    ///
    /// Fetch and busy failures end the shard without touching storage. Only
    /// non-busy storage errors are returned, and they abort the batch.
    async fn process(&self, shard: ShardRecord) -> Result<ShardOutcome> {
        let mut run = ShardRun::new(shard.id, shard.key.as_str());
        run.advance(ShardState::Fetching)?;

        let url = match Url::parse(&shard.source_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(
                    "Shard {} has an invalid listing URL '{}': {}",
                    shard.key,
                    shard.source_url,
                    e
                );
                run.advance(ShardState::Failed)?;
                return Ok(ShardOutcome::Failed);
            }
        };

        let Some(page) = self.fetch_listing(&mut run, &url).await? else {
            return Ok(ShardOutcome::Failed);
        };

        run.advance(ShardState::Parsing)?;
        let listing = self.parse(&page);

        if !listing.rejected.is_empty() {
            tracing::debug!(
                "Shard {}: skipped {} malformed rows",
                run.key(),
                listing.rejected.len()
            );
        }

        if listing.entities.is_empty() {
            tracing::warn!(
                "Shard {} yielded no rows; leaving it unprocessed",
                run.key()
            );
            run.advance(ShardState::Empty)?;
            return Ok(ShardOutcome::Empty);
        }

        self.commit(&mut run, &listing).await
    }

    /// Fetches the listing, retrying per the fetcher's policy
    ///
    /// Returns `None` once attempts are exhausted; the run is then `Failed`.
    async fn fetch_listing(&self, run: &mut ShardRun, url: &Url) -> Result<Option<Page>> {
        let policy = *self.fetcher.policy();

        loop {
            match self.fetcher.fetch(url).await {
                Ok(page) => return Ok(Some(page)),
                Err(e) if run.attempts() < policy.max_attempts => {
                    tracing::warn!(
                        "Shard {} attempt {}/{} failed: {}",
                        run.key(),
                        run.attempts(),
                        policy.max_attempts,
                        e
                    );
                    run.advance(ShardState::Retry)?;
                    tokio::time::sleep(policy.backoff).await;
                    run.advance(ShardState::Fetching)?;
                }
                Err(e) => {
                    tracing::error!(
                        "Shard {} failed after {} attempts, will retry next batch: {}",
                        run.key(),
                        run.attempts(),
                        e
                    );
                    run.advance(ShardState::Failed)?;
                    return Ok(None);
                }
            }
        }
    }

    // Html is not Send; keep it out of the async state machine.
    fn parse(&self, page: &Page) -> ParsedListing {
        let document = page.document();
        self.parser.parse_listing(&document, &page.url)
    }

    async fn commit(&self, run: &mut ShardRun, listing: &ParsedListing) -> Result<ShardOutcome> {
        let mut busy_attempts = 0;

        let outcome = loop {
            let result = {
                let mut storage = storage::lock(&self.storage)?;
                storage.commit_shard(run.shard_id(), &listing.entities)
            };

            match result {
                Ok(outcome) => break outcome,
                Err(e) if e.is_busy() && busy_attempts < self.busy_retries => {
                    busy_attempts += 1;
                    tracing::warn!(
                        "Shard {}: database busy, commit retry {}/{}",
                        run.key(),
                        busy_attempts,
                        self.busy_retries
                    );
                    tokio::time::sleep(self.busy_delay).await;
                }
                Err(e) if e.is_busy() => {
                    tracing::error!(
                        "Shard {}: database still busy after {} retries, giving up: {}",
                        run.key(),
                        self.busy_retries,
                        e
                    );
                    run.advance(ShardState::Failed)?;
                    return Ok(ShardOutcome::Failed);
                }
                Err(e) => {
                    run.advance(ShardState::Failed)?;
                    return Err(e.into());
                }
            }
        };

        match outcome {
            CommitOutcome::Committed { entities } => {
                run.advance(ShardState::Committed)?;
                tracing::info!(
                    "Shard {}: committed {} entities in {}ms",
                    run.key(),
                    entities,
                    run.elapsed_ms()
                );
                Ok(ShardOutcome::Committed { entities })
            }
            CommitOutcome::AlreadyProcessed => {
                run.advance(ShardState::Skipped)?;
                tracing::info!("Shard {} was already committed; skipping", run.key());
                Ok(ShardOutcome::AlreadyProcessed)
            }
            CommitOutcome::NoEntities => {
                run.advance(ShardState::Empty)?;
                Ok(ShardOutcome::Empty)
            }
        }
    }
}

/// Crawls unprocessed shards in bounded batches
pub struct EntityCrawler<S> {
    worker: ShardWorker<S>,
    max_concurrent: usize,
    shutdown: Arc<AtomicBool>,
}

impl<S: Storage + 'static> EntityCrawler<S> {
    /// Creates a crawler over a shared store handle
    ///
    /// # Arguments
    ///
    /// * `storage` - The shared store handle
    /// * `fetcher` - Loads shard listings; its policy bounds every fetch
    /// * `parser` - Turns a listing into entity rows
    /// * `config` - Concurrency and busy-retry settings
    pub fn new(
        storage: Arc<Mutex<S>>,
        fetcher: Arc<dyn PageFetcher>,
        parser: RowParser,
        config: &CrawlerConfig,
    ) -> Self {
        Self {
            worker: ShardWorker {
                storage,
                fetcher,
                parser: Arc::new(parser),
                busy_retries: config.busy_retries,
                busy_delay: config.busy_delay(),
            },
            max_concurrent: config.max_concurrent_shards.max(1) as usize,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Uses `flag` to request a stop; checked before each shard starts
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    /// Runs one crawl batch
    ///
    /// Selects up to `batch_limit` unprocessed shards, oldest first, and
    /// processes them with at most `max_concurrent_shards` in flight.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The batch finished; per-shard failures are counted
    /// * `Err(HarvestError)` - A storage error aborted the batch
    pub async fn crawl(&self, batch_limit: u32) -> Result<CrawlReport> {
        let shards = {
            let storage = storage::lock(&self.worker.storage)?;
            storage.pending_shards(batch_limit)?
        };

        let mut report = CrawlReport {
            selected: shards.len(),
            ..Default::default()
        };

        if shards.is_empty() {
            tracing::info!("No unprocessed shards, nothing to crawl");
            return Ok(report);
        }

        tracing::info!(
            "Crawling {} shards ({} at a time)",
            shards.len(),
            self.max_concurrent
        );
        let start_time = std::time::Instant::now();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let halted = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();

        for shard in shards {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| HarvestError::Task(e.to_string()))?;

            if halted.load(Ordering::SeqCst) {
                break;
            }
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::info!("Shutdown requested, not starting remaining shards");
                report.interrupted = true;
                break;
            }

            let worker = self.worker.clone();
            let halted = Arc::clone(&halted);
            tasks.spawn(async move {
                let _permit = permit;
                let result = worker.process(shard).await;
                if result.is_err() {
                    halted.store(true, Ordering::SeqCst);
                }
                result
            });
        }

        let mut fatal: Option<HarvestError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(outcome)) => report.record(outcome),
                Ok(Err(e)) => {
                    if fatal.is_none() {
                        tracing::error!("Aborting crawl batch: {}", e);
                        tasks.abort_all();
                        fatal = Some(e);
                    }
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    if fatal.is_none() {
                        tasks.abort_all();
                        fatal = Some(HarvestError::Task(e.to_string()));
                    }
                }
            }
        }

        if let Some(e) = fatal {
            return Err(e);
        }

        tracing::info!(
            "Crawl batch complete in {:?}: {} committed ({} entities), {} empty, {} failed, {} already processed",
            start_time.elapsed(),
            report.committed,
            report.entities_written,
            report.empty,
            report.failed,
            report.already_processed
        );

        Ok(report)
    }
}
