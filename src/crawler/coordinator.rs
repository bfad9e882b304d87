//! Crawler coordinator - main crawl orchestration logic
//!
//! The [`Crawler`] owns one run from start to finish:
//! - Seeding the frontier from keyword lookups, static URLs and the savestate
//! - Spawning the worker pool and collecting its results
//! - Appending every result to the visit log and the run statistics
//! - Deciding when to drain and recording progress in the savestate

use crate::address::AddressExtractor;
use crate::config::Config;
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::LinkExtractor;
use crate::crawler::transport::Transport;
use crate::crawler::worker::{Worker, WorkerContext, WorkerStats};
use crate::output::{CrawlSummary, OutputSink, SummaryRecorder};
use crate::seeds::{load_keywords, SeedError, SeedLookup};
use crate::state::{UrlRecord, VisitResult};
use crate::storage::{RunStatus, Savestate};
use crate::SieveError;
use chrono::Utc;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use url::Url;

/// Results between progress log lines
const PROGRESS_INTERVAL: u64 = 10;

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The frontier ran dry
    Exhausted,
    /// `max-pages` terminal outcomes were recorded
    PageLimit,
    /// `max-runtime-secs` elapsed
    Deadline,
    /// Stopped from outside, usually Ctrl-C
    Stopped,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::PageLimit => "page_limit",
            Self::Deadline => "deadline",
            Self::Stopped => "stopped",
        }
    }

    /// Status recorded for the run in the savestate
    ///
    /// Only an exhausted frontier completes a run; every other ending leaves
    /// work behind that a later invocation can resume.
    pub fn run_status(&self) -> RunStatus {
        match self {
            Self::Exhausted => RunStatus::Completed,
            _ => RunStatus::Interrupted,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requests a graceful stop of a running crawl
///
/// Cloneable and usable from any task or signal handler. A stop requested
/// before the crawl starts running takes effect as soon as it does.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    notify: Arc<Notify>,
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.notify.notify_one();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// What a finished run reports back to the caller
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub termination: Termination,
    pub summary: CrawlSummary,
    pub workers: WorkerStats,
}

/// Main crawler coordinator structure
pub struct Crawler {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    seeds: Arc<dyn SeedLookup>,
    sink: Box<dyn OutputSink>,
    links: Arc<LinkExtractor>,
    frontier: Arc<Frontier>,
    savestate: Option<Savestate>,
    stop: StopHandle,
}

impl Crawler {
    /// Creates a new crawler
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `transport` - Fetches pages, normally a [`ProxyTransport`](crate::crawler::ProxyTransport)
    /// * `seeds` - Turns keywords into start URLs
    /// * `sink` - Receives every visit result
    pub fn new(
        config: Arc<Config>,
        transport: Arc<dyn Transport>,
        seeds: Arc<dyn SeedLookup>,
        sink: Box<dyn OutputSink>,
    ) -> Self {
        let frontier = Frontier::new(
            config.crawler.max_depth,
            config.crawler.max_pending,
            config.crawler.max_retries,
        );
        let links = LinkExtractor::from_config(&config.scope);

        Self {
            config,
            transport,
            seeds,
            sink,
            links: Arc::new(links),
            frontier: Arc::new(frontier),
            savestate: None,
            stop: StopHandle::new(),
        }
    }

    /// Persists the frontier into `savestate` and restores from it
    pub fn with_savestate(mut self, savestate: Savestate) -> Self {
        self.savestate = Some(savestate);
        self
    }

    /// Handle that drains the crawl when triggered
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Shared frontier, mostly useful for inspection after a run
    pub fn frontier(&self) -> Arc<Frontier> {
        Arc::clone(&self.frontier)
    }

    /// Runs the crawl to termination
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The run ended, for whatever reason
    /// * `Err(SieveError)` - Seeding failed or the sink or savestate broke
    pub async fn run(mut self) -> Result<CrawlReport, SieveError> {
        let started_at = Utc::now();
        // seeding counts against the runtime limit
        let deadline = self
            .config
            .crawler
            .max_runtime()
            .map(|limit| tokio::time::Instant::now() + limit);

        let prior_visits = match self.seed().await {
            Ok(prior_visits) => prior_visits,
            Err(e) => {
                tracing::error!("Seeding failed: {}", e);
                self.finish_run(RunStatus::Failed);
                return Err(e);
            }
        };

        let mut recorder = SummaryRecorder::starting_at(started_at);
        let outcome = self.crawl(&mut recorder, deadline, prior_visits).await;

        match outcome {
            Ok((termination, workers)) => {
                self.sink.flush()?;
                self.record_progress(&[])?;
                self.finish_run(termination.run_status());

                let summary = recorder.finish(termination.as_str());
                tracing::info!(
                    "Crawl finished ({}): {} pages visited, {} unique addresses",
                    termination,
                    summary.pages_visited,
                    summary.unique_addresses()
                );

                Ok(CrawlReport {
                    termination,
                    summary,
                    workers,
                })
            }
            Err(e) => {
                tracing::error!("Crawl aborted: {}", e);
                if let Err(flush_error) = self.sink.flush() {
                    tracing::warn!("Failed to flush visit log: {}", flush_error);
                }
                if let Err(save_error) = self.record_progress(&[]) {
                    tracing::warn!("Failed to save frontier: {}", save_error);
                }
                self.finish_run(RunStatus::Failed);
                Err(e)
            }
        }
    }

    /// Fills the frontier from the savestate and the seed sources
    ///
    /// Returns how many URLs earlier invocations of a resumed run already
    /// visited.
    async fn seed(&mut self) -> Result<u64, SieveError> {
        let mut restored = 0;
        let mut prior_visits = 0;
        if let Some(snapshot) = self.savestate.as_mut().and_then(|s| s.restored.take()) {
            prior_visits = snapshot.visited.len() as u64;
            restored = self.frontier.restore(snapshot);
            tracing::info!(
                "Restored {} pending and {} visited URLs from savestate",
                restored,
                prior_visits
            );
        }

        let keywords = match &self.config.seeds.keyword_path {
            Some(path) => load_keywords(path)?,
            None => Vec::new(),
        };
        tracing::info!("Looking up seeds for {} keywords", keywords.len());

        let mut candidates = self.seeds.lookup(&keywords).await?;
        candidates.extend(self.config.seeds.urls.iter().cloned());

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for candidate in &candidates {
            let accepted = Url::parse(candidate.trim())
                .ok()
                .and_then(|url| self.links.accept(url));

            match accepted {
                Some(url) => {
                    let url = String::from(url);
                    if seen.insert(url.clone()) {
                        records.push(UrlRecord::seed(url));
                    }
                }
                None => tracing::debug!("Skipping out-of-scope seed {}", candidate),
            }
        }

        if records.is_empty() && restored == 0 {
            return Err(SeedError::NoSeeds.into());
        }

        let report = self.frontier.seed(records);
        tracing::info!(
            "Seeded frontier with {} URLs ({} already known)",
            report.accepted,
            report.duplicates
        );
        self.record_progress(&[])?;

        Ok(prior_visits)
    }

    /// Runs the worker pool until every worker has exited
    ///
    /// `max-pages` covers the whole run, so `prior_visits` from earlier
    /// invocations count against it.
    async fn crawl(
        &mut self,
        recorder: &mut SummaryRecorder,
        deadline: Option<tokio::time::Instant>,
        prior_visits: u64,
    ) -> Result<(Termination, WorkerStats), SieveError> {
        let crawler_config = &self.config.crawler;
        let worker_count = crawler_config.workers.max(1) as usize;
        let max_pages = crawler_config.max_pages;

        let ctx = WorkerContext {
            frontier: Arc::clone(&self.frontier),
            transport: Arc::clone(&self.transport),
            addresses: Arc::new(AddressExtractor::new()),
            links: Arc::clone(&self.links),
            idle_backoff: crawler_config.idle_backoff(),
            reject_v2_onions: self.config.scope.reject_v2_onions,
        };

        let (results_tx, mut results_rx) = mpsc::channel::<VisitResult>(worker_count * 2);
        let (drain_tx, drain_rx) = watch::channel(false);

        let mut termination: Option<Termination> = None;
        if self.stop.is_stopped() {
            termination = Some(Termination::Stopped);
            drain_tx.send_replace(true);
        } else if max_pages.is_some_and(|max| prior_visits >= max) {
            tracing::info!("Page limit already reached by earlier invocations of this run");
            termination = Some(Termination::PageLimit);
            drain_tx.send_replace(true);
        }

        let handles: Vec<JoinHandle<WorkerStats>> = (0..worker_count)
            .map(|id| {
                let worker = Worker::new(id, ctx.clone(), results_tx.clone(), drain_rx.clone());
                tokio::spawn(worker.run())
            })
            .collect();
        drop(results_tx);
        tracing::info!("Started {} workers", worker_count);

        let notify = Arc::clone(&self.stop.notify);
        let deadline = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let start_time = Instant::now();
        let mut fault: Option<SieveError> = None;

        loop {
            tokio::select! {
                received = results_rx.recv() => {
                    let Some(result) = received else {
                        break;
                    };

                    if let Err(e) = self.sink.write(&result) {
                        fault = Some(e.into());
                        drain_tx.send_replace(true);
                        break;
                    }
                    if let Err(e) = self.record_progress(std::slice::from_ref(&result.url)) {
                        fault = Some(e);
                        drain_tx.send_replace(true);
                        break;
                    }
                    recorder.record(&result);

                    let visited = recorder.pages_visited();
                    if visited % PROGRESS_INTERVAL == 0 {
                        let stats = self.frontier.stats();
                        tracing::info!(
                            "Progress: {} pages visited, {} pending, {} in flight, {} addresses, {:.2} pages/sec",
                            visited,
                            stats.pending,
                            stats.in_flight,
                            recorder.unique_addresses(),
                            visited as f64 / start_time.elapsed().as_secs_f64().max(f64::EPSILON)
                        );
                    }

                    if termination.is_none()
                        && max_pages.is_some_and(|max| prior_visits + visited >= max)
                    {
                        tracing::info!("Reached page limit of {}, draining", visited);
                        termination = Some(Termination::PageLimit);
                        drain_tx.send_replace(true);
                    }
                }
                _ = notify.notified(), if termination.is_none() => {
                    tracing::info!("Stop requested, draining");
                    termination = Some(Termination::Stopped);
                    drain_tx.send_replace(true);
                }
                _ = &mut deadline, if termination.is_none() => {
                    tracing::info!("Runtime limit reached, draining");
                    termination = Some(Termination::Deadline);
                    drain_tx.send_replace(true);
                }
            }
        }

        // Workers blocked on a full channel exit once the receiver is gone.
        drop(results_rx);

        let mut totals = WorkerStats::default();
        for handle in handles {
            match handle.await {
                Ok(stats) => {
                    totals.fetches += stats.fetches;
                    totals.results += stats.results;
                    totals.retries += stats.retries;
                }
                Err(e) => tracing::warn!("Worker task ended abnormally: {}", e),
            }
        }

        if let Some(e) = fault {
            return Err(e);
        }

        Ok((termination.unwrap_or(Termination::Exhausted), totals))
    }

    /// Records newly queued URLs and `visited` in the savestate
    ///
    /// Called in the same step that logs a result, so every logged URL is
    /// in the saved visited set and its links are in the saved queue. The
    /// frontier's queue changes are drained even without a savestate.
    fn record_progress(&mut self, visited: &[String]) -> Result<(), SieveError> {
        let enqueued = self.frontier.take_enqueued();
        if let Some(savestate) = self.savestate.as_mut() {
            savestate.storage.record_progress(&enqueued, visited)?;
            tracing::trace!(
                "Saved {} queued and {} visited URLs",
                enqueued.len(),
                visited.len()
            );
        }
        Ok(())
    }

    fn finish_run(&mut self, status: RunStatus) {
        if let Some(savestate) = self.savestate.as_mut() {
            if let Err(e) = savestate.storage.finish_run(savestate.run_id, status) {
                tracing::warn!("Failed to mark run {} finished: {}", savestate.run_id, e);
            }
        }
    }
}
