//! Crawl worker
//!
//! Each worker loops claim → fetch → extract → report until the frontier is
//! drained or the orchestrator raises the drain signal. Per-URL failures,
//! including panics inside the fetch task, become [`VisitResult`] data and
//! never end the loop.

use crate::address::AddressExtractor;
use crate::crawler::frontier::{Abandon, Claim, ClaimedUrl, Frontier};
use crate::crawler::parser::LinkExtractor;
use crate::crawler::transport::{FetchError, FetchOutcome, Transport};
use crate::state::{FailureKind, UrlRecord, VisitResult};
use crate::url::is_v2_onion;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use url::Url;

/// Idle backoff never grows past this multiple of the base delay
const MAX_BACKOFF_FACTOR: u32 = 8;

/// Read-only pieces every worker shares
#[derive(Clone)]
pub struct WorkerContext {
    pub frontier: Arc<Frontier>,
    pub transport: Arc<dyn Transport>,
    pub addresses: Arc<AddressExtractor>,
    pub links: Arc<LinkExtractor>,
    pub idle_backoff: Duration,
    pub reject_v2_onions: bool,
}

/// Counters a worker reports when it exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub fetches: u64,
    pub results: u64,
    pub retries: u64,
}

/// Outcome of the spawned fetch-and-extract step
enum PageOutcome {
    Page {
        status: u16,
        addresses: BTreeSet<String>,
        links: Vec<Url>,
        title: Option<String>,
    },
    Transient(FetchError),
    Permanent(FetchError),
}

pub struct Worker {
    id: usize,
    ctx: WorkerContext,
    results: mpsc::Sender<VisitResult>,
    drain: watch::Receiver<bool>,
    stats: WorkerStats,
}

impl Worker {
    pub fn new(
        id: usize,
        ctx: WorkerContext,
        results: mpsc::Sender<VisitResult>,
        drain: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            ctx,
            results,
            drain,
            stats: WorkerStats::default(),
        }
    }

    /// Runs until the frontier drains, the drain signal is raised, or the
    /// result channel closes
    pub async fn run(mut self) -> WorkerStats {
        let base = self.ctx.idle_backoff;
        let mut backoff = base;

        loop {
            let draining = *self.drain.borrow();
            if draining {
                tracing::debug!("Worker {} draining", self.id);
                break;
            }

            match self.ctx.frontier.claim() {
                Claim::Drained => {
                    tracing::debug!("Worker {} found the frontier drained", self.id);
                    break;
                }
                Claim::Idle => {
                    if !self.idle_wait(backoff).await {
                        break;
                    }
                    backoff = (backoff * 2).min(base * MAX_BACKOFF_FACTOR);
                }
                Claim::Ready(claimed) => {
                    backoff = base;
                    if let Some(result) = self.visit(claimed).await {
                        self.stats.results += 1;
                        if self.results.send(result).await.is_err() {
                            tracing::warn!("Worker {}: result channel closed", self.id);
                            break;
                        }
                    }
                }
            }
        }

        self.stats
    }

    /// Sleeps for `delay` or until the drain signal changes
    ///
    /// Returns false once the signal's sender is gone.
    async fn idle_wait(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            changed = self.drain.changed() => changed.is_ok(),
        }
    }

    /// Visits one claimed URL; returns a result only for terminal outcomes
    async fn visit(&mut self, claimed: ClaimedUrl) -> Option<VisitResult> {
        let ClaimedUrl {
            record,
            retry_count,
        } = claimed;
        let started = Instant::now();

        let url = match Url::parse(&record.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Worker {}: malformed URL {}: {}", self.id, record.url, e);
                return Some(self.finish_failed(
                    &record,
                    FailureKind::MalformedUrl,
                    retry_count,
                    started,
                ));
            }
        };

        if self.ctx.reject_v2_onions && url.host_str().is_some_and(is_v2_onion) {
            tracing::debug!("Skipping deprecated v2 onion {}", record.url);
            return Some(self.finish_failed(
                &record,
                FailureKind::DeprecatedOnion,
                retry_count,
                started,
            ));
        }

        self.stats.fetches += 1;
        let task = tokio::spawn(fetch_and_extract(
            Arc::clone(&self.ctx.transport),
            Arc::clone(&self.ctx.addresses),
            Arc::clone(&self.ctx.links),
            url,
        ));

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    "Worker {}: fetch task for {} failed: {}",
                    self.id,
                    record.url,
                    e
                );
                return Some(self.finish_failed(
                    &record,
                    FailureKind::WorkerFault,
                    retry_count,
                    started,
                ));
            }
        };

        match outcome {
            PageOutcome::Page {
                status,
                addresses,
                links,
                title,
            } => {
                let links_found = links.len();
                if !addresses.is_empty() {
                    tracing::info!("Found {} address(es) on {}", addresses.len(), record.url);
                }

                let children = links
                    .into_iter()
                    .map(|link| UrlRecord::child_of(&record, String::from(link)));
                let report = self.ctx.frontier.complete(&record.url, children);
                tracing::debug!(
                    "Visited {} ({}): {} links, {} new",
                    record.url,
                    status,
                    links_found,
                    report.accepted
                );

                Some(
                    VisitResult::success(&record, status, addresses, links_found, title)
                        .with_retry_count(retry_count)
                        .with_elapsed_ms(elapsed_ms(started)),
                )
            }
            PageOutcome::Transient(error) => {
                match self.ctx.frontier.abandon(&record.url) {
                    Abandon::Requeued { retry_count } => {
                        self.stats.retries += 1;
                        tracing::debug!(
                            "Requeued {} after {} (retry {})",
                            record.url,
                            error.kind,
                            retry_count
                        );
                        None
                    }
                    Abandon::Exhausted { retry_count } => {
                        tracing::debug!("Giving up on {}: {}", record.url, error.message);
                        Some(failure_result(&record, &error, retry_count, started))
                    }
                    Abandon::NotInFlight => None,
                }
            }
            PageOutcome::Permanent(error) => {
                tracing::debug!("Failed {}: {}", record.url, error.message);
                self.ctx.frontier.complete(&record.url, Vec::new());
                Some(failure_result(&record, &error, retry_count, started))
            }
        }
    }

    fn finish_failed(
        &self,
        record: &UrlRecord,
        kind: FailureKind,
        retry_count: u32,
        started: Instant,
    ) -> VisitResult {
        self.ctx.frontier.complete(&record.url, Vec::new());
        VisitResult::failure(record, kind, None)
            .with_retry_count(retry_count)
            .with_elapsed_ms(elapsed_ms(started))
    }
}

async fn fetch_and_extract(
    transport: Arc<dyn Transport>,
    addresses: Arc<AddressExtractor>,
    links: Arc<LinkExtractor>,
    url: Url,
) -> PageOutcome {
    match transport.fetch(&url).await {
        FetchOutcome::Success(page) => {
            let found = addresses.extract(&page.body);
            let parsed = links.parse(&page.body, &page.final_url);
            PageOutcome::Page {
                status: page.status,
                addresses: found,
                links: parsed.links,
                title: parsed.title,
            }
        }
        FetchOutcome::Transient(error) => PageOutcome::Transient(error),
        FetchOutcome::Permanent(error) => PageOutcome::Permanent(error),
    }
}

fn failure_result(
    record: &UrlRecord,
    error: &FetchError,
    retry_count: u32,
    started: Instant,
) -> VisitResult {
    VisitResult::failure(record, error.kind, error.status)
        .with_retry_count(retry_count)
        .with_elapsed_ms(elapsed_ms(started))
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
