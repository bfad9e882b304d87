//! Shared crawl frontier
//!
//! Pending, in-flight and visited bookkeeping behind one mutex. Workers
//! touch it only through [`Frontier::claim`], [`Frontier::complete`] and
//! [`Frontier::abandon`]; the orchestrator seeds it and collects the queue
//! changes the savestate needs.
//!
//! A URL is in at most one of pending, in-flight or visited at any time, and
//! a visited URL is never queued again.

use crate::state::UrlRecord;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A pending URL together with the retries it has already used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub record: UrlRecord,
    pub retry_count: u32,
}

/// A URL handed to a worker
pub type ClaimedUrl = PendingEntry;

/// Result of [`Frontier::claim`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The oldest pending URL, now in flight
    Ready(ClaimedUrl),

    /// Nothing pending, but in-flight URLs may still add work
    Idle,

    /// Nothing pending and nothing in flight; no more work can appear
    Drained,
}

/// Result of [`Frontier::abandon`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abandon {
    /// Queued again at the back with the incremented retry count
    Requeued { retry_count: u32 },

    /// Out of retries; the URL is now visited
    Exhausted { retry_count: u32 },

    /// The URL was not in flight
    NotInFlight,
}

/// What happened to a batch of offered URLs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueReport {
    pub accepted: usize,
    /// Already pending, in flight or visited
    pub duplicates: usize,
    /// Deeper than the depth bound
    pub too_deep: usize,
    /// Refused because pending was at its cap
    pub over_capacity: usize,
    /// For `complete`: whether the URL was actually in flight
    pub was_in_flight: bool,
}

impl EnqueueReport {
    pub fn refused(&self) -> usize {
        self.duplicates + self.too_deep + self.over_capacity
    }
}

/// Point-in-time counts for progress logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierStats {
    pub pending: usize,
    pub in_flight: usize,
    pub visited: usize,
}

/// Frontier contents loaded from the savestate
///
/// `pending` includes URLs that were in flight when the previous run ended,
/// so an interrupted crawl fetches them again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontierSnapshot {
    pub pending: Vec<PendingEntry>,
    pub visited: Vec<String>,
}

#[derive(Debug, Default)]
struct FrontierState {
    pending: VecDeque<PendingEntry>,
    queued: HashSet<String>,
    in_flight: HashMap<String, PendingEntry>,
    visited: HashSet<String>,
    /// Entries queued or requeued since the last `take_enqueued`
    enqueued: Vec<PendingEntry>,
}

impl FrontierState {
    fn is_known(&self, url: &str) -> bool {
        self.queued.contains(url) || self.in_flight.contains_key(url) || self.visited.contains(url)
    }

    fn push_back(&mut self, entry: PendingEntry) {
        self.enqueued.push(entry.clone());
        self.push_restored(entry);
    }

    fn push_restored(&mut self, entry: PendingEntry) {
        self.queued.insert(entry.record.url.clone());
        self.pending.push_back(entry);
    }
}

/// Thread-safe crawl frontier
#[derive(Debug)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    max_depth: Option<u32>,
    max_pending: usize,
    max_retries: u32,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `max_depth` - Links deeper than this are refused (unbounded if None)
    /// * `max_pending` - Cap on pending URLs; further enqueues are refused
    /// * `max_retries` - Retries granted to a URL after its first attempt
    pub fn new(max_depth: Option<u32>, max_pending: usize, max_retries: u32) -> Self {
        Self {
            state: Mutex::new(FrontierState::default()),
            max_depth,
            max_pending,
            max_retries,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        // bookkeeping stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds initial URLs
    ///
    /// URLs already known to the frontier are counted as duplicates. The
    /// depth bound and the pending cap apply as for discovered links.
    pub fn seed<I>(&self, records: I) -> EnqueueReport
    where
        I: IntoIterator<Item = UrlRecord>,
    {
        let mut state = self.lock();
        let mut report = EnqueueReport::default();
        self.enqueue(&mut state, records, &mut report);
        report
    }

    /// Pops the oldest pending URL and marks it in flight
    pub fn claim(&self) -> Claim {
        let mut state = self.lock();

        match state.pending.pop_front() {
            Some(entry) => {
                state.queued.remove(&entry.record.url);
                state
                    .in_flight
                    .insert(entry.record.url.clone(), entry.clone());
                Claim::Ready(entry)
            }
            None if state.in_flight.is_empty() => Claim::Drained,
            None => Claim::Idle,
        }
    }

    /// Marks an in-flight URL visited and offers the links found on it
    ///
    /// Completing a URL that is not in flight changes nothing and reports
    /// `was_in_flight = false`.
    pub fn complete<I>(&self, url: &str, links: I) -> EnqueueReport
    where
        I: IntoIterator<Item = UrlRecord>,
    {
        let mut state = self.lock();
        let mut report = EnqueueReport::default();

        if state.in_flight.remove(url).is_none() {
            return report;
        }
        state.visited.insert(url.to_string());
        report.was_in_flight = true;

        self.enqueue(&mut state, links, &mut report);
        report
    }

    /// Returns an in-flight URL after a transient failure
    ///
    /// While retries remain the URL goes to the back of pending with its
    /// counter incremented. Requeueing ignores the pending cap. Once the
    /// retries are spent the URL is marked visited.
    pub fn abandon(&self, url: &str) -> Abandon {
        let mut state = self.lock();

        let Some(mut entry) = state.in_flight.remove(url) else {
            return Abandon::NotInFlight;
        };

        if entry.retry_count < self.max_retries {
            entry.retry_count += 1;
            let retry_count = entry.retry_count;
            state.push_back(entry);
            Abandon::Requeued { retry_count }
        } else {
            state.visited.insert(url.to_string());
            Abandon::Exhausted {
                retry_count: entry.retry_count,
            }
        }
    }

    pub fn stats(&self) -> FrontierStats {
        let state = self.lock();
        FrontierStats {
            pending: state.pending.len(),
            in_flight: state.in_flight.len(),
            visited: state.visited.len(),
        }
    }

    /// Hands over every entry queued or requeued since the previous call
    ///
    /// Requeued URLs appear again with their new retry count. The
    /// orchestrator persists these before recording the visit that produced
    /// them, so the savestate never loses a discovered link.
    pub fn take_enqueued(&self) -> Vec<PendingEntry> {
        std::mem::take(&mut self.lock().enqueued)
    }

    /// Loads a savestate snapshot into the frontier
    ///
    /// Visited URLs are applied first, then pending entries not already
    /// known are appended with their retry counts. Caps are not applied to
    /// restored entries. Returns the number of pending entries restored.
    pub fn restore(&self, snapshot: FrontierSnapshot) -> usize {
        let mut state = self.lock();

        for url in snapshot.visited {
            if state.queued.remove(&url) {
                state.pending.retain(|e| e.record.url != url);
            }
            state.visited.insert(url);
        }

        let mut restored = 0;
        for entry in snapshot.pending {
            if state.is_known(&entry.record.url) {
                continue;
            }
            state.push_restored(entry);
            restored += 1;
        }

        restored
    }

    fn enqueue<I>(&self, state: &mut FrontierState, records: I, report: &mut EnqueueReport)
    where
        I: IntoIterator<Item = UrlRecord>,
    {
        for record in records {
            if state.is_known(&record.url) {
                report.duplicates += 1;
            } else if self.max_depth.is_some_and(|max| record.depth > max) {
                report.too_deep += 1;
            } else if state.pending.len() >= self.max_pending {
                report.over_capacity += 1;
            } else {
                state.push_back(PendingEntry {
                    record,
                    retry_count: 0,
                });
                report.accepted += 1;
            }
        }
    }
}
