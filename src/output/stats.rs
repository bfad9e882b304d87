//! Run statistics
//!
//! The orchestrator feeds every result into a [`SummaryRecorder`]; the
//! `--stats` command builds the same summary from a visit log.

use crate::output::traits::CrawlSummary;
use crate::state::VisitResult;
use chrono::{DateTime, Utc};
use std::time::Instant;

/// Accumulates a [`CrawlSummary`] one result at a time
#[derive(Debug, Clone)]
pub struct SummaryRecorder {
    summary: CrawlSummary,
    started: Instant,
}

impl SummaryRecorder {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(started_at: DateTime<Utc>) -> Self {
        Self {
            summary: CrawlSummary {
                started_at: Some(started_at),
                ..CrawlSummary::new()
            },
            started: Instant::now(),
        }
    }

    pub fn record(&mut self, result: &VisitResult) {
        let summary = &mut self.summary;
        summary.pages_visited += 1;
        *summary.depth_breakdown.entry(result.depth).or_insert(0) += 1;

        match result.failure {
            None => {
                summary.successes += 1;
                summary.total_links += result.links_found as u64;
            }
            Some(kind) => {
                summary.total_failures += 1;
                *summary.failures_by_kind.entry(kind).or_insert(0) += 1;
            }
        }

        if !result.addresses.is_empty() {
            summary.pages_with_addresses += 1;
            summary.addresses.extend(result.addresses.iter().cloned());
        }
    }

    /// Results recorded so far
    pub fn pages_visited(&self) -> u64 {
        self.summary.pages_visited
    }

    pub fn unique_addresses(&self) -> usize {
        self.summary.addresses.len()
    }

    /// Closes the summary with the end time and termination cause
    pub fn finish(mut self, termination: impl Into<String>) -> CrawlSummary {
        self.summary.finished_at = Some(Utc::now());
        self.summary.duration_seconds = Some(self.started.elapsed().as_secs());
        self.summary.termination = Some(termination.into());
        self.summary
    }
}

impl Default for SummaryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a summary from results read back from a visit log
///
/// Start and end times are taken from the first and last timestamps.
pub fn summarize(results: &[VisitResult]) -> CrawlSummary {
    let mut recorder = SummaryRecorder::new();
    for result in results {
        recorder.record(result);
    }

    let mut summary = recorder.summary;
    summary.started_at = results.iter().map(|r| r.timestamp).min();
    summary.finished_at = results.iter().map(|r| r.timestamp).max();
    summary.duration_seconds = match (summary.started_at, summary.finished_at) {
        (Some(start), Some(end)) => Some((end - start).num_seconds().max(0) as u64),
        _ => None,
    };
    summary
}

/// Prints a summary to stdout in a formatted manner
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Overview:");
    if let Some(termination) = &summary.termination {
        println!("  Termination: {}", termination);
    }
    if let Some(duration) = summary.duration_seconds {
        println!("  Duration: {}s", duration);
    }
    println!("  Pages visited: {}", summary.pages_visited);
    println!(
        "  Successes: {} ({:.1}%)",
        summary.successes,
        summary.success_rate()
    );
    println!("  Failures: {}", summary.total_failures);
    println!("  Unique addresses: {}", summary.unique_addresses());
    println!("  Pages with addresses: {}", summary.pages_with_addresses);
    println!();

    if !summary.failures_by_kind.is_empty() {
        println!("Failures by Kind:");
        let mut counts: Vec<_> = summary.failures_by_kind.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (kind, count) in counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    if !summary.depth_breakdown.is_empty() {
        println!("Pages by Depth:");
        for (depth, count) in &summary.depth_breakdown {
            println!("  {}: {}", depth, count);
        }
        println!();
    }
}
