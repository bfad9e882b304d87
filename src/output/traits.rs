//! Output sink trait and summary types
//!
//! This module defines the interface the orchestrator writes visit results
//! through, and the summary produced at the end of a run.

use crate::state::{FailureKind, VisitResult};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TSV error: {0}")]
    Tsv(#[from] csv::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for visit results
///
/// Only the orchestrator writes to a sink. Every record must be durable
/// once `write` returns, so a crash loses at most the record being written.
pub trait OutputSink: Send {
    /// Appends one result
    fn write(&mut self, result: &VisitResult) -> OutputResult<()>;

    /// Flushes anything still buffered
    fn flush(&mut self) -> OutputResult<()>;

    /// File backing the sink, if any
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Summary statistics for a crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    // Run metadata
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<u64>,
    /// Why the run ended; None when summarizing a log after the fact
    pub termination: Option<String>,

    // Overall statistics
    pub pages_visited: u64,
    pub successes: u64,
    pub total_failures: u64,
    pub total_links: u64,
    pub pages_with_addresses: u64,

    /// Every distinct address seen
    pub addresses: BTreeSet<String>,

    // Failure kind -> count
    pub failures_by_kind: BTreeMap<FailureKind, u64>,

    // Depth -> pages with a terminal outcome at that depth
    pub depth_breakdown: BTreeMap<u32, u64>,
}

impl CrawlSummary {
    /// Creates a new empty crawl summary
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unique_addresses(&self) -> usize {
        self.addresses.len()
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.pages_visited == 0 {
            return 0.0;
        }
        (self.successes as f64 / self.pages_visited as f64) * 100.0
    }

    /// Returns the failure rate as a percentage
    pub fn failure_rate(&self) -> f64 {
        if self.pages_visited == 0 {
            return 0.0;
        }
        (self.total_failures as f64 / self.pages_visited as f64) * 100.0
    }

    /// Failures of transient kinds that ran out of retries
    pub fn exhausted_retries(&self) -> u64 {
        self.failures_by_kind
            .iter()
            .filter(|(kind, _)| kind.is_transient())
            .map(|(_, count)| count)
            .sum()
    }
}
