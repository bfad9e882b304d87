use crate::state::FailureKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A URL waiting in, or claimed from, the frontier
///
/// Created when a link is extracted (or a seed is accepted) and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Normalized absolute URL, the frontier identity
    pub url: String,

    /// Hops from the nearest seed (seeds are depth 0)
    pub depth: u32,

    /// Page the link was found on, None for seeds
    pub discovered_from: Option<String>,
}

impl UrlRecord {
    /// Creates a depth-0 seed record
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
            discovered_from: None,
        }
    }

    /// Creates a record for a link found on `parent`, one level deeper
    pub fn child_of(parent: &UrlRecord, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: parent.depth + 1,
            discovered_from: Some(parent.url.clone()),
        }
    }
}

/// Terminal outcome of one URL
///
/// Exactly one is produced per URL that reaches a terminal state. Retried
/// attempts produce nothing until the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitResult {
    pub url: String,
    pub depth: u32,
    #[serde(default)]
    pub discovered_from: Option<String>,

    /// Final HTTP status, if a response was received
    #[serde(default)]
    pub http_status: Option<u16>,

    /// Failure classification, None on success
    #[serde(default)]
    pub failure: Option<FailureKind>,

    /// Valid addresses found in the page body
    #[serde(default)]
    pub addresses: BTreeSet<String>,

    /// Distinct in-scope links on the page
    #[serde(default)]
    pub links_found: usize,

    #[serde(default)]
    pub title: Option<String>,

    pub timestamp: DateTime<Utc>,

    /// Retries spent before this outcome
    #[serde(default)]
    pub retry_count: u32,

    /// Duration of the final attempt
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl VisitResult {
    /// Builds a successful result
    pub fn success(
        record: &UrlRecord,
        http_status: u16,
        addresses: BTreeSet<String>,
        links_found: usize,
        title: Option<String>,
    ) -> Self {
        Self {
            url: record.url.clone(),
            depth: record.depth,
            discovered_from: record.discovered_from.clone(),
            http_status: Some(http_status),
            failure: None,
            addresses,
            links_found,
            title,
            timestamp: Utc::now(),
            retry_count: 0,
            elapsed_ms: 0,
        }
    }

    /// Builds a failure result
    pub fn failure(record: &UrlRecord, kind: FailureKind, http_status: Option<u16>) -> Self {
        Self {
            url: record.url.clone(),
            depth: record.depth,
            discovered_from: record.discovered_from.clone(),
            http_status,
            failure: Some(kind),
            addresses: BTreeSet::new(),
            links_found: 0,
            title: None,
            timestamp: Utc::now(),
            retry_count: 0,
            elapsed_ms: 0,
        }
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Short outcome label: the status code on success, else the failure kind
    pub fn outcome_label(&self) -> String {
        match (self.failure, self.http_status) {
            (Some(kind), _) => kind.to_string(),
            (None, Some(status)) => status.to_string(),
            (None, None) => "ok".to_string(),
        }
    }
}
