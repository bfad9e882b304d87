//! Crawler module for onion page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Fetching through the forward proxy with failure classification
//! - HTML parsing and link extraction
//! - The shared frontier with dedupe, depth and retry bookkeeping
//! - The worker pool and the overall crawl coordination

mod coordinator;
mod frontier;
mod parser;
mod transport;
mod worker;

pub use coordinator::{CrawlReport, Crawler, StopHandle, Termination};
pub use frontier::{
    Abandon, Claim, ClaimedUrl, EnqueueReport, Frontier, FrontierSnapshot, FrontierStats,
    PendingEntry,
};
pub use parser::{LinkExtractor, ParsedPage};
pub use transport::{
    classify_status, FetchError, FetchOutcome, FetchedPage, ProxyTransport, Transport,
};
pub use worker::{Worker, WorkerContext, WorkerStats};
