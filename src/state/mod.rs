//! State module for tracking crawl progress
//!
//! This module defines the records that move through the crawl.
//!
//! # Components
//!
//! - `UrlRecord`: a URL in the frontier, with its depth and parent
//! - `VisitResult`: the terminal outcome of one URL, as written to the log
//! - `FailureKind`: the closed set of failure classifications

mod failure;
mod visit;

// Re-export main types
pub use failure::FailureKind;
pub use visit::{UrlRecord, VisitResult};
