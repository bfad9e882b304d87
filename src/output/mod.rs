//! Output module for visit logs and crawl summaries
//!
//! This module handles:
//! - Appending visit results to the JSON Lines or TSV log
//! - Reading a visit log back for `--stats`
//! - Recording run statistics and writing the markdown summary

mod log;
mod markdown;
pub mod stats;
mod traits;

pub use log::{open_sink, read_visit_log, JsonlSink, MemorySink, TsvSink};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_summary, summarize, SummaryRecorder};
pub use traits::{CrawlSummary, OutputError, OutputResult, OutputSink};
