//! Markdown summary generation
//!
//! This module writes the human-readable `summary.md` at the end of a run:
//! overall counts, failures by kind, the depth breakdown and the list of
//! addresses found.

use crate::output::traits::{CrawlSummary, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates a markdown summary from crawl statistics
///
/// # Arguments
///
/// * `summary` - The crawl summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# Onion-Sieve Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    if let Some(started) = &summary.started_at {
        md.push_str(&format!("- **Started**: {}\n", started.to_rfc3339()));
    }
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    if let Some(termination) = &summary.termination {
        md.push_str(&format!("- **Termination**: {}\n", termination));
    }
    md.push('\n');

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages Visited**: {}\n", summary.pages_visited));
    md.push_str(&format!("- **Successes**: {}\n", summary.successes));
    md.push_str(&format!("- **Failures**: {}\n", summary.total_failures));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n",
        summary.success_rate()
    ));
    md.push_str(&format!("- **Links Found**: {}\n", summary.total_links));
    md.push_str(&format!(
        "- **Unique Addresses**: {}\n",
        summary.unique_addresses()
    ));
    md.push_str(&format!(
        "- **Pages With Addresses**: {}\n\n",
        summary.pages_with_addresses
    ));

    // Failure breakdown
    if !summary.failures_by_kind.is_empty() {
        md.push_str("## Failures by Kind\n\n");
        md.push_str("| Kind | Count | Retried |\n");
        md.push_str("|------|-------|---------|\n");

        for (kind, count) in &summary.failures_by_kind {
            let retried = if kind.is_transient() { "yes" } else { "no" };
            md.push_str(&format!("| {} | {} | {} |\n", kind, count, retried));
        }
        md.push('\n');
    }

    // Depth breakdown
    if !summary.depth_breakdown.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");

        for (depth, count) in &summary.depth_breakdown {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    // Addresses
    if !summary.addresses.is_empty() {
        md.push_str(&format!(
            "## Addresses Found ({})\n\n",
            summary.unique_addresses()
        ));
        for address in &summary.addresses {
            md.push_str(&format!("- `{}`\n", address));
        }
        md.push('\n');
    }

    md
}
