//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of harvest runs,
//! including phase statistics, engagement figures and top authors/hashtags.

use crate::output::traits::{HarvestSummary, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary of a run to `output_path`
pub fn generate_markdown_summary(summary: &HarvestSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &HarvestSummary) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Hashtag Harvest: #{}\n\n", summary.hashtag));

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {:.1} seconds ({:.2} minutes)\n",
            duration,
            duration / 60.0
        ));
    }
    if !summary.config_hash.is_empty() {
        md.push_str(&format!("- **Config Hash**: {}\n", summary.config_hash));
    }
    md.push_str(&format!("- **Output**: {}\n\n", summary.output_path));

    // Listing phase
    md.push_str("## Listing Phase\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Snapshots | {} |\n", summary.snapshots));
    md.push_str(&format!("| Load-More cycles | {} |\n", summary.loads));
    md.push_str(&format!("| Pagination ended | {} |\n", summary.pagination_end));
    md.push_str(&format!("| Candidates | {} |\n", summary.candidates));
    md.push_str(&format!("| Extracted | {} |\n", summary.extracted));
    md.push_str(&format!(
        "| Duplicates rejected | {} ({:.1}%) |\n",
        summary.duplicates_rejected,
        summary.duplicate_rate()
    ));
    md.push_str(&format!("| Invalid dropped | {} |\n", summary.dropped_invalid));
    md.push_str(&format!("| Ads skipped | {} |\n", summary.ads_skipped));
    if summary.embedded_snapshots > 0 {
        md.push_str(&format!(
            "| Embedded-data snapshots | {} |\n",
            summary.embedded_snapshots
        ));
    }
    md.push('\n');

    // Enrichment phase
    if summary.enrichment_attempted > 0 {
        md.push_str("## Enrichment\n\n");
        md.push_str(&format!("- **Pending**: {}\n", summary.enrichment_attempted));
        md.push_str(&format!(
            "- **Enriched**: {} ({:.1}%)\n",
            summary.enrichment_succeeded,
            summary.enrichment_success_rate()
        ));
        md.push_str(&format!("- **Failed**: {}\n", summary.enrichment_failed));
        if summary.enrichment_skipped > 0 {
            md.push_str(&format!(
                "- **Skipped (time budget)**: {}\n",
                summary.enrichment_skipped
            ));
        }
        md.push('\n');
    }

    // Records
    md.push_str("## Records\n\n");
    md.push_str(&format!("- **Exported**: {}\n", summary.total_records));
    if summary.filtered_out > 0 {
        md.push_str(&format!(
            "- **Outside date range**: {}\n",
            summary.filtered_out
        ));
    }
    md.push_str(&format!(
        "- **Views**: avg {:.0}, max {}\n",
        summary.avg_views, summary.max_views
    ));
    md.push_str(&format!(
        "- **Likes**: avg {:.0}, max {}\n\n",
        summary.avg_likes, summary.max_likes
    ));

    if !summary.top_authors.is_empty() {
        md.push_str("## Top Authors\n\n");
        md.push_str("| Author | Videos |\n");
        md.push_str("|--------|--------|\n");
        for (author, count) in &summary.top_authors {
            md.push_str(&format!("| {} | {} |\n", author, count));
        }
        md.push('\n');
    }

    if !summary.top_hashtags.is_empty() {
        md.push_str("## Top Co-occurring Hashtags\n\n");
        md.push_str("| Hashtag | Videos |\n");
        md.push_str("|---------|--------|\n");
        for (tag, count) in &summary.top_hashtags {
            md.push_str(&format!("| #{} | {} |\n", tag, count));
        }
        md.push('\n');
    }

    md
}
