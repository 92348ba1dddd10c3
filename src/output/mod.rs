//! Output module for exporting records and run summaries
//!
//! This module handles:
//! - Writing exported records as CSV with a fixed column order
//! - Reading exported CSV files back for a standalone enrichment pass
//! - Computing record statistics
//! - Generating markdown summaries of a run

mod csv_input;
mod csv_output;
mod markdown;
pub mod stats;
mod traits;

pub use csv_input::read_csv;
pub use csv_output::{write_csv, CsvRecordSink, COLUMNS};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_statistics, HarvestStatistics};
pub use traits::{HarvestSummary, OutputError, OutputResult, RecordSink};

use crate::crawler::SessionOutcome;
use chrono::{DateTime, Utc};

/// Builds a run summary from a finished session
///
/// # Arguments
///
/// * `outcome` - The session's records and counters
/// * `started_at` - When the run started
/// * `config_hash` - Hash of the configuration file, empty when defaults were used
/// * `output_path` - Where the records were written
pub fn generate_summary(
    outcome: &SessionOutcome,
    started_at: DateTime<Utc>,
    config_hash: &str,
    output_path: &str,
) -> HarvestSummary {
    let finished_at = Utc::now();
    let stats = &outcome.stats;

    let mut summary = HarvestSummary {
        hashtag: outcome.hashtag.clone(),
        started_at: started_at.to_rfc3339(),
        finished_at: Some(finished_at.to_rfc3339()),
        duration_seconds: Some(stats.elapsed.as_secs_f64()),
        config_hash: config_hash.to_string(),
        output_path: output_path.to_string(),
        snapshots: stats.snapshots,
        embedded_snapshots: stats.embedded_snapshots,
        loads: stats.loads,
        pagination_end: stats.pagination_end.clone(),
        candidates: stats.candidates,
        extracted: stats.extracted,
        duplicates_rejected: stats.duplicates_rejected,
        dropped_invalid: stats.dropped_invalid,
        ads_skipped: stats.ads_skipped,
        enrichment_attempted: stats.enrichment.attempted,
        enrichment_succeeded: stats.enrichment.succeeded,
        enrichment_failed: stats.enrichment.failed,
        enrichment_skipped: stats.enrichment.skipped,
        filtered_out: stats.filtered_out,
        ..Default::default()
    };

    HarvestStatistics::from_records(&outcome.records, &outcome.hashtag).fill(&mut summary);
    summary
}
