//! Output sink traits and types
//!
//! This module defines the trait interface for record sinks and the
//! summary data structure describing one harvest run.

use crate::record::VideoRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Summary statistics for one harvest run
#[derive(Debug, Clone, Default)]
pub struct HarvestSummary {
    // Run metadata
    pub hashtag: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<f64>,
    pub config_hash: String,
    pub output_path: String,

    // Listing phase
    pub snapshots: usize,
    pub embedded_snapshots: usize,
    pub loads: u32,
    pub pagination_end: String,
    pub candidates: usize,
    pub extracted: usize,
    pub duplicates_rejected: usize,
    pub dropped_invalid: usize,
    pub ads_skipped: usize,

    // Enrichment phase
    pub enrichment_attempted: usize,
    pub enrichment_succeeded: usize,
    pub enrichment_failed: usize,
    pub enrichment_skipped: usize,

    // Exported records
    pub filtered_out: usize,
    pub total_records: usize,
    pub avg_views: f64,
    pub max_views: u64,
    pub avg_likes: f64,
    pub max_likes: u64,

    // Top authors with record counts
    pub top_authors: Vec<(String, usize)>,

    // Top co-occurring hashtags with record counts
    pub top_hashtags: Vec<(String, usize)>,
}

impl HarvestSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the enrichment success rate as a percentage
    pub fn enrichment_success_rate(&self) -> f64 {
        let finished = self.enrichment_succeeded + self.enrichment_failed;
        if finished == 0 {
            return 0.0;
        }
        (self.enrichment_succeeded as f64 / finished as f64) * 100.0
    }

    /// Returns the share of extracted records rejected as duplicates
    pub fn duplicate_rate(&self) -> f64 {
        if self.extracted == 0 {
            return 0.0;
        }
        (self.duplicates_rejected as f64 / self.extracted as f64) * 100.0
    }
}

/// Trait for record sinks
///
/// A sink receives the exported records of a session and persists them in
/// its own format.
pub trait RecordSink {
    /// Writes records in order, returning how many were written
    fn write_records(&mut self, records: &[VideoRecord]) -> OutputResult<usize>;

    /// Flushes any buffered output
    fn finalize(&mut self) -> OutputResult<()>;
}
