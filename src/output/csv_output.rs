//! CSV export of harvested records
//!
//! Columns follow a fixed priority order; the internal enrichment state is
//! never part of the export.

use crate::output::traits::{OutputResult, RecordSink};
use crate::record::VideoRecord;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Column order of the exported table
pub const COLUMNS: [&str; 18] = [
    "url",
    "id",
    "scrape_time",
    "raw_timestamp",
    "estimated_timestamp",
    "raw_views",
    "raw_likes",
    "raw_comments",
    "views",
    "likes",
    "comments",
    "author",
    "author_url",
    "description",
    "hashtags",
    "truncated",
    "query_hashtag",
    "source",
];

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes records to a CSV file with a header row
pub struct CsvRecordSink {
    writer: csv::Writer<File>,
    path: PathBuf,
    written: usize,
}

impl CsvRecordSink {
    /// Creates the file (and missing parent directories) and writes the header
    pub fn create(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_writer(File::create(path)?);
        writer.write_record(COLUMNS)?;

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data rows written so far
    pub fn written(&self) -> usize {
        self.written
    }
}

impl RecordSink for CsvRecordSink {
    fn write_records(&mut self, records: &[VideoRecord]) -> OutputResult<usize> {
        for record in records {
            self.writer.write_record(record_row(record))?;
        }
        self.written += records.len();
        Ok(records.len())
    }

    fn finalize(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        tracing::info!("Wrote {} records to {}", self.written, self.path.display());
        Ok(())
    }
}

/// Writes `records` to a fresh CSV file at `path`
pub fn write_csv(path: &Path, records: &[VideoRecord]) -> OutputResult<usize> {
    let mut sink = CsvRecordSink::create(path)?;
    let written = sink.write_records(records)?;
    sink.finalize()?;
    Ok(written)
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Renders one record in [`COLUMNS`] order
fn record_row(record: &VideoRecord) -> [String; 18] {
    [
        record.url.clone(),
        record.id.clone(),
        format_time(&record.scrape_time),
        record.raw_timestamp_text.clone(),
        record
            .estimated_timestamp
            .as_ref()
            .map(format_time)
            .unwrap_or_default(),
        record.raw_views_text.clone(),
        record.raw_likes_text.clone(),
        record.raw_comments_text.clone(),
        record.views.to_string(),
        record.likes.to_string(),
        record.comments.to_string(),
        record.author_name.clone(),
        record.author_url.clone(),
        record.description_text.clone(),
        record.hashtags.join(","),
        record.truncated.to_string(),
        record.query_hashtag.clone(),
        record.source.to_string(),
    ]
}
