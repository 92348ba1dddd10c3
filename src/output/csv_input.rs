//! Reading previously exported records back for a standalone enrichment pass

use crate::output::csv_output::TIMESTAMP_FORMAT;
use crate::output::traits::OutputResult;
use crate::record::{Record, RecordSource};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::Path;

/// One row of an exported CSV, keyed by column name
///
/// Missing columns read as empty so that files from older exports still load.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CsvRow {
    url: String,
    id: String,
    scrape_time: String,
    raw_timestamp: String,
    estimated_timestamp: String,
    raw_views: String,
    raw_likes: String,
    raw_comments: String,
    views: Option<u64>,
    likes: Option<u64>,
    comments: Option<u64>,
    author: String,
    author_url: String,
    description: String,
    truncated: String,
    query_hashtag: String,
    source: String,
}

/// Reads the records of an exported CSV file
///
/// Descriptions still ending in an ellipsis come back `Pending`, so they are
/// picked up by the next enrichment pass. Rows without an id or URL are
/// skipped.
pub fn read_csv(path: &Path) -> OutputResult<Vec<Record>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();

    for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row?;
        if row.id.trim().is_empty() || row.url.trim().is_empty() {
            tracing::warn!("Skipping row {} of {}: missing id or url", line + 1, path.display());
            continue;
        }
        records.push(row.into_record());
    }

    tracing::info!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

impl CsvRow {
    fn into_record(self) -> Record {
        let scrape_time = parse_time(&self.scrape_time).unwrap_or_else(Utc::now);
        let mut record = Record::new(self.id.trim(), self.url.trim(), scrape_time);

        record.raw_timestamp_text = self.raw_timestamp;
        record.estimated_timestamp = parse_time(&self.estimated_timestamp);
        record.raw_views_text = self.raw_views;
        record.raw_likes_text = self.raw_likes;
        record.raw_comments_text = self.raw_comments;
        record.views = self.views.unwrap_or(0);
        record.likes = self.likes.unwrap_or(0);
        record.comments = self.comments.unwrap_or(0);
        record.author_name = self.author;
        record.author_url = self.author_url;
        record.query_hashtag = self.query_hashtag;
        record.source = match self.source.as_str() {
            "embedded" => RecordSource::Embedded,
            _ => RecordSource::Listing,
        };

        record.set_description(&self.description);
        // An earlier pass may already have replaced a truncated description
        if self.truncated.eq_ignore_ascii_case("true") {
            record.truncated = true;
        }

        record
    }
}

fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
