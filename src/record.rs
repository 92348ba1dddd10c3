//! Video records as extracted from listing snapshots and as exported

use crate::state::EnrichmentState;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

/// Where a record was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordSource {
    /// A listing item node
    Listing,
    /// Structured data embedded in a page script
    Embedded,
}

impl RecordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Embedded => "embedded",
        }
    }
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One video's metadata during a session
///
/// `id` and `url` are never empty: the extractor refuses to build a record
/// without them.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub url: String,
    pub author_name: String,
    pub author_url: String,
    pub raw_timestamp_text: String,
    pub estimated_timestamp: Option<DateTime<Utc>>,
    pub scrape_time: DateTime<Utc>,
    pub raw_views_text: String,
    pub raw_likes_text: String,
    pub raw_comments_text: String,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub description_text: String,
    pub hashtags: Vec<String>,
    pub truncated: bool,
    pub enrichment_state: EnrichmentState,
    pub query_hashtag: String,
    pub source: RecordSource,
}

impl Record {
    /// Creates a record with every optional field at its default
    pub fn new(id: impl Into<String>, url: impl Into<String>, scrape_time: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            author_name: String::new(),
            author_url: String::new(),
            raw_timestamp_text: String::new(),
            estimated_timestamp: None,
            scrape_time,
            raw_views_text: String::new(),
            raw_likes_text: String::new(),
            raw_comments_text: String::new(),
            views: 0,
            likes: 0,
            comments: 0,
            description_text: String::new(),
            hashtags: Vec::new(),
            truncated: false,
            enrichment_state: EnrichmentState::NotNeeded,
            query_hashtag: String::new(),
            source: RecordSource::Listing,
        }
    }

    /// Sets the description and derives truncation state from it
    ///
    /// A description ending in an ellipsis marks the record `Pending` and
    /// leaves hashtags empty until the full text is known.
    pub fn set_description(&mut self, text: &str) {
        self.description_text = text.trim().to_string();
        if is_truncated(&self.description_text) {
            self.truncated = true;
            self.enrichment_state = EnrichmentState::Pending;
            self.hashtags.clear();
        } else {
            self.truncated = false;
            self.enrichment_state = EnrichmentState::NotNeeded;
            self.hashtags = extract_hashtags(&self.description_text);
        }
    }

    /// Returns true if the record is waiting for a detail-page visit
    pub fn needs_enrichment(&self) -> bool {
        self.enrichment_state == EnrichmentState::Pending
    }

    /// Merges a full description fetched from the detail page
    ///
    /// Returns false, leaving the record untouched, if the record already
    /// reached a terminal enrichment state.
    pub fn complete_enrichment(&mut self, full_text: &str) -> bool {
        if !self.enrichment_state.can_transition_to(EnrichmentState::Done) {
            return false;
        }
        self.description_text = full_text.trim().to_string();
        self.hashtags = extract_hashtags(&self.description_text);
        self.enrichment_state = EnrichmentState::Done;
        true
    }

    /// Marks enrichment as failed; the listing description is kept
    pub fn fail_enrichment(&mut self) -> bool {
        if !self.enrichment_state.can_transition_to(EnrichmentState::Failed) {
            return false;
        }
        self.enrichment_state = EnrichmentState::Failed;
        true
    }
}

/// Exported projection of a [`Record`]
///
/// Identical to the session record minus the internal enrichment state.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoRecord {
    pub id: String,
    pub url: String,
    pub author_name: String,
    pub author_url: String,
    pub raw_timestamp_text: String,
    pub estimated_timestamp: Option<DateTime<Utc>>,
    pub scrape_time: DateTime<Utc>,
    pub raw_views_text: String,
    pub raw_likes_text: String,
    pub raw_comments_text: String,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub description_text: String,
    pub hashtags: Vec<String>,
    pub truncated: bool,
    pub query_hashtag: String,
    pub source: RecordSource,
}

impl From<Record> for VideoRecord {
    fn from(record: Record) -> Self {
        Self {
            id: record.id,
            url: record.url,
            author_name: record.author_name,
            author_url: record.author_url,
            raw_timestamp_text: record.raw_timestamp_text,
            estimated_timestamp: record.estimated_timestamp,
            scrape_time: record.scrape_time,
            raw_views_text: record.raw_views_text,
            raw_likes_text: record.raw_likes_text,
            raw_comments_text: record.raw_comments_text,
            views: record.views,
            likes: record.likes,
            comments: record.comments,
            description_text: record.description_text,
            hashtags: record.hashtags,
            truncated: record.truncated,
            query_hashtag: record.query_hashtag,
            source: record.source,
        }
    }
}

/// Returns true if a description was cut short on the listing page
pub fn is_truncated(text: &str) -> bool {
    let text = text.trim_end();
    text.ends_with("...") || text.ends_with('\u{2026}')
}

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\w+)").expect("valid regex"));

/// Extracts `#token` hashtags in order of first appearance, without duplicates
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    HASHTAG_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|tag| seen.insert(tag.to_lowercase()))
        .collect()
}
