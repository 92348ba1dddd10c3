//! Video records from structured data embedded in page scripts
//!
//! Some page variants ship their listing as JSON instead of item markup.
//! Every JSON object found in the page's scripts is scored against a table
//! of field-name signatures; objects that look enough like a video become
//! records.

use crate::crawler::parsing::{parse_count, parse_relative_time};
use crate::record::{extract_hashtags, Record, RecordSource};
use crate::url::{extract_video_id, resolve_link};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use std::sync::LazyLock;
use url::Url;

/// Field-name sets that together identify a video object
const VIDEO_SIGNATURES: &[&[&str]] = &[
    &["id", "author", "desc", "video"],
    &["id", "author", "title", "cover"],
    &["video_id", "username", "caption", "thumbnail"],
    &["videoId", "authorName", "text", "cover"],
    &["id", "user", "caption", "url"],
    &["itemId", "author", "text", "video"],
    &["id", "creator", "text", "media"],
    &["video_url", "author_name", "description", "thumbnail_url"],
    &["play_url", "nickname", "desc", "cover_url"],
    &["id", "username", "caption", "thumbnail"],
];

/// Signature hits needed in a single set
const MIN_SIGNATURE_HITS: usize = 3;

const STAT_FIELDS: &[&str] = &["likes", "comments", "shares", "views", "plays", "diggs", "hearts"];

const TIME_FIELDS: &[&str] = &[
    "createTime",
    "create_time",
    "created_at",
    "timestamp",
    "published_at",
    "upload_time",
    "date",
];

const ID_ALIASES: &[&str] = &["id", "video_id", "videoId", "itemId", "aweme_id"];
const DESCRIPTION_ALIASES: &[&str] = &["desc", "description", "caption", "text", "title", "content"];
const URL_ALIASES: &[&str] = &[
    "url",
    "video_url",
    "play_url",
    "share_url",
    "webVideoUrl",
    "web_video_url",
    "link",
    "video_link",
];
const AUTHOR_ALIASES: &[&str] = &[
    "author_name",
    "author",
    "username",
    "nickname",
    "creator",
    "user_name",
    "userName",
    "authorName",
];
const AUTHOR_URL_ALIASES: &[&str] = &["author_url", "profile_url", "user_profile", "author_link"];
const TIMESTAMP_ALIASES: &[&str] = &[
    "createTime",
    "create_time",
    "created_at",
    "timestamp",
    "published_at",
    "upload_time",
    "date",
    "publish_time",
    "upload_date",
];
const VIEW_ALIASES: &[&str] = &["views", "play_count", "playCount", "view_count", "viewCount", "plays"];
const LIKE_ALIASES: &[&str] = &[
    "likes",
    "like_count",
    "likeCount",
    "digg_count",
    "diggCount",
    "hearts",
    "heart_count",
    "heartCount",
];
const COMMENT_ALIASES: &[&str] = &["comments", "comment_count", "commentCount", "comment_num"];

static WINDOW_ASSIGNMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*window\.[\w$]+\s*=\s*(\{.*\})\s*;?\s*$").expect("valid regex")
});

static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("valid selector"));

/// Returns the best signature score of an object
///
/// Keys are compared case-insensitively.
pub fn signature_score(object: &Map<String, Value>) -> usize {
    VIDEO_SIGNATURES
        .iter()
        .map(|signature| signature.iter().filter(|field| has_key(object, field)).count())
        .max()
        .unwrap_or(0)
}

/// Returns true if an object carries enough video-like fields
pub fn looks_like_video(object: &Map<String, Value>) -> bool {
    let has_stats = STAT_FIELDS.iter().any(|field| object.contains_key(*field));
    let has_time = TIME_FIELDS.iter().any(|field| object.contains_key(*field));
    signature_score(object) >= MIN_SIGNATURE_HITS && (has_stats || has_time)
}

/// Extracts records from every JSON payload in the page's scripts
pub fn extract_embedded(
    document: &Html,
    base_url: &Url,
    query_hashtag: &str,
    now: DateTime<Utc>,
) -> Vec<Record> {
    let mut records = Vec::new();
    for element in document.select(&SCRIPT_SELECTOR) {
        let content = element.text().collect::<String>();
        let Some(data) = parse_script_json(&content) else {
            continue;
        };

        let before = records.len();
        walk(&data, &mut |object| {
            if let Some(record) = object_to_record(object, base_url, query_hashtag, now) {
                records.push(record);
            }
        });

        if records.len() > before {
            tracing::debug!("Script payload yielded {} records", records.len() - before);
        }
    }

    records
}

/// Parses a script body as JSON, unwrapping `window.X = {...};` assignments
fn parse_script_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }

    let payload = WINDOW_ASSIGNMENT_RE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    serde_json::from_str(payload).ok()
}

/// Visits every video-like object, depth first, parents before children
fn walk(value: &Value, visit: &mut dyn FnMut(&Map<String, Value>)) {
    match value {
        Value::Object(object) => {
            if looks_like_video(object) {
                visit(object);
            }
            for child in object.values() {
                walk(child, visit);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, visit);
            }
        }
        _ => {}
    }
}

fn object_to_record(
    object: &Map<String, Value>,
    base_url: &Url,
    query_hashtag: &str,
    now: DateTime<Utc>,
) -> Option<Record> {
    let url = lookup_text(object, URL_ALIASES).and_then(|href| resolve_link(&href, base_url))?;

    let mut id = extract_video_id(&url);
    if id.is_empty() {
        id = lookup_text(object, ID_ALIASES).unwrap_or_default();
    }
    if id.is_empty() {
        tracing::debug!("Dropping embedded object without an id: {}", url);
        return None;
    }

    let mut record = Record::new(id, url, now);
    record.source = RecordSource::Embedded;
    record.query_hashtag = query_hashtag.to_string();

    // Embedded text is the full description
    if let Some(description) = lookup_text(object, DESCRIPTION_ALIASES) {
        record.hashtags = extract_hashtags(&description);
        record.description_text = description;
    }

    if let Some(author) = lookup(object, AUTHOR_ALIASES) {
        record.author_name = match author {
            Value::Object(inner) => {
                lookup_text(inner, &["nickname", "uniqueId", "name", "username"]).unwrap_or_default()
            }
            other => value_text(other).unwrap_or_default(),
        };
    }
    if let Some(author_url) = lookup_text(object, AUTHOR_URL_ALIASES) {
        record.author_url = resolve_link(&author_url, base_url).unwrap_or_default();
    }

    if let Some(raw) = lookup(object, TIMESTAMP_ALIASES) {
        record.raw_timestamp_text = value_text(raw).unwrap_or_default();
        record.estimated_timestamp = parse_timestamp(raw, now);
    }

    if let Some(views) = lookup(object, VIEW_ALIASES) {
        record.raw_views_text = value_text(views).unwrap_or_default();
        record.views = count_value(views);
    }
    if let Some(likes) = lookup(object, LIKE_ALIASES) {
        record.raw_likes_text = value_text(likes).unwrap_or_default();
        record.likes = count_value(likes);
    }
    if let Some(comments) = lookup(object, COMMENT_ALIASES) {
        record.raw_comments_text = value_text(comments).unwrap_or_default();
        record.comments = count_value(comments);
    }

    Some(record)
}

fn has_key(object: &Map<String, Value>, field: &str) -> bool {
    object.keys().any(|key| key.eq_ignore_ascii_case(field))
}

/// First non-empty value under any alias, in alias order
fn lookup<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(alias))
            .map(|(_, value)| value)
            .filter(|value| !is_empty_value(value))
    })
}

fn lookup_text(object: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    lookup(object, aliases).and_then(value_text)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn count_value(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .unwrap_or(0),
        Value::String(s) => parse_count(s),
        _ => 0,
    }
}

/// Epoch seconds or milliseconds, RFC 3339, plain dates, or relative text
fn parse_timestamp(value: &Value, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(from_epoch),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                return s.parse().ok().and_then(from_epoch);
            }
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                        .ok()
                        .map(|naive| Utc.from_utc_datetime(&naive))
                })
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                        .map(|naive| Utc.from_utc_datetime(&naive))
                })
                .or_else(|| parse_relative_time(s, now))
        }
        _ => None,
    }
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    // Millisecond epochs are at least 13 digits for any date after 2001
    if value >= 1_000_000_000_000 {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}
