//! Listing snapshot extraction
//!
//! Turns one serialized listing page into candidate [`Record`]s:
//! - Advertisement cards are skipped
//! - The record URL comes from an ordered list of link strategies
//! - Stats are located by their icon markers, never by position
//! - Truncated descriptions are flagged for enrichment
//!
//! When a snapshot has no item nodes at all, JSON embedded in the page's
//! scripts is searched instead (see [`crate::crawler::embedded`]).

use crate::config::SiteConfig;
use crate::crawler::embedded::extract_embedded;
use crate::crawler::parsing::{parse_count, parse_relative_time};
use crate::record::Record;
use crate::url::{extract_video_id, resolve_link};
use crate::ConfigError;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Outcome of extracting one snapshot
#[derive(Debug, Default)]
pub struct Extraction {
    /// Valid records in document order
    pub records: Vec<Record>,

    /// Item nodes seen, advertisements included
    pub candidates: usize,

    /// Candidates without a usable URL or id
    pub dropped_invalid: usize,

    /// Advertisement cards skipped
    pub ads_skipped: usize,

    /// Whether the listing container was present
    pub container_found: bool,

    /// Whether the records came from embedded script data
    pub from_embedded: bool,
}

/// Pre-parsed selectors for the parts of a listing item
struct ItemSelectors {
    container: Selector,
    item: Selector,
    link: Selector,
    overlay: Selector,
    description_block: Selector,
    span: Selector,
    author_link: Selector,
    heading: Selector,
    stats: Selector,
    clock: Selector,
    play: Selector,
    heart: Selector,
    comment: Selector,
}

impl ItemSelectors {
    fn new(site: &SiteConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            container: compile(&site.container_selector)?,
            item: compile(&site.item_selector)?,
            link: compile("a[href]")?,
            overlay: compile(".overlay-s")?,
            description_block: compile(".info3")?,
            span: compile("span")?,
            author_link: compile(".author-name a")?,
            heading: compile(".info2 h1")?,
            stats: compile(".stats")?,
            clock: compile(".fa-clock")?,
            play: compile(".fa-play")?,
            heart: compile(".fa-heart")?,
            comment: compile(".fa-comment")?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::Validation(format!("Invalid selector '{}': {:?}", selector, e)))
}

/// A way of finding the record URL inside an item, tried in order
type UrlStrategy = fn(&ItemSelectors, ElementRef<'_>) -> Option<String>;

const URL_STRATEGIES: &[(&str, UrlStrategy)] = &[
    ("overlay link", overlay_link),
    ("description link", description_link),
];

/// Link to a video page marked as the card overlay
fn overlay_link(selectors: &ItemSelectors, item: ElementRef<'_>) -> Option<String> {
    item.select(&selectors.link)
        .filter(|a| a.value().attr("href").is_some_and(is_video_href))
        .find(|a| {
            a.value().classes().any(|c| c == "overlay-s")
                || a.select(&selectors.overlay).next().is_some()
        })
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

/// First non-author link to a video page inside the description block
fn description_link(selectors: &ItemSelectors, item: ElementRef<'_>) -> Option<String> {
    let block = item.select(&selectors.description_block).next()?;
    block
        .select(&selectors.link)
        .filter(|a| !is_author_link(*a))
        .filter_map(|a| a.value().attr("href"))
        .find(|href| is_video_href(href))
        .map(str::to_string)
}

fn is_video_href(href: &str) -> bool {
    href.contains("/video/")
}

fn is_author_link(link: ElementRef<'_>) -> bool {
    link.parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|parent| parent.value().classes().any(|c| c == "author-name"))
}

/// Extracts records from listing snapshots
pub struct RecordExtractor {
    selectors: ItemSelectors,
    ad_marker_class: String,
    base_url: Url,
    query_hashtag: String,
}

impl RecordExtractor {
    /// Creates an extractor for the given site layout and query
    pub fn new(site: &SiteConfig, query_hashtag: &str) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&site.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

        Ok(Self {
            selectors: ItemSelectors::new(site)?,
            ad_marker_class: site.ad_marker_class.clone(),
            base_url,
            query_hashtag: query_hashtag.to_string(),
        })
    }

    /// Extracts records using the current time for relative timestamps
    pub fn extract(&self, html: &str) -> Extraction {
        self.extract_at(html, Utc::now())
    }

    /// Extracts records, resolving relative timestamps against `now`
    pub fn extract_at(&self, html: &str, now: DateTime<Utc>) -> Extraction {
        let document = Html::parse_document(html);
        let mut extraction = Extraction::default();

        let container = document.select(&self.selectors.container).next();
        extraction.container_found = container.is_some();

        if let Some(container) = container {
            for item in container.select(&self.selectors.item) {
                extraction.candidates += 1;

                if self.is_ad(item) {
                    tracing::debug!("Skipping advertisement card");
                    extraction.ads_skipped += 1;
                    continue;
                }

                match self.extract_item(item, now) {
                    Some(record) => extraction.records.push(record),
                    None => extraction.dropped_invalid += 1,
                }
            }
        }

        if extraction.candidates == 0 {
            let records = extract_embedded(&document, &self.base_url, &self.query_hashtag, now);
            if !records.is_empty() {
                tracing::info!("Found {} records in embedded page data", records.len());
                extraction.from_embedded = true;
                extraction.records = records;
            }
        }

        extraction
    }

    fn is_ad(&self, item: ElementRef<'_>) -> bool {
        item.value().classes().any(|c| c == self.ad_marker_class)
    }

    /// Builds one record from an item node; None if URL or id is missing
    fn extract_item(&self, item: ElementRef<'_>, now: DateTime<Utc>) -> Option<Record> {
        let href = URL_STRATEGIES.iter().find_map(|(name, strategy)| {
            let found = strategy(&self.selectors, item);
            if found.is_some() {
                tracing::trace!("Record URL found via {}", name);
            }
            found
        });

        let Some(url) = href.and_then(|href| resolve_link(&href, &self.base_url)) else {
            tracing::debug!("Dropping item without a video link");
            return None;
        };

        let id = extract_video_id(&url);
        if id.is_empty() {
            tracing::debug!("Dropping item without a video id: {}", url);
            return None;
        }

        let mut record = Record::new(id, url, now);
        record.query_hashtag = self.query_hashtag.clone();

        if let Some(description) = self.description(item) {
            record.set_description(&description);
            if record.truncated {
                tracing::debug!("Record {} has a truncated description", record.id);
            }
        }

        if let Some(author) = item.select(&self.selectors.author_link).next() {
            record.author_name = text_of(author);
            record.author_url = author
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, &self.base_url))
                .unwrap_or_default();
        }

        self.read_stats(item, &mut record, now);

        Some(record)
    }

    /// Description text from the block's first non-author link, else the heading
    fn description(&self, item: ElementRef<'_>) -> Option<String> {
        let from_block = item
            .select(&self.selectors.description_block)
            .next()
            .and_then(|block| {
                block
                    .select(&self.selectors.link)
                    .filter(|a| !is_author_link(*a))
                    .find_map(|a| a.select(&self.selectors.span).next())
                    .map(text_of)
            })
            .filter(|text| !text.is_empty());

        from_block.or_else(|| {
            item.select(&self.selectors.heading)
                .next()
                .map(text_of)
                .filter(|text| !text.is_empty())
        })
    }

    fn read_stats(&self, item: ElementRef<'_>, record: &mut Record, now: DateTime<Utc>) {
        let Some(stats) = item.select(&self.selectors.stats).next() else {
            return;
        };

        if let Some(text) = icon_text(stats, &self.selectors.clock, "fa-clock") {
            record.estimated_timestamp = parse_relative_time(&text, now);
            if record.estimated_timestamp.is_none() {
                tracing::warn!("Could not parse relative time '{}' for {}", text, record.id);
            }
            record.raw_timestamp_text = text;
        }

        if let Some(text) = icon_text(stats, &self.selectors.play, "fa-play") {
            record.views = parse_count(&text);
            record.raw_views_text = text;
        }

        if let Some(text) = icon_text(stats, &self.selectors.heart, "fa-heart") {
            record.likes = parse_count(&text);
            record.raw_likes_text = text;
        }

        if let Some(text) = icon_text(stats, &self.selectors.comment, "fa-comment") {
            record.comments = parse_count(&text);
            record.raw_comments_text = text;
        }
    }
}

/// Text of the element wrapping an icon, with the icon label removed
fn icon_text(stats: ElementRef<'_>, icon: &Selector, label: &str) -> Option<String> {
    let marker = stats.select(icon).next()?;
    let holder = marker.parent().and_then(ElementRef::wrap)?;
    Some(text_of(holder).replace(label, "").trim().to_string())
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::EnrichmentState;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn extractor() -> RecordExtractor {
        RecordExtractor::new(&SiteConfig::default(), "cats").unwrap()
    }

    fn card(id: &str, description: &str) -> String {
        format!(
            r#"<div class="thumb">
                <a class="overlay-s" href="/video/clip-{id}/"></a>
                <div class="info3">
                    <div class="author-name"><a href="/user/author{id}/">author{id}</a></div>
                    <a href="/video/clip-{id}/"><span>{description}</span></a>
                </div>
                <div class="stats">
                    <div><i class="fa fa-clock"></i> 3 days ago</div>
                    <div><i class="fa fa-play"></i> 1.5K</div>
                    <div><i class="fa fa-heart"></i> 1,200</div>
                    <div><i class="fa fa-comment"></i> 12</div>
                </div>
            </div>"#
        )
    }

    fn page(cards: &[String]) -> String {
        format!(
            r#"<html><body><div id="thumbs">{}</div></body></html>"#,
            cards.join("\n")
        )
    }

    #[test]
    fn test_extract_full_card() {
        let html = page(&[card("7301", "Sunny day #cats #summer")]);
        let extraction = extractor().extract_at(&html, now());

        assert_eq!(extraction.records.len(), 1);
        let record = &extraction.records[0];
        assert_eq!(record.id, "7301");
        assert_eq!(record.url, "https://urlebird.com/video/clip-7301/");
        assert_eq!(record.author_name, "author7301");
        assert_eq!(record.author_url, "https://urlebird.com/user/author7301/");
        assert_eq!(record.description_text, "Sunny day #cats #summer");
        assert_eq!(record.hashtags, vec!["cats", "summer"]);
        assert_eq!(record.raw_timestamp_text, "3 days ago");
        assert_eq!(record.estimated_timestamp, Some(now() - Duration::days(3)));
        assert_eq!(record.views, 1_500);
        assert_eq!(record.raw_views_text, "1.5K");
        assert_eq!(record.likes, 1_200);
        assert_eq!(record.comments, 12);
        assert_eq!(record.query_hashtag, "cats");
        assert_eq!(record.scrape_time, now());
        assert_eq!(record.enrichment_state, EnrichmentState::NotNeeded);
    }

    #[test]
    fn test_ads_never_extracted() {
        let ad = r#"<div class="thumb display-flex-semi">
            <a class="overlay-s" href="/video/sponsored-999/"></a></div>"#
            .to_string();
        let html = page(&[card("1", "one"), ad, card("2", "two")]);
        let extraction = extractor().extract_at(&html, now());

        let ids: Vec<_> = extraction.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(extraction.ads_skipped, 1);
        assert_eq!(extraction.candidates, 3);
    }

    #[test]
    fn test_truncated_description_pending() {
        let html = page(&[card("5", "Long story about #cats and...")]);
        let record = &extractor().extract_at(&html, now()).records[0];

        assert!(record.truncated);
        assert_eq!(record.enrichment_state, EnrichmentState::Pending);
        assert!(record.hashtags.is_empty());
    }

    #[test]
    fn test_description_link_fallback() {
        let html = page(&[r#"<div class="thumb">
            <div class="info3">
                <div class="author-name"><a href="/video/not-this-1/">someone</a></div>
                <a href="/video/the-real-one-42/"><span>text</span></a>
            </div>
        </div>"#
            .to_string()]);
        let extraction = extractor().extract_at(&html, now());

        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].id, "42");
        assert_eq!(extraction.records[0].description_text, "text");
    }

    #[test]
    fn test_overlay_marker_inside_link() {
        let html = page(&[r#"<div class="thumb">
            <a href="/video/nested-77/"><div class="overlay-s"></div></a>
        </div>"#
            .to_string()]);
        let extraction = extractor().extract_at(&html, now());

        assert_eq!(extraction.records[0].id, "77");
        assert_eq!(extraction.records[0].description_text, "");
    }

    #[test]
    fn test_heading_description_fallback() {
        let html = page(&[r#"<div class="thumb">
            <a class="overlay-s" href="/video/h-8/"></a>
            <div class="info2"><h1>Heading text #pets</h1></div>
        </div>"#
            .to_string()]);
        let record = &extractor().extract_at(&html, now()).records[0];

        assert_eq!(record.description_text, "Heading text #pets");
        assert_eq!(record.hashtags, vec!["pets"]);
    }

    #[test]
    fn test_missing_url_or_id_dropped() {
        let no_link = r#"<div class="thumb"><p>nothing</p></div>"#.to_string();
        let no_id = r#"<div class="thumb"><a class="overlay-s" href="/video/no-digits/"></a></div>"#
            .to_string();
        let html = page(&[no_link, card("3", "ok"), no_id]);
        let extraction = extractor().extract_at(&html, now());

        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.dropped_invalid, 2);
    }

    #[test]
    fn test_stats_found_by_icon_not_position() {
        let html = page(&[r#"<div class="thumb">
            <a class="overlay-s" href="/video/s-9/"></a>
            <div class="stats">
                <span><i class="fa fa-comment"></i> 4</span>
                <span><i class="fa fa-heart"></i> 2M</span>
                <span><i class="fa fa-play"></i> 10</span>
            </div>
        </div>"#
            .to_string()]);
        let record = &extractor().extract_at(&html, now()).records[0];

        assert_eq!(record.comments, 4);
        assert_eq!(record.likes, 2_000_000);
        assert_eq!(record.views, 10);
        assert_eq!(record.raw_timestamp_text, "");
        assert!(record.estimated_timestamp.is_none());
    }

    #[test]
    fn test_unparsable_stats_default() {
        let html = page(&[r#"<div class="thumb">
            <a class="overlay-s" href="/video/u-10/"></a>
            <div class="stats">
                <span><i class="fa fa-clock"></i> just now</span>
                <span><i class="fa fa-play"></i> --</span>
            </div>
        </div>"#
            .to_string()]);
        let record = &extractor().extract_at(&html, now()).records[0];

        assert_eq!(record.raw_timestamp_text, "just now");
        assert!(record.estimated_timestamp.is_none());
        assert_eq!(record.views, 0);
        assert_eq!(record.raw_views_text, "--");
    }

    #[test]
    fn test_missing_container() {
        let extraction = extractor().extract_at("<html><body><p>gone</p></body></html>", now());
        assert!(!extraction.container_found);
        assert!(extraction.records.is_empty());
        assert!(!extraction.from_embedded);
    }

    #[test]
    fn test_document_order_preserved() {
        let cards: Vec<_> = (1..=5).map(|i| card(&i.to_string(), "x")).collect();
        let extraction = extractor().extract_at(&page(&cards), now());
        let ids: Vec<_> = extraction.records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    }
}
