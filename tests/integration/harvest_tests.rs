//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a listing page, its load-more endpoint
//! and detail pages, and run full sessions over the HTTP driver.

use hashtag_harvester::config::Config;
use hashtag_harvester::crawler::{enrich_records, harvest};
use hashtag_harvester::output::{read_csv, write_csv, COLUMNS};
use hashtag_harvester::VideoRecord;
use std::collections::HashSet;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One listing card with a full (or truncated) description
fn card(id: u32, description: &str) -> String {
    format!(
        r#"<div class="thumb">
            <a class="overlay-s" href="/video/clip-{id}/"></a>
            <div class="info3">
                <div class="author-name"><a href="/user/creator{id}/">creator{id}</a></div>
                <a href="/video/clip-{id}/"><span>{description}</span></a>
            </div>
            <div class="stats">
                <div><i class="fa fa-clock"></i> {id} hours ago</div>
                <div><i class="fa fa-play"></i> {id}.5K</div>
                <div><i class="fa fa-heart"></i> 1,2{id}</div>
                <div><i class="fa fa-comment"></i> {id}</div>
            </div>
        </div>"#
    )
}

fn cards(range: std::ops::RangeInclusive<u32>) -> String {
    range
        .map(|id| card(id, &format!("video number {} #cats #pets", id)))
        .collect()
}

fn listing(items: &str, control: bool) -> String {
    let control = if control {
        r##"<div id="paging"><a id="hash_load_more" href="#" data-hash="cats" data-id="991" data-page="2" data-cursor="20">Load more</a></div>"##
    } else {
        ""
    };
    format!(
        r#"<html><head><title>#cats</title></head><body>
        <div id="thumbs">{}</div>
        {}
        </body></html>"#,
        items, control
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

/// Creates a fast test configuration pointed at the mock server
fn create_test_config(base_url: &str, diagnostics: &TempDir) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.crawler.max_loads = 1;
    config.crawler.max_retries = 2;
    config.crawler.retry_delay_ms = 0;
    config.crawler.poll_interval_ms = 5;
    config.crawler.poll_timeout_ms = 100;
    config.crawler.prime_pause_ms = 0;
    config.crawler.consent_timeout_ms = 200;
    config.crawler.min_interval_ms = 0;
    config.crawler.navigation_timeout_ms = 5_000;
    config.output.diagnostics_dir = diagnostics.path().to_string_lossy().to_string();
    config
}

#[tokio::test]
async fn test_background_replay_yields_unique_records() {
    let mock_server = MockServer::start().await;
    let diagnostics = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/hash/cats/"))
        .respond_with(html(listing(&cards(1..=20), true)))
        .mount(&mock_server)
        .await;

    // 5 duplicates (16-20) and 15 new items (21-35)
    Mock::given(method("POST"))
        .and(path("/hash_load_more"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .and(body_string_contains("hash=cats"))
        .and(body_string_contains("page=2"))
        .respond_with(html(cards(16..=35)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &diagnostics);
    let outcome = harvest(config, "#cats").await.unwrap();

    assert_eq!(outcome.records.len(), 35);
    let ids: HashSet<&str> = outcome.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids.len(), 35);

    // Encounter order is preserved
    assert_eq!(outcome.records[0].id, "1");
    assert_eq!(outcome.records[34].id, "35");

    assert_eq!(outcome.stats.snapshots, 2);
    assert_eq!(outcome.stats.duplicates_rejected, 25);
    assert_eq!(outcome.stats.loads, 1);

    let first = &outcome.records[0];
    assert_eq!(first.url, format!("{}/video/clip-1/", mock_server.uri()));
    assert_eq!(first.author_name, "creator1");
    assert_eq!(first.views, 1_500);
    assert_eq!(first.comments, 1);
    assert_eq!(first.hashtags, vec!["cats", "pets"]);
    assert_eq!(first.query_hashtag, "cats");
    assert!(first.estimated_timestamp.is_some());
}

#[tokio::test]
async fn test_truncated_description_enriched_from_detail_page() {
    let mock_server = MockServer::start().await;
    let diagnostics = TempDir::new().unwrap();

    let items = format!(
        "{}{}",
        card(1, "complete text #cats"),
        card(2, "a long story that gets cut...")
    );
    Mock::given(method("GET"))
        .and(path("/hash/cats/"))
        .respond_with(html(listing(&items, false)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/video/clip-2/"))
        .respond_with(html(
            r#"<html><body><div class="info2"><h1>a long story that gets cut short #cats #story</h1></div></body></html>"#
                .to_string(),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &diagnostics);
    let outcome = harvest(config, "cats").await.unwrap();

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.stats.enrichment.succeeded, 1);
    assert_eq!(
        outcome.records[1].description_text,
        "a long story that gets cut short #cats #story"
    );
    assert_eq!(outcome.records[1].hashtags, vec!["cats", "story"]);
    assert_eq!(outcome.stats.pagination_end, "exhausted: no load-more control");
}

#[tokio::test]
async fn test_failed_detail_page_keeps_listing_text() {
    let mock_server = MockServer::start().await;
    let diagnostics = TempDir::new().unwrap();

    let items = format!("{}{}", card(1, "first cut..."), card(2, "second cut..."));
    Mock::given(method("GET"))
        .and(path("/hash/cats/"))
        .respond_with(html(listing(&items, false)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/video/clip-1/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/video/clip-2/"))
        .respond_with(html(
            r#"<html><body><div class="info2"><h1>second in full #fyp</h1></div></body></html>"#
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &diagnostics);
    let outcome = harvest(config, "cats").await.unwrap();

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.stats.enrichment.succeeded, 1);
    assert_eq!(outcome.stats.enrichment.failed, 1);
    assert_eq!(outcome.records[0].description_text, "first cut...");
    assert!(outcome.records[0].hashtags.is_empty());
    assert_eq!(outcome.records[1].hashtags, vec!["fyp"]);
}

#[tokio::test]
async fn test_unreachable_listing_yields_empty_outcome() {
    let mock_server = MockServer::start().await;
    let diagnostics = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/hash/cats/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &diagnostics);
    let outcome = harvest(config, "cats").await.unwrap();

    assert!(outcome.records.is_empty());
    assert!(outcome.stats.pagination_end.starts_with("error"));
}

#[tokio::test]
async fn test_empty_replay_exhausts_pagination() {
    let mock_server = MockServer::start().await;
    let diagnostics = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/hash/cats/"))
        .respond_with(html(listing(&cards(1..=5), true)))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/hash_load_more"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), &diagnostics);
    config.crawler.max_loads = 3;
    let outcome = harvest(config, "cats").await.unwrap();

    assert_eq!(outcome.records.len(), 5);
    assert_eq!(outcome.stats.pagination_end, "exhausted: load-more failed");
}

#[tokio::test]
async fn test_harvest_written_as_csv() {
    let mock_server = MockServer::start().await;
    let diagnostics = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let csv_path = output.path().join("data").join("cats.csv");

    Mock::given(method("GET"))
        .and(path("/hash/cats/"))
        .respond_with(html(listing(&cards(1..=3), false)))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &diagnostics);
    let outcome = harvest(config, "cats").await.unwrap();
    let written = write_csv(&csv_path, &outcome.records).unwrap();
    assert_eq!(written, 3);

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, COLUMNS);
    assert_eq!(&headers[..2], ["url", "id"]);

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[2][1], "3");
    assert_eq!(&rows[2][14], "cats,pets");
    assert_eq!(&rows[2][16], "cats");
}

#[tokio::test]
async fn test_invalid_configuration_is_an_error() {
    let mut config = Config::default();
    config.filter.end_date = Some("2024-02-30".to_string());

    assert!(harvest(config, "cats").await.is_err());
}

#[tokio::test]
async fn test_incremental_save_during_harvest() {
    let mock_server = MockServer::start().await;
    let diagnostics = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let csv_path = output.path().join("cats.csv");

    Mock::given(method("GET"))
        .and(path("/hash/cats/"))
        .respond_with(html(listing(&cards(1..=20), true)))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/hash_load_more"))
        .respond_with(html(cards(16..=30)))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), &diagnostics);
    config.output.path = csv_path.to_string_lossy().to_string();
    config.output.incremental_save = true;
    config.output.save_every = 2;
    let outcome = harvest(config, "cats").await.unwrap();

    // Only the second snapshot falls on the save interval
    assert_eq!(outcome.stats.incremental_saves, 1);
    let partial = read_csv(&output.path().join("cats.csv.temp")).unwrap();
    assert_eq!(partial.len(), 30);
    assert_eq!(partial[29].id, "30");
}

#[tokio::test]
async fn test_enrich_existing_export() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let input = output.path().join("basic.csv");
    let enriched = output.path().join("enriched.csv");

    let mut config = create_test_config(&mock_server.uri(), &output);
    config.enrichment.enabled = false;

    let items = format!(
        "{}{}{}",
        card(1, "already complete #cats"),
        card(2, "first part of a story..."),
        card(3, "another cut...")
    );
    Mock::given(method("GET"))
        .and(path("/hash/cats/"))
        .respond_with(html(listing(&items, false)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/video/clip-2/"))
        .respond_with(html(
            r#"<html><body><div class="info2"><h1>first part of a story, then the rest #cats #story</h1></div></body></html>"#
                .to_string(),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/video/clip-3/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let outcome = harvest(config.clone(), "cats").await.unwrap();
    assert_eq!(outcome.stats.enrichment.attempted, 0);
    write_csv(&input, &outcome.records).unwrap();

    let mut records = read_csv(&input).unwrap();
    assert_eq!(records.iter().filter(|r| r.needs_enrichment()).count(), 2);

    config.enrichment.enabled = true;
    let report = enrich_records(&config, &mut records).await.unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);

    let exported: Vec<VideoRecord> = records.into_iter().map(VideoRecord::from).collect();
    write_csv(&enriched, &exported).unwrap();

    let mut reader = csv::Reader::from_path(&enriched).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][13], "already complete #cats");
    assert_eq!(&rows[1][13], "first part of a story, then the rest #cats #story");
    assert_eq!(&rows[1][14], "cats,story");
    assert_eq!(&rows[1][15], "true");
    assert_eq!(&rows[2][13], "another cut...");
    assert_eq!(&rows[2][14], "");
}
