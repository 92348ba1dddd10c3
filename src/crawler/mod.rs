//! Crawler module for listing pagination and record enrichment
//!
//! This module contains the core crawling logic, including:
//! - The page driver seam and its HTTP-backed implementation
//! - Load-More pagination with a background-request fallback
//! - Record extraction, embedded-data sniffing and deduplication
//! - Batched, bounded-concurrency detail-page enrichment
//! - Per-domain rate limiting and overall session coordination

mod consent;
mod dedup;
mod diagnostics;
mod driver;
mod embedded;
mod enrichment;
mod extractor;
mod http_driver;
mod pagination;
mod parsing;
mod rate_limiter;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use consent::{dismiss_consent, ConsentOutcome};
pub use dedup::Deduplicator;
pub use diagnostics::Diagnostics;
pub use driver::{ClickOptions, DriverCommand, DriverFactory, ElementHandle, PageDriver};
pub use embedded::{extract_embedded, looks_like_video};
pub use enrichment::{EnrichmentReport, EnrichmentScheduler};
pub use extractor::{Extraction, RecordExtractor};
pub use http_driver::{build_http_client, HttpDriverFactory, HttpPageDriver};
pub use pagination::{PaginationController, PaginationCursor, Snapshot};
pub use parsing::{parse_count, parse_relative_time};
pub use rate_limiter::RateLimiter;
pub use session::{CrawlSession, SessionOutcome, SessionStats};

use crate::config::Config;
use crate::record::Record;
use std::sync::Arc;

/// Runs a complete session for one hashtag over plain HTTP
///
/// This is the main entry point for a harvest. It will:
/// 1. Build the shared HTTP client
/// 2. Open the listing page and paginate it
/// 3. Enrich truncated records from their detail pages
/// 4. Return the filtered, exported records with run statistics
///
/// Only configuration problems are errors; scraping failures yield a
/// (possibly empty) outcome.
pub async fn harvest(config: Config, hashtag: &str) -> crate::Result<SessionOutcome> {
    let client = build_http_client(&config.crawler)?;
    let factory = Arc::new(HttpDriverFactory::new(client));
    let session = CrawlSession::new(config, hashtag, factory)?;
    Ok(session.run().await)
}

/// Enriches the `Pending` records of an earlier export over plain HTTP
///
/// Batching, concurrency and the rate limit come from `config` as they do
/// for a harvest. The time budget, if set, bounds the whole pass.
pub async fn enrich_records(config: &Config, records: &mut [Record]) -> crate::Result<EnrichmentReport> {
    let client = build_http_client(&config.crawler)?;
    let factory = Arc::new(HttpDriverFactory::new(client));
    let limiter = Arc::new(RateLimiter::new(config.crawler.min_interval()));
    let deadline = config
        .crawler
        .time_budget()
        .map(|budget| tokio::time::Instant::now() + budget);

    let scheduler = EnrichmentScheduler::new(factory, limiter, config).with_deadline(deadline);
    Ok(scheduler
        .enrich_with_report(
            records,
            config.enrichment.batch_size,
            config.enrichment.concurrency,
        )
        .await)
}
