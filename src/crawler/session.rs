//! Crawl session - one full run of the pipeline for a single hashtag
//!
//! The session owns the rate limiter and drives the listing phase to its end,
//! extracting and deduplicating every snapshot. It then enriches truncated
//! records, applies the date filter and projects to [`VideoRecord`]s.
//! Scraping failures never escape a session; whatever was collected is
//! returned. With incremental saving enabled, the records collected so far
//! are also written to `<output>.temp` every few snapshots.

use crate::config::{Config, DateBounds};
use crate::crawler::dedup::Deduplicator;
use crate::crawler::diagnostics::Diagnostics;
use crate::crawler::driver::DriverFactory;
use crate::crawler::enrichment::{EnrichmentReport, EnrichmentScheduler};
use crate::crawler::extractor::RecordExtractor;
use crate::crawler::pagination::{PaginationController, Snapshot};
use crate::crawler::rate_limiter::RateLimiter;
use crate::output::write_csv;
use crate::record::{Record, VideoRecord};
use crate::url::normalize_hashtag;
use crate::{ConfigError, ConfigResult};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Counters gathered while a session runs
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub snapshots: usize,
    pub embedded_snapshots: usize,
    pub candidates: usize,
    pub extracted: usize,
    pub duplicates_rejected: usize,
    pub dropped_invalid: usize,
    pub ads_skipped: usize,
    pub loads: u32,
    /// Final pagination state, e.g. `exhausted: max loads reached`
    pub pagination_end: String,
    pub enrichment: EnrichmentReport,
    pub filtered_out: usize,
    /// Partial results written to the temp file during pagination
    pub incremental_saves: usize,
    pub elapsed: Duration,
}

/// Records and statistics of a finished session
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub hashtag: String,
    pub records: Vec<VideoRecord>,
    pub stats: SessionStats,
}

/// Runs the listing, enrichment and projection phases for one hashtag
pub struct CrawlSession {
    config: Config,
    hashtag: String,
    bounds: DateBounds,
    extractor: RecordExtractor,
    factory: Arc<dyn DriverFactory>,
    limiter: Arc<RateLimiter>,
    diagnostics: Diagnostics,
}

impl CrawlSession {
    /// Prepares a session, rejecting bad input before anything is fetched
    pub fn new(config: Config, hashtag: &str, factory: Arc<dyn DriverFactory>) -> ConfigResult<Self> {
        let hashtag = normalize_hashtag(hashtag)
            .ok_or_else(|| ConfigError::Validation("hashtag cannot be empty".to_string()))?;
        let bounds = config.filter.bounds()?;
        let extractor = RecordExtractor::new(&config.site, &hashtag)?;

        Ok(Self {
            limiter: Arc::new(RateLimiter::new(config.crawler.min_interval())),
            diagnostics: Diagnostics::new(&config.output.diagnostics_dir),
            config,
            hashtag,
            bounds,
            extractor,
            factory,
        })
    }

    pub fn hashtag(&self) -> &str {
        &self.hashtag
    }

    /// Runs the session to completion
    pub async fn run(&self) -> SessionOutcome {
        let started = Instant::now();
        let deadline = self.config.crawler.time_budget().map(|budget| started + budget);
        let mut stats = SessionStats::default();

        tracing::info!("Starting session for #{}", self.hashtag);

        let mut records = self.collect_listing(deadline, &mut stats).await;
        tracing::info!(
            "Listing phase finished ({}): {} unique records from {} snapshots",
            stats.pagination_end,
            records.len(),
            stats.snapshots
        );

        if self.config.enrichment.enabled {
            let scheduler = EnrichmentScheduler::new(
                Arc::clone(&self.factory),
                Arc::clone(&self.limiter),
                &self.config,
            )
            .with_deadline(deadline);
            stats.enrichment = scheduler
                .enrich_with_report(
                    &mut records,
                    self.config.enrichment.batch_size,
                    self.config.enrichment.concurrency,
                )
                .await;
        } else {
            tracing::info!("Enrichment disabled");
        }

        let before = records.len();
        let records: Vec<VideoRecord> = records
            .into_iter()
            .filter(|record| self.bounds.contains(record.estimated_timestamp))
            .map(VideoRecord::from)
            .collect();
        stats.filtered_out = before - records.len();
        if stats.filtered_out > 0 {
            tracing::info!("{} records outside the date range removed", stats.filtered_out);
        }

        stats.elapsed = started.elapsed();
        tracing::info!(
            "Session for #{} complete: {} records in {:.1}s",
            self.hashtag,
            records.len(),
            stats.elapsed.as_secs_f64()
        );

        SessionOutcome {
            hashtag: self.hashtag.clone(),
            records,
            stats,
        }
    }

    /// Drives pagination until it ends, accumulating unique records in order
    async fn collect_listing(&self, deadline: Option<Instant>, stats: &mut SessionStats) -> Vec<Record> {
        let mut dedup = Deduplicator::new();
        let mut records = Vec::new();

        let driver = match self.factory.open().await {
            Ok(driver) => driver,
            Err(e) => {
                tracing::error!("Could not open a listing page: {}", e);
                stats.pagination_end = format!("error: {}", e);
                return records;
            }
        };

        let mut controller = PaginationController::new(
            driver,
            Arc::clone(&self.limiter),
            self.diagnostics.clone(),
            &self.config,
            &self.hashtag,
        );

        match within(deadline, controller.open()).await {
            Some(Ok(snapshot)) => self.absorb(snapshot, &mut dedup, &mut records, stats),
            Some(Err(e)) => tracing::error!("Listing phase aborted: {}", e),
            None => controller.exhaust_budget(),
        }

        while !controller.state().is_terminal() {
            match within(deadline, controller.load_more()).await {
                Some(Ok(Some(snapshot))) => self.absorb(snapshot, &mut dedup, &mut records, stats),
                Some(Ok(None)) => break,
                Some(Err(e)) => {
                    tracing::error!("Pagination stopped: {}", e);
                    break;
                }
                None => controller.exhaust_budget(),
            }
        }

        stats.loads = controller.loads();
        stats.pagination_end = controller.state().to_string();
        stats.duplicates_rejected = dedup.rejected();
        tracing::debug!(
            "{} distinct ids seen, {} duplicates rejected",
            dedup.seen(),
            dedup.rejected()
        );
        controller.close().await;

        records
    }

    fn absorb(
        &self,
        snapshot: Snapshot,
        dedup: &mut Deduplicator,
        records: &mut Vec<Record>,
        stats: &mut SessionStats,
    ) {
        let extraction = self.extractor.extract(&snapshot.html);

        stats.snapshots += 1;
        stats.candidates += extraction.candidates;
        stats.extracted += extraction.records.len();
        stats.dropped_invalid += extraction.dropped_invalid;
        stats.ads_skipped += extraction.ads_skipped;
        if extraction.from_embedded {
            stats.embedded_snapshots += 1;
        }

        let fresh = dedup.filter_new(extraction.records);
        tracing::info!(
            "Snapshot {}: {} candidates, {} new, {} total",
            snapshot.index,
            extraction.candidates,
            fresh.len(),
            records.len() + fresh.len()
        );
        records.extend(fresh);

        let output = &self.config.output;
        if output.incremental_save
            && stats.snapshots % output.save_every.max(1) == 0
            && !records.is_empty()
        {
            self.save_partial(records, stats);
        }
    }

    /// Writes the records collected so far to the temp path
    ///
    /// A failed write is logged and the session carries on.
    fn save_partial(&self, records: &[Record], stats: &mut SessionStats) {
        let path = self.config.output.temp_path();
        let partial: Vec<VideoRecord> = records
            .iter()
            .filter(|record| self.bounds.contains(record.estimated_timestamp))
            .cloned()
            .map(VideoRecord::from)
            .collect();

        match write_csv(Path::new(&path), &partial) {
            Ok(written) => {
                stats.incremental_saves += 1;
                tracing::info!("Incremental save: {} records to {}", written, path);
            }
            Err(e) => tracing::warn!("Incremental save to {} failed: {}", path, e),
        }
    }
}

/// Awaits `future`, giving up at `deadline` if one is set
async fn within<F: Future>(deadline: Option<Instant>, future: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, future).await.ok(),
        None => Some(future.await),
    }
}
