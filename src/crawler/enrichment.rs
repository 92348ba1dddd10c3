//! Detail-page enrichment of truncated records
//!
//! Pending records are processed in fixed-size batches. Inside a batch up to
//! `concurrency` detail fetches run at once, each on its own driver. A
//! failing or panicking fetch marks only its own record `Failed`.

use crate::config::Config;
use crate::crawler::driver::{DriverFactory, PageDriver};
use crate::crawler::rate_limiter::RateLimiter;
use crate::record::Record;
use crate::url::domain_key;
use crate::{HarvestError, Result};
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Totals for one enrichment pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub batches: usize,
    /// Pending records left untouched because the time budget ran out
    pub skipped: usize,
}

/// Fetches detail pages for records whose description was truncated
pub struct EnrichmentScheduler {
    factory: Arc<dyn DriverFactory>,
    limiter: Arc<RateLimiter>,
    detail_selectors: Arc<Vec<String>>,
    max_retries: u32,
    retry_delay: Duration,
    navigation_timeout: Duration,
    deadline: Option<Instant>,
}

impl EnrichmentScheduler {
    pub fn new(factory: Arc<dyn DriverFactory>, limiter: Arc<RateLimiter>, config: &Config) -> Self {
        Self {
            factory,
            limiter,
            detail_selectors: Arc::new(config.selectors.detail_description.clone()),
            max_retries: config.crawler.max_retries.max(1),
            retry_delay: config.crawler.retry_delay(),
            navigation_timeout: config.crawler.navigation_timeout(),
            deadline: None,
        }
    }

    /// Stops starting new batches once `deadline` has passed
    ///
    /// Fetches already in flight always run to their own completion.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Enriches every `Pending` record in place and returns the success count
    pub async fn enrich(&self, records: &mut [Record], batch_size: usize, concurrency: usize) -> usize {
        self.enrich_with_report(records, batch_size, concurrency)
            .await
            .succeeded
    }

    /// Like [`enrich`](Self::enrich), returning the full report
    pub async fn enrich_with_report(
        &self,
        records: &mut [Record],
        batch_size: usize,
        concurrency: usize,
    ) -> EnrichmentReport {
        let pending: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.needs_enrichment())
            .map(|(index, _)| index)
            .collect();

        let mut report = EnrichmentReport {
            attempted: pending.len(),
            ..Default::default()
        };
        if pending.is_empty() {
            tracing::info!("No records need enrichment");
            return report;
        }

        let batch_size = batch_size.max(1);
        let concurrency = concurrency.max(1);
        tracing::info!(
            "Enriching {} records in batches of {} ({} concurrent)",
            pending.len(),
            batch_size,
            concurrency
        );

        for (batch_no, batch) in pending.chunks(batch_size).enumerate() {
            if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                report.skipped = pending.len() - batch_no * batch_size;
                tracing::warn!(
                    "Time budget exhausted, {} records left unenriched",
                    report.skipped
                );
                break;
            }

            report.batches += 1;
            self.limiter.wait(&domain_key(&records[batch[0]].url)).await;

            let jobs: Vec<(usize, String, String)> = batch
                .iter()
                .map(|&index| (index, records[index].id.clone(), records[index].url.clone()))
                .collect();

            let semaphore = Arc::new(Semaphore::new(concurrency));
            let fetches = jobs.into_iter().map(|(index, id, url)| {
                let semaphore = Arc::clone(&semaphore);

                async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    let outcome = AssertUnwindSafe(self.fetch_description(&id, &url))
                        .catch_unwind()
                        .await;
                    (index, outcome)
                }
            });

            for (index, outcome) in join_all(fetches).await {
                let record = &mut records[index];
                match outcome {
                    Ok(Ok(text)) => {
                        if record.complete_enrichment(&text) {
                            tracing::debug!("Enriched {}", record.id);
                            report.succeeded += 1;
                        }
                    }
                    Ok(Err(e)) => {
                        tracing::warn!("{}", e);
                        record.fail_enrichment();
                        report.failed += 1;
                    }
                    Err(_) => {
                        tracing::error!("Enrichment of {} panicked", record.id);
                        record.fail_enrichment();
                        report.failed += 1;
                    }
                }
            }

            tracing::info!(
                "Batch {} done: {} enriched, {} failed so far",
                report.batches,
                report.succeeded,
                report.failed
            );
        }

        report
    }

    /// Opens a dedicated driver, reads the description, and always closes it
    async fn fetch_description(&self, id: &str, url: &str) -> Result<String> {
        let mut driver = self.factory.open().await.map_err(|e| HarvestError::Enrichment {
            id: id.to_string(),
            message: format!("could not open a page: {}", e),
        })?;

        let result = self.read_description(driver.as_mut(), url).await;

        if let Err(e) = driver.close().await {
            tracing::debug!("Closing detail driver for {} failed: {}", id, e);
        }

        result.map_err(|e| HarvestError::Enrichment {
            id: id.to_string(),
            message: e.to_string(),
        })
    }

    async fn read_description(&self, driver: &mut dyn PageDriver, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match driver.navigate(url, self.navigation_timeout).await {
                Ok(_) => break,
                Err(e) if attempt < self.max_retries => {
                    tracing::debug!("Detail fetch {} attempt {} failed: {}", url, attempt, e);
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    return Err(HarvestError::TransientFetch {
                        url: url.to_string(),
                        message: e.to_string(),
                    })
                }
            }
        }

        for selector in self.detail_selectors.iter() {
            let Ok(matches) = driver.query_selector_all(selector).await else {
                continue;
            };
            if let Some(text) = matches
                .into_iter()
                .map(|m| m.text)
                .find(|text| !text.trim().is_empty())
            {
                return Ok(text.trim().to_string());
            }
        }

        Err(HarvestError::SelectorNotFound {
            what: format!("detail description on {}", url),
        })
    }
}
