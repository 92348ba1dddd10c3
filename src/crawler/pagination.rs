//! Load-More pagination state machine
//!
//! ```text
//! Init --open--> Loaded(0) --load_more--> Loaded(n + 1)
//!                    |                      |
//!                    +----> Exhausted <-----+
//!                    +----> Error <---------+
//! ```
//!
//! A load cycle locates the control, primes and clicks it, then polls the
//! listing for growth. If the click fails or nothing grows, the control's
//! attributes are replayed as a background request. Only the loss of the
//! listing container is an error; every other failure ends pagination
//! normally with what was collected.

use crate::config::{Config, CrawlerConfig, SelectorConfig, SiteConfig};
use crate::crawler::consent::dismiss_consent;
use crate::crawler::diagnostics::Diagnostics;
use crate::crawler::driver::{ClickOptions, DriverCommand, ElementHandle, PageDriver};
use crate::crawler::rate_limiter::RateLimiter;
use crate::state::{ExhaustReason, PaginationState};
use crate::url::domain_key;
use crate::{DriverError, HarvestError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;

/// One captured listing document
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Load cycle that produced it (0 for the initial page)
    pub index: u32,
    pub html: String,
}

/// Result of a liveness poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollOutcome {
    Grew(usize),
    ContainerLost,
    TimedOut,
}

/// Key/value bag copied from the Load-More control
///
/// Holds every `data-*` attribute plus `href` and `onclick`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationCursor {
    attributes: BTreeMap<String, String>,
}

impl PaginationCursor {
    pub fn from_control(control: &ElementHandle) -> Self {
        let attributes = control
            .attributes
            .iter()
            .filter(|(name, _)| name.starts_with("data-") || *name == "href" || *name == "onclick")
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self { attributes }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Builds the background-request form
    ///
    /// The standard fields come first (`hash`, `id`, `page`, `cursor`, `x`),
    /// followed by any other `data-*` attribute with its prefix removed and
    /// dashes turned into underscores. When the control still carries the
    /// page number of the previous replay, the page is advanced and the
    /// cursor set to the number of items already loaded.
    pub fn form_fields(
        &self,
        hashtag: &str,
        item_count: usize,
        previous: Option<&[(String, String)]>,
    ) -> Vec<(String, String)> {
        let mut page = self.get("data-page").unwrap_or("2").to_string();
        let mut cursor = self.get("data-cursor").unwrap_or("20").to_string();

        let previous_page = previous
            .and_then(|fields| fields.iter().find(|(k, _)| k == "page"))
            .map(|(_, v)| v.as_str());
        if let Some(prev) = previous_page {
            if prev == page {
                if let Ok(n) = prev.parse::<u32>() {
                    page = (n + 1).to_string();
                    cursor = item_count.to_string();
                }
            }
        }

        let mut fields = vec![
            (
                "hash".to_string(),
                self.get("data-hash").unwrap_or(hashtag).to_string(),
            ),
            ("id".to_string(), self.get("data-id").unwrap_or_default().to_string()),
            ("page".to_string(), page),
            ("cursor".to_string(), cursor),
            ("x".to_string(), self.get("data-x").unwrap_or_default().to_string()),
        ];

        const STANDARD: &[&str] = &["data-hash", "data-id", "data-page", "data-cursor", "data-x"];
        for (name, value) in &self.attributes {
            if let Some(stripped) = name.strip_prefix("data-") {
                if !STANDARD.contains(&name.as_str()) {
                    fields.push((stripped.replace('-', "_"), value.clone()));
                }
            }
        }

        fields
    }
}

/// Drives one listing page through repeated Load-More cycles
///
/// Owns its page driver exclusively for the whole listing phase.
pub struct PaginationController {
    driver: Box<dyn PageDriver>,
    limiter: Arc<RateLimiter>,
    diagnostics: Diagnostics,
    site: SiteConfig,
    selectors: SelectorConfig,
    crawler: CrawlerConfig,
    live_items: String,
    listing_url: String,
    hashtag: String,
    state: PaginationState,
    loads: u32,
    last_replay: Option<Vec<(String, String)>>,
}

impl PaginationController {
    pub fn new(
        driver: Box<dyn PageDriver>,
        limiter: Arc<RateLimiter>,
        diagnostics: Diagnostics,
        config: &Config,
        hashtag: &str,
    ) -> Self {
        Self {
            driver,
            limiter,
            diagnostics,
            live_items: config.site.live_item_selector(),
            listing_url: config.site.listing_url(hashtag),
            site: config.site.clone(),
            selectors: config.selectors.clone(),
            crawler: config.crawler.clone(),
            hashtag: hashtag.to_string(),
            state: PaginationState::Init,
            loads: 0,
            last_replay: None,
        }
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    pub fn listing_url(&self) -> &str {
        &self.listing_url
    }

    /// Number of successful load cycles
    pub fn loads(&self) -> u32 {
        self.loads
    }

    /// Stops pagination because the caller's budget ran out
    pub fn exhaust_budget(&mut self) {
        if !self.state.is_terminal() {
            tracing::info!("Time budget exhausted after {} loads", self.loads);
            self.state = PaginationState::Exhausted(ExhaustReason::Budget);
        }
    }

    /// Releases the page driver
    pub async fn close(mut self) {
        if let Err(e) = self.driver.close().await {
            tracing::debug!("Closing listing driver failed: {}", e);
        }
    }

    /// Opens the listing page and captures snapshot 0
    ///
    /// Navigation is retried with a fixed backoff. Exhausting the retries
    /// moves the controller to `Error` and returns a transient fetch error.
    pub async fn open(&mut self) -> Result<Snapshot> {
        let domain = domain_key(&self.listing_url);
        let max_retries = self.crawler.max_retries.max(1);
        let mut last_error: Option<DriverError> = None;

        for attempt in 1..=max_retries {
            self.limiter.wait(&domain).await;
            tracing::info!(
                "Opening {} (attempt {}/{})",
                self.listing_url,
                attempt,
                max_retries
            );

            match self
                .driver
                .navigate(&self.listing_url, self.crawler.navigation_timeout())
                .await
            {
                Ok(_) => {
                    last_error = None;
                    break;
                }
                Err(e) => {
                    tracing::warn!("Navigation attempt {} failed: {}", attempt, e);
                    last_error = Some(e);
                    if attempt < max_retries {
                        tokio::time::sleep(self.crawler.retry_delay()).await;
                    }
                }
            }
        }

        if let Some(error) = last_error {
            let message = format!("{} attempts failed, last error: {}", max_retries, error);
            tracing::error!("Could not open {}: {}", self.listing_url, message);
            self.state = PaginationState::Error(message.clone());
            return Err(HarvestError::TransientFetch {
                url: self.listing_url.clone(),
                message,
            });
        }

        dismiss_consent(
            self.driver.as_mut(),
            &self.selectors,
            self.crawler.consent_timeout(),
        )
        .await;

        let container_present = self
            .driver
            .wait_for(
                &self.site.container_selector,
                self.crawler.poll_timeout(),
                self.crawler.poll_interval(),
            )
            .await
            .unwrap_or(false);

        let html = self.driver.content().await?;
        if container_present {
            self.diagnostics.save("initial", &html);
        } else {
            tracing::warn!(
                "Listing container '{}' not found on {}",
                self.site.container_selector,
                self.listing_url
            );
            self.diagnostics.save("missing_container", &html);
        }

        self.state = PaginationState::Loaded(0);
        Ok(Snapshot { index: 0, html })
    }

    /// Attempts one Load-More cycle
    ///
    /// Returns the fresh snapshot on success and `None` once pagination is
    /// exhausted. Losing the listing container is a `StructuralLoss` error.
    pub async fn load_more(&mut self) -> Result<Option<Snapshot>> {
        if self.state.is_terminal() {
            return Ok(None);
        }
        if matches!(self.state, PaginationState::Init) {
            return Err(HarvestError::Validation {
                reason: "load_more called before open".to_string(),
            });
        }

        if self.loads >= self.crawler.max_loads {
            return Ok(self.exhaust(ExhaustReason::MaxLoads));
        }

        let Some(control) = self.locate_control().await else {
            tracing::info!("No Load More control found after {} loads", self.loads);
            return Ok(self.exhaust(ExhaustReason::NoControl));
        };
        let cursor = PaginationCursor::from_control(&control);
        if cursor.is_empty() {
            tracing::debug!(
                "Load More control '{}' carries no data attributes, background request uses defaults",
                control.selector
            );
        } else {
            tracing::debug!("Load More control '{}' with {:?}", control.selector, cursor);
        }

        let before = self.count_items().await;

        self.prime(&control).await;
        if self.click(&control).await {
            match self.poll(before).await {
                PollOutcome::Grew(after) => return self.capture(before, after).await.map(Some),
                PollOutcome::ContainerLost => return Err(self.structural_loss().await),
                PollOutcome::TimedOut => {
                    tracing::info!("Click produced no new items, trying background request");
                }
            }
        }

        if self.replay(&cursor, before).await {
            match self.poll(before).await {
                PollOutcome::Grew(after) => return self.capture(before, after).await.map(Some),
                PollOutcome::ContainerLost => return Err(self.structural_loss().await),
                PollOutcome::TimedOut => {}
            }
        }

        tracing::warn!("Load More failed on both paths after {} loads", self.loads);
        if let Ok(html) = self.driver.content().await {
            self.diagnostics.save("load_more_failed", &html);
        }
        Ok(self.exhaust(ExhaustReason::LoadMoreFailed))
    }

    fn exhaust(&mut self, reason: ExhaustReason) -> Option<Snapshot> {
        self.state = PaginationState::Exhausted(reason);
        None
    }

    /// First visible match of the ordered control selectors
    async fn locate_control(&self) -> Option<ElementHandle> {
        for selector in &self.selectors.load_more {
            match self.driver.query_selector_all(selector).await {
                Ok(matches) => {
                    if let Some(control) = matches.into_iter().find(|m| m.visible) {
                        return Some(control);
                    }
                }
                Err(e) => tracing::debug!("Control selector '{}' failed: {}", selector, e),
            }
        }
        None
    }

    async fn count_items(&self) -> usize {
        self.driver
            .query_selector_all(&self.live_items)
            .await
            .map(|items| items.len())
            .unwrap_or(0)
    }

    async fn container_present(&self) -> bool {
        self.driver
            .query_selector_all(&self.site.container_selector)
            .await
            .map(|found| !found.is_empty())
            .unwrap_or(false)
    }

    /// Scroll into view, pause, then hover; failures are ignored
    async fn prime(&mut self, control: &ElementHandle) {
        let scroll = DriverCommand::ScrollIntoView {
            selector: control.selector.clone(),
            index: control.index,
        };
        if let Err(e) = self.driver.evaluate(&scroll).await {
            tracing::debug!("Scroll to control failed: {}", e);
        }

        tokio::time::sleep(self.crawler.prime_pause()).await;

        let hover = DriverCommand::PointerNear {
            selector: control.selector.clone(),
            index: control.index,
        };
        if let Err(e) = self.driver.evaluate(&hover).await {
            tracing::debug!("Pointer move to control failed: {}", e);
        }
    }

    /// Normal click, then forced click; true if either went through
    async fn click(&mut self, control: &ElementHandle) -> bool {
        match self.driver.click(control, ClickOptions::default()).await {
            Ok(()) => return true,
            Err(e) => tracing::debug!("Click on Load More failed: {}", e),
        }

        match self.driver.click(control, ClickOptions { force: true }).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Forced click on Load More failed: {}", e);
                false
            }
        }
    }

    /// Waits for the item count to exceed `before` or the container to vanish
    async fn poll(&self, before: usize) -> PollOutcome {
        let deadline = Instant::now() + self.crawler.poll_timeout();
        loop {
            if !self.container_present().await {
                return PollOutcome::ContainerLost;
            }

            let now_count = self.count_items().await;
            if now_count > before {
                return PollOutcome::Grew(now_count);
            }

            if Instant::now() >= deadline {
                return PollOutcome::TimedOut;
            }
            tokio::time::sleep(self.crawler.poll_interval()).await;
        }
    }

    /// Replays the control as a background request; true if markup was appended
    async fn replay(&mut self, cursor: &PaginationCursor, item_count: usize) -> bool {
        let form = cursor.form_fields(&self.hashtag, item_count, self.last_replay.as_deref());
        tracing::info!("Background Load More request with {:?}", form);

        let command = DriverCommand::AppendFragment {
            endpoint: self.site.load_more_endpoint.clone(),
            form: form.clone(),
            container: self.site.container_selector.clone(),
        };

        self.limiter.wait(&domain_key(&self.listing_url)).await;
        let appended = match self.driver.evaluate(&command).await {
            Ok(result) => result
                .get("appended")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or_else(|| result.as_bool().unwrap_or(false)),
            Err(e) => {
                tracing::warn!("Background request failed: {}", e);
                false
            }
        };

        self.last_replay = Some(form);
        if !appended {
            tracing::warn!("Background request returned no usable content");
        }
        appended
    }

    async fn capture(&mut self, before: usize, after: usize) -> Result<Snapshot> {
        self.loads += 1;
        self.state = PaginationState::Loaded(self.loads);
        tracing::info!(
            "Load {} added {} items ({} -> {})",
            self.loads,
            after - before,
            before,
            after
        );

        let html = self.driver.content().await?;
        Ok(Snapshot {
            index: self.loads,
            html,
        })
    }

    async fn structural_loss(&mut self) -> HarvestError {
        let detail = format!(
            "listing container '{}' disappeared after {} loads",
            self.site.container_selector, self.loads
        );
        tracing::error!("{}", detail);

        if let Ok(html) = self.driver.content().await {
            self.diagnostics.save("container_lost", &html);
        }
        self.state = PaginationState::Error(detail.clone());
        HarvestError::StructuralLoss { detail }
    }
}
