use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Hashtag-Harvester
///
/// Every table is optional in the TOML file; missing tables and keys fall
/// back to values tuned for the default aggregator layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub selectors: SelectorConfig,
    pub crawler: CrawlerConfig,
    pub enrichment: EnrichmentConfig,
    pub filter: FilterConfig,
    pub output: OutputConfig,
}

/// Where the listing lives and how its markup is shaped
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site root used to resolve relative links
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Listing path template; `{hashtag}` is substituted
    #[serde(rename = "listing-path")]
    pub listing_path: String,

    /// Endpoint replayed by the background-request fallback
    #[serde(rename = "load-more-endpoint")]
    pub load_more_endpoint: String,

    /// Container holding the listing items
    #[serde(rename = "container-selector")]
    pub container_selector: String,

    /// One listing item (video card)
    #[serde(rename = "item-selector")]
    pub item_selector: String,

    /// Class carried by advertisement cards
    #[serde(rename = "ad-marker-class")]
    pub ad_marker_class: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://urlebird.com".to_string(),
            listing_path: "/hash/{hashtag}/".to_string(),
            load_more_endpoint: "/hash_load_more".to_string(),
            container_selector: "#thumbs".to_string(),
            item_selector: "div.thumb".to_string(),
            ad_marker_class: "display-flex-semi".to_string(),
        }
    }
}

impl SiteConfig {
    /// Builds the listing URL for a hashtag (without the leading `#`)
    pub fn listing_url(&self, hashtag: &str) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.listing_path.replace("{hashtag}", hashtag)
        )
    }

    /// Selector matching listing items that are not advertisements
    pub fn live_item_selector(&self) -> String {
        format!(
            "{} {}:not(.{})",
            self.container_selector, self.item_selector, self.ad_marker_class
        )
    }
}

/// Ordered selector candidates, tried first to last
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Load-More control candidates
    #[serde(rename = "load-more")]
    pub load_more: Vec<String>,

    /// Consent overlay accept buttons
    pub consent: Vec<String>,

    /// Key pressed when no consent button could be clicked
    #[serde(rename = "dismiss-key")]
    pub dismiss_key: String,

    /// Full-description node on a detail page
    #[serde(rename = "detail-description")]
    pub detail_description: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            load_more: owned(&[
                "#hash_load_more",
                "#paging a.btn",
                "a.load-more-btn",
                "a.js-load-more",
                "button.load-more",
                ".load-more-container a",
                ".pagination a.next",
                ".more-videos-btn",
                ".show-more-btn",
                "#load-more",
                ".load-more",
                "button[data-load-more]",
                "[data-action=\"load-more\"]",
            ]),
            consent: owned(&[
                "button[id*=\"accept\"]",
                "button[class*=\"accept\"]",
                "button[id*=\"cookie\"]",
                ".qc-cmp2-summary-buttons button[mode=\"primary\"]",
            ]),
            dismiss_key: "Escape".to_string(),
            detail_description: owned(&[
                ".info2 h1",
                ".video-description h1",
                ".video-info h1",
                ".content h1",
                "h1.description",
                ".info h1",
                ".description",
                ".video-text",
                ".caption",
            ]),
        }
    }
}

/// Pagination, retry and politeness settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of successful Load-More cycles
    #[serde(rename = "max-loads")]
    pub max_loads: u32,

    /// Navigation attempts before giving up on a page
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Fixed backoff after a failed navigation attempt (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Timeout for a single navigation (milliseconds)
    #[serde(rename = "navigation-timeout-ms")]
    pub navigation_timeout_ms: u64,

    /// Liveness poll interval after a Load-More attempt (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Maximum liveness poll duration (milliseconds)
    #[serde(rename = "poll-timeout-ms")]
    pub poll_timeout_ms: u64,

    /// Pause between scrolling the control into view and pointing at it
    #[serde(rename = "prime-pause-ms")]
    pub prime_pause_ms: u64,

    /// Upper bound for the whole consent dismissal step (milliseconds)
    #[serde(rename = "consent-timeout-ms")]
    pub consent_timeout_ms: u64,

    /// Minimum time between requests to the same domain (milliseconds)
    #[serde(rename = "min-interval-ms")]
    pub min_interval_ms: u64,

    /// Overall budget for the listing phase (seconds)
    #[serde(rename = "time-budget-secs")]
    pub time_budget_secs: Option<u64>,

    /// User agent sent by the HTTP driver
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Optional proxy for every request
    pub proxy: Option<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_loads: 5,
            max_retries: 3,
            retry_delay_ms: 5_000,
            navigation_timeout_ms: 30_000,
            poll_interval_ms: 1_000,
            poll_timeout_ms: 30_000,
            prime_pause_ms: 500,
            consent_timeout_ms: 5_000,
            min_interval_ms: 2_000,
            time_budget_secs: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            proxy: None,
        }
    }
}

impl CrawlerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn prime_pause(&self) -> Duration {
        Duration::from_millis(self.prime_pause_ms)
    }

    pub fn consent_timeout(&self) -> Duration {
        Duration::from_millis(self.consent_timeout_ms)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_secs.map(Duration::from_secs)
    }
}

/// Detail-page enrichment settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Whether truncated records are revisited at all
    pub enabled: bool,

    /// Records per batch; the rate limiter is honored between batches
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Maximum detail fetches in flight within a batch
    pub concurrency: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: 5,
            concurrency: 3,
        }
    }
}

/// Optional inclusive date bounds on the estimated timestamp (`YYYY-MM-DD`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    #[serde(rename = "start-date")]
    pub start_date: Option<String>,

    #[serde(rename = "end-date")]
    pub end_date: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the CSV file
    pub path: String,

    /// Directory receiving diagnostic page snapshots
    #[serde(rename = "diagnostics-dir")]
    pub diagnostics_dir: String,

    /// Optional markdown run summary
    #[serde(rename = "summary-path")]
    pub summary_path: Option<String>,

    /// Periodically write partial results to `<path>.temp` while paginating
    #[serde(rename = "incremental-save")]
    pub incremental_save: bool,

    /// Snapshots between two incremental saves
    #[serde(rename = "save-every")]
    pub save_every: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "data/hash_videos.csv".to_string(),
            diagnostics_dir: "debug_page".to_string(),
            summary_path: None,
            incremental_save: false,
            save_every: 2,
        }
    }
}

impl OutputConfig {
    /// Path receiving incremental saves
    pub fn temp_path(&self) -> String {
        format!("{}.temp", self.path)
    }
}
