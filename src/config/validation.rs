use crate::config::types::{Config, CrawlerConfig, EnrichmentConfig, SelectorConfig, SiteConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_selector_config(&config.selectors)?;
    validate_crawler_config(&config.crawler)?;
    validate_enrichment_config(&config.enrichment)?;
    config.filter.bounds()?;

    if config.output.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    if config.output.incremental_save && config.output.save_every == 0 {
        return Err(ConfigError::Validation(
            "save-every must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the site layout
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must be http or https, got '{}'",
            config.base_url
        )));
    }

    if !config.listing_path.contains("{hashtag}") {
        return Err(ConfigError::Validation(format!(
            "listing-path must contain a {{hashtag}} placeholder, got '{}'",
            config.listing_path
        )));
    }

    if config.load_more_endpoint.trim().is_empty() {
        return Err(ConfigError::Validation(
            "load-more-endpoint cannot be empty".to_string(),
        ));
    }

    if config.ad_marker_class.trim().is_empty()
        || config.ad_marker_class.contains(char::is_whitespace)
    {
        return Err(ConfigError::Validation(format!(
            "ad-marker-class must be a single class name, got '{}'",
            config.ad_marker_class
        )));
    }

    validate_selector("container-selector", &config.container_selector)?;
    validate_selector("item-selector", &config.item_selector)?;
    validate_selector("live item selector", &config.live_item_selector())?;

    Ok(())
}

/// Validates the ordered selector lists
fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    for (name, list) in [
        ("load-more", &config.load_more),
        ("detail-description", &config.detail_description),
    ] {
        if list.is_empty() {
            return Err(ConfigError::Validation(format!(
                "selector list '{}' cannot be empty",
                name
            )));
        }
    }

    for selector in config
        .load_more
        .iter()
        .chain(&config.consent)
        .chain(&config.detail_description)
    {
        validate_selector("selectors", selector)?;
    }

    Ok(())
}

/// Validates pagination and retry settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "poll-interval-ms must be > 0".to_string(),
        ));
    }

    if config.poll_interval_ms > config.poll_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "poll-interval-ms ({}) cannot exceed poll-timeout-ms ({})",
            config.poll_interval_ms, config.poll_timeout_ms
        )));
    }

    if config.navigation_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "navigation-timeout-ms must be > 0".to_string(),
        ));
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    Ok(())
}

/// Validates enrichment settings
fn validate_enrichment_config(config: &EnrichmentConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.concurrency < 1 || config.concurrency > 32 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 32, got {}",
            config.concurrency
        )));
    }

    Ok(())
}

fn validate_selector(name: &str, selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::Validation(format!("Invalid {} '{}': {:?}", name, selector, e)))
}
