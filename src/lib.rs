//! Hashtag-Harvester: a listing crawler for hashtag-indexed video aggregators
//!
//! This crate drives a page driver through repeated "Load More" cycles on a
//! hashtag listing page, extracts and deduplicates video records from every
//! snapshot, then revisits the detail pages of truncated records to backfill
//! their full descriptions.

pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Hashtag-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transient fetch failure for {url}: {message}")]
    TransientFetch { url: String, message: String },

    #[error("No matching element for {what}")]
    SelectorNotFound { what: String },

    #[error("Listing structure lost: {detail}")]
    StructuralLoss { detail: String },

    #[error("Invalid record: {reason}")]
    Validation { reason: String },

    #[error("Enrichment failed for {id}: {message}")]
    Enrichment { id: String, message: String },

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid date bound '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },
}

/// Errors raised by a page driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("No page loaded")]
    NoPage,

    #[error("Element not found: {0}")]
    ElementMissing(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Operation not supported by this driver: {0}")]
    Unsupported(String),

    #[error("Command failed: {0}")]
    Command(String),
}

/// Result type alias for Hashtag-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for page driver operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;

// Re-export commonly used types
pub use config::Config;
pub use record::{Record, VideoRecord};
pub use state::{EnrichmentState, PaginationState};
