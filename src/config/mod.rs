//! Configuration module for Hashtag-Harvester
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file, and layering command-line overrides on top of it.
//!
//! # Example
//!
//! ```no_run
//! use hashtag_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! println!("Listing: {}", config.site.listing_url("cats"));
//! ```

mod filter;
mod overrides;
mod parser;
mod types;
mod validation;

// Re-export types
pub use filter::{parse_date_bound, DateBounds};
pub use overrides::Overrides;
pub use types::{
    Config, CrawlerConfig, EnrichmentConfig, FilterConfig, OutputConfig, SelectorConfig,
    SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
