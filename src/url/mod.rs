//! URL handling module for Hashtag-Harvester
//!
//! This module provides domain extraction for rate limiting, link resolution,
//! video-id extraction and hashtag normalisation.

mod domain;
mod hashtag;
mod links;

// Re-export main functions
pub use domain::{domain_key, extract_domain};
pub use hashtag::normalize_hashtag;
pub use links::{extract_video_id, resolve_link};
