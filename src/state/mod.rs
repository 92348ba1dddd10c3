//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `DomainState`: per-domain bookkeeping for the rate limiter
//! - `EnrichmentState`: forward-only progress of a record's detail-page visit
//! - `PaginationState`: the Load-More state machine position

mod domain_state;
mod enrichment_state;
mod pagination_state;

// Re-export main types
pub use domain_state::DomainState;
pub use enrichment_state::EnrichmentState;
pub use pagination_state::{ExhaustReason, PaginationState};
