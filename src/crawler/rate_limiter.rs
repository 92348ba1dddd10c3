//! Per-domain minimum-interval throttle
//!
//! One limiter is created per session and shared (behind an `Arc`) by the
//! pagination phase and every enrichment task.

use crate::state::DomainState;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a minimum delay between requests to the same domain
///
/// Each caller reserves the next free slot for its domain while holding the
/// lock, then sleeps outside of it. Concurrent callers therefore queue up
/// one `min_interval` apart instead of racing on the last-request timestamp.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    domains: Mutex<HashMap<String, DomainState>>,
}

impl RateLimiter {
    /// Creates a limiter with the given minimum interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            domains: Mutex::new(HashMap::new()),
        }
    }

    /// The configured minimum interval
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Suspends until a request to `domain` is allowed
    ///
    /// Returns the time spent waiting.
    pub async fn wait(&self, domain: &str) -> Duration {
        let delay = {
            let mut domains = self.domains.lock().await;
            let state = domains.entry(domain.to_string()).or_default();
            let now = Instant::now();
            let delay = state
                .time_until_next_request(self.min_interval, now)
                .unwrap_or(Duration::ZERO);
            state.record_request(now + delay);
            delay
        };

        if !delay.is_zero() {
            tracing::debug!("Rate limiting {}: waiting {:?}", domain, delay);
            tokio::time::sleep(delay).await;
        }

        delay
    }

    /// Number of request slots granted for `domain` so far
    pub async fn request_count(&self, domain: &str) -> u32 {
        self.domains
            .lock()
            .await
            .get(domain)
            .map(|state| state.request_count)
            .unwrap_or(0)
    }
}
