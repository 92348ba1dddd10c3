use std::time::{Duration, Instant};

/// Tracks the state of a domain for rate limiting
///
/// One entry exists per domain touched during a session. The limiter mutates
/// it under a lock; the methods here are pure bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of requests made to this domain in the current session
    pub request_count: u32,

    /// Timestamp of the last granted request slot
    pub last_request_time: Option<Instant>,
}

impl DomainState {
    /// Creates a new DomainState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if a request can be made to this domain right away
    pub fn can_request(&self, min_interval: Duration, now: Instant) -> bool {
        self.time_until_next_request(min_interval, now).is_none()
    }

    /// Records that a request slot was granted at `at`
    pub fn record_request(&mut self, at: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(at);
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, min_interval: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let ready_at = last + min_interval;
        if now < ready_at {
            Some(ready_at - now)
        } else {
            None
        }
    }
}
