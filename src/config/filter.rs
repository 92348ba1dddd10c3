//! Date-range filtering on estimated timestamps

use crate::config::types::FilterConfig;
use crate::ConfigError;
use chrono::{DateTime, NaiveDate, Utc};

/// Inclusive calendar-date bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateBounds {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateBounds {
    /// Returns true when neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Checks whether an estimated timestamp falls inside the bounds
    ///
    /// The end bound covers its whole day. A missing timestamp only passes
    /// when the bounds are open on both sides.
    pub fn contains(&self, timestamp: Option<DateTime<Utc>>) -> bool {
        if self.is_unbounded() {
            return true;
        }

        let Some(timestamp) = timestamp else {
            return false;
        };
        let day = timestamp.date_naive();

        if let Some(start) = self.start {
            if day < start {
                return false;
            }
        }

        if let Some(end) = self.end {
            if day > end {
                return false;
            }
        }

        true
    }
}

/// Parses a `YYYY-MM-DD` bound
pub fn parse_date_bound(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ConfigError::InvalidDate {
        value: value.to_string(),
    })
}

impl FilterConfig {
    /// Resolves the configured strings into date bounds
    pub fn bounds(&self) -> Result<DateBounds, ConfigError> {
        let start = self.start_date.as_deref().map(parse_date_bound).transpose()?;
        let end = self.end_date.as_deref().map(parse_date_bound).transpose()?;

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(ConfigError::Validation(format!(
                    "start-date {} is after end-date {}",
                    start, end
                )));
            }
        }

        Ok(DateBounds { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_unbounded_accepts_missing_timestamp() {
        let bounds = DateBounds::default();
        assert!(bounds.contains(None));
        assert!(bounds.contains(Some(at(2020, 1, 1, 0))));
    }

    #[test]
    fn test_bounded_rejects_missing_timestamp() {
        let bounds = DateBounds {
            start: Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            end: None,
        };
        assert!(!bounds.contains(None));
    }

    #[test]
    fn test_end_bound_covers_whole_day() {
        let bounds = DateBounds {
            start: None,
            end: Some(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()),
        };
        assert!(bounds.contains(Some(at(2024, 3, 10, 23))));
        assert!(!bounds.contains(Some(at(2024, 3, 11, 0))));
    }

    #[test]
    fn test_start_bound_inclusive() {
        let bounds = DateBounds {
            start: Some(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()),
            end: None,
        };
        assert!(bounds.contains(Some(at(2024, 3, 10, 0))));
        assert!(!bounds.contains(Some(at(2024, 3, 9, 23))));
    }

    #[test]
    fn test_malformed_bound() {
        let filter = FilterConfig {
            start_date: Some("10/03/2024".to_string()),
            end_date: None,
        };
        assert!(matches!(
            filter.bounds(),
            Err(ConfigError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_inverted_bounds() {
        let filter = FilterConfig {
            start_date: Some("2024-05-01".to_string()),
            end_date: Some("2024-04-01".to_string()),
        };
        assert!(matches!(filter.bounds(), Err(ConfigError::Validation(_))));
    }
}
