//! Text-to-value conversions for listing stats
//!
//! Both conversions are total: malformed input yields a default (0 or None)
//! rather than an error, and the caller decides whether to log it.

use chrono::{DateTime, Duration, Months, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Label words that may trail a count ("1.2K likes")
const COUNT_LABELS: &[&str] = &["views", "view", "likes", "like", "comments", "comment", "shares", "share", "plays", "play"];

static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+|an?)\s+([a-z]+)\s+ago\b").expect("valid regex")
});

/// Relative amounts beyond this are treated as garbage
const MAX_RELATIVE_AMOUNT: i64 = 100_000;

/// Parses a human-formatted count such as `1.5K`, `2M` or `1,200`
///
/// Label words are removed first, then everything except digits, `.`,
/// `,`, `K/k` and `M/m`. A `K` or `M` anywhere scales the number. Empty or
/// unparsable input is 0. Fractional results are rounded.
///
/// # Examples
///
/// ```
/// use hashtag_harvester::crawler::parse_count;
///
/// assert_eq!(parse_count("1.5K"), 1_500);
/// assert_eq!(parse_count("2M"), 2_000_000);
/// assert_eq!(parse_count("1,200"), 1_200);
/// assert_eq!(parse_count(""), 0);
/// ```
pub fn parse_count(text: &str) -> u64 {
    let mut lowered = text.trim().to_lowercase();
    for label in COUNT_LABELS {
        lowered = lowered.replace(label, " ");
    }

    let kept: String = lowered
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | 'k' | 'm'))
        .collect();

    let multiplier = if kept.contains('m') {
        1_000_000.0
    } else if kept.contains('k') {
        1_000.0
    } else {
        1.0
    };

    let numeric: String = kept
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    match numeric.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => (value * multiplier).round() as u64,
        _ => 0,
    }
}

/// Converts `"<N> <unit> ago"` or `"a/an <unit> ago"` into an absolute instant
///
/// Units are matched case-insensitively by substring (`mins` and `minutes`
/// both count as minutes). Months and years are subtracted on the calendar.
/// Returns None when the text does not match.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use hashtag_harvester::crawler::parse_relative_time;
///
/// let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
/// assert_eq!(parse_relative_time("3 days ago", now), Some(now - Duration::days(3)));
/// assert_eq!(parse_relative_time("a day ago", now), parse_relative_time("1 day ago", now));
/// ```
pub fn parse_relative_time(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = RELATIVE_TIME_RE.captures(text)?;
    let amount_text = caps.get(1)?.as_str().to_lowercase();
    let unit = caps.get(2)?.as_str().to_lowercase();

    let amount: i64 = match amount_text.as_str() {
        "a" | "an" => 1,
        digits => digits.parse().ok()?,
    };
    if amount > MAX_RELATIVE_AMOUNT {
        return None;
    }

    if unit.contains("year") {
        return now.checked_sub_months(Months::new(u32::try_from(amount * 12).ok()?));
    }
    if unit.contains("month") {
        return now.checked_sub_months(Months::new(u32::try_from(amount).ok()?));
    }

    let seconds_per_unit = if unit.contains("week") {
        7 * 24 * 3600
    } else if unit.contains("day") {
        24 * 3600
    } else if unit.contains("hour") {
        3600
    } else if unit.contains("min") {
        60
    } else if unit.contains("sec") {
        1
    } else {
        return None;
    };

    now.checked_sub_signed(Duration::seconds(amount * seconds_per_unit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 31, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_parse_count_suffixes() {
        assert_eq!(parse_count("1.5K"), 1_500);
        assert_eq!(parse_count("1.5k"), 1_500);
        assert_eq!(parse_count("2M"), 2_000_000);
        assert_eq!(parse_count("3.25m"), 3_250_000);
    }

    #[test]
    fn test_parse_count_thousands_separator() {
        assert_eq!(parse_count("1,200"), 1_200);
        assert_eq!(parse_count("12,345,678"), 12_345_678);
    }

    #[test]
    fn test_parse_count_plain_and_empty() {
        assert_eq!(parse_count("842"), 842);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("   "), 0);
        assert_eq!(parse_count("n/a"), 0);
        assert_eq!(parse_count("1..2"), 0);
    }

    #[test]
    fn test_parse_count_ignores_labels() {
        assert_eq!(parse_count("12 likes"), 12);
        assert_eq!(parse_count("1.1K views"), 1_100);
        assert_eq!(parse_count("7 comments"), 7);
    }

    #[test]
    fn test_parse_count_rounds() {
        assert_eq!(parse_count("1.2345K"), 1_235);
    }

    #[test]
    fn test_relative_time_units() {
        let now = now();
        assert_eq!(parse_relative_time("3 days ago", now), Some(now - Duration::days(3)));
        assert_eq!(parse_relative_time("2 hours ago", now), Some(now - Duration::hours(2)));
        assert_eq!(parse_relative_time("15 minutes ago", now), Some(now - Duration::minutes(15)));
        assert_eq!(parse_relative_time("40 seconds ago", now), Some(now - Duration::seconds(40)));
        assert_eq!(parse_relative_time("2 weeks ago", now), Some(now - Duration::weeks(2)));
    }

    #[test]
    fn test_relative_time_article() {
        let now = now();
        assert_eq!(
            parse_relative_time("a day ago", now),
            parse_relative_time("1 day ago", now)
        );
        assert_eq!(
            parse_relative_time("an hour ago", now),
            Some(now - Duration::hours(1))
        );
    }

    #[test]
    fn test_relative_time_calendar_months() {
        let now = now();
        // March 31st minus one month clamps to the end of February
        assert_eq!(
            parse_relative_time("1 month ago", now),
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 10, 30, 0).unwrap())
        );
        assert_eq!(
            parse_relative_time("a year ago", now),
            Some(Utc.with_ymd_and_hms(2023, 3, 31, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_relative_time_case_and_surrounding_text() {
        let now = now();
        assert_eq!(
            parse_relative_time("Posted 3 DAYS AGO", now),
            Some(now - Duration::days(3))
        );
    }

    #[test]
    fn test_relative_time_unmatched() {
        let now = now();
        assert_eq!(parse_relative_time("", now), None);
        assert_eq!(parse_relative_time("yesterday", now), None);
        assert_eq!(parse_relative_time("3 days", now), None);
        assert_eq!(parse_relative_time("3 fortnights ago", now), None);
        assert_eq!(parse_relative_time("99999999 days ago", now), None);
    }
}
