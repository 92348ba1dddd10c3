//! Statistics over harvested records
//!
//! This module provides functionality for computing and displaying
//! statistics about the exported records of a session.

use crate::output::traits::HarvestSummary;
use crate::record::VideoRecord;
use std::collections::HashMap;

/// Number of entries kept in the top-author and top-hashtag lists
pub const TOP_N: usize = 10;

/// Aggregates over a set of exported records
#[derive(Debug, Clone, Default)]
pub struct HarvestStatistics {
    pub total_records: usize,
    pub avg_views: f64,
    pub max_views: u64,
    pub avg_likes: f64,
    pub max_likes: u64,

    /// Authors ranked by record count, ties broken by name
    pub top_authors: Vec<(String, usize)>,

    /// Hashtags seen alongside the queried one, ranked by record count
    pub top_hashtags: Vec<(String, usize)>,
}

impl HarvestStatistics {
    /// Computes statistics for records collected under `query_hashtag`
    pub fn from_records(records: &[VideoRecord], query_hashtag: &str) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let total = records.len();
        // Counts parsed from page text can sit near u64::MAX
        let views: u128 = records.iter().map(|r| u128::from(r.views)).sum();
        let likes: u128 = records.iter().map(|r| u128::from(r.likes)).sum();

        let mut authors: HashMap<&str, usize> = HashMap::new();
        for record in records.iter().filter(|r| !r.author_name.is_empty()) {
            *authors.entry(record.author_name.as_str()).or_default() += 1;
        }

        let mut hashtags: HashMap<String, usize> = HashMap::new();
        for record in records {
            for tag in &record.hashtags {
                let tag = tag.to_lowercase();
                if !tag.eq_ignore_ascii_case(query_hashtag) {
                    *hashtags.entry(tag).or_default() += 1;
                }
            }
        }

        Self {
            total_records: total,
            avg_views: views as f64 / total as f64,
            max_views: records.iter().map(|r| r.views).max().unwrap_or(0),
            avg_likes: likes as f64 / total as f64,
            max_likes: records.iter().map(|r| r.likes).max().unwrap_or(0),
            top_authors: top(authors.into_iter().map(|(k, v)| (k.to_string(), v))),
            top_hashtags: top(hashtags.into_iter()),
        }
    }

    /// Copies the record aggregates into a run summary
    pub fn fill(&self, summary: &mut HarvestSummary) {
        summary.total_records = self.total_records;
        summary.avg_views = self.avg_views;
        summary.max_views = self.max_views;
        summary.avg_likes = self.avg_likes;
        summary.max_likes = self.max_likes;
        summary.top_authors = self.top_authors.clone();
        summary.top_hashtags = self.top_hashtags.clone();
    }
}

fn top(counts: impl Iterator<Item = (String, usize)>) -> Vec<(String, usize)> {
    let mut ranked: Vec<_> = counts.collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_N);
    ranked
}

/// Prints a run summary to stdout in a formatted manner
pub fn print_statistics(summary: &HarvestSummary) {
    println!("=== Harvest Statistics for #{} ===\n", summary.hashtag);

    println!("Listing:");
    println!("  Snapshots captured: {}", summary.snapshots);
    println!("  Load-More cycles: {}", summary.loads);
    println!("  Pagination ended: {}", summary.pagination_end);
    println!("  Candidates seen: {}", summary.candidates);
    println!(
        "  Duplicates rejected: {} ({:.1}%)",
        summary.duplicates_rejected,
        summary.duplicate_rate()
    );
    println!("  Invalid dropped: {}", summary.dropped_invalid);
    println!("  Ads skipped: {}", summary.ads_skipped);
    if summary.embedded_snapshots > 0 {
        println!("  Snapshots read from embedded data: {}", summary.embedded_snapshots);
    }
    println!();

    if summary.enrichment_attempted > 0 {
        println!("Enrichment:");
        println!("  Pending records: {}", summary.enrichment_attempted);
        println!(
            "  Enriched: {} ({:.1}%)",
            summary.enrichment_succeeded,
            summary.enrichment_success_rate()
        );
        println!("  Failed: {}", summary.enrichment_failed);
        if summary.enrichment_skipped > 0 {
            println!("  Skipped (time budget): {}", summary.enrichment_skipped);
        }
        println!();
    }

    println!("Records:");
    println!("  Exported: {}", summary.total_records);
    if summary.filtered_out > 0 {
        println!("  Outside date range: {}", summary.filtered_out);
    }
    println!(
        "  Views: avg {:.0}, max {}",
        summary.avg_views, summary.max_views
    );
    println!(
        "  Likes: avg {:.0}, max {}",
        summary.avg_likes, summary.max_likes
    );
    println!();

    if !summary.top_authors.is_empty() {
        println!("Top Authors:");
        for (author, count) in &summary.top_authors {
            println!("  {}: {}", author, count);
        }
        println!();
    }

    if !summary.top_hashtags.is_empty() {
        println!("Top Co-occurring Hashtags:");
        for (tag, count) in &summary.top_hashtags {
            println!("  #{}: {}", tag, count);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use chrono::Utc;

    fn record(id: &str, author: &str, views: u64, likes: u64, description: &str) -> VideoRecord {
        let mut record = Record::new(id, format!("https://site.test/video/{}", id), Utc::now());
        record.author_name = author.to_string();
        record.views = views;
        record.likes = likes;
        record.set_description(description);
        VideoRecord::from(record)
    }

    #[test]
    fn test_empty_records() {
        let stats = HarvestStatistics::from_records(&[], "cats");
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.avg_views, 0.0);
    }

    #[test]
    fn test_aggregates() {
        let records = vec![
            record("1", "ann", 100, 10, "#cats #Funny"),
            record("2", "bob", 300, 30, "#cats #funny #pets"),
            record("3", "ann", 200, 20, "#CATS"),
        ];
        let stats = HarvestStatistics::from_records(&records, "cats");

        assert_eq!(stats.total_records, 3);
        assert!((stats.avg_views - 200.0).abs() < 0.01);
        assert_eq!(stats.max_views, 300);
        assert!((stats.avg_likes - 20.0).abs() < 0.01);
        assert_eq!(stats.max_likes, 30);
        assert_eq!(stats.top_authors[0], ("ann".to_string(), 2));
        assert_eq!(
            stats.top_hashtags,
            vec![("funny".to_string(), 2), ("pets".to_string(), 1)]
        );
    }

    #[test]
    fn test_huge_counts_do_not_overflow() {
        let huge = crate::crawler::parse_count("9999999999999M");
        let records = vec![
            record("1", "ann", huge, huge, "#cats"),
            record("2", "bob", huge, huge, "#cats"),
            record("3", "cid", u64::MAX, 0, "#cats"),
        ];

        let stats = HarvestStatistics::from_records(&records, "cats");

        assert_eq!(stats.max_views, u64::MAX);
        assert_eq!(stats.max_likes, huge);
        assert!(stats.avg_views > huge as f64 / 2.0);
        assert!((stats.avg_likes - (huge as f64 * 2.0 / 3.0)).abs() / stats.avg_likes < 1e-9);
    }

    #[test]
    fn test_fill_summary() {
        let records = vec![record("1", "ann", 50, 5, "#dogs")];
        let mut summary = HarvestSummary::new();
        HarvestStatistics::from_records(&records, "cats").fill(&mut summary);

        assert_eq!(summary.total_records, 1);
        assert_eq!(summary.max_views, 50);
        assert_eq!(summary.top_hashtags, vec![("dogs".to_string(), 1)]);
    }
}
