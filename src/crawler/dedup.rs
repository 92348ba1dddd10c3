use crate::record::Record;
use std::collections::HashSet;

/// Admits a record unless its id was already seen
///
/// The id is recorded on admission, so the first occurrence wins.
pub fn admit(record: &Record, seen_ids: &mut HashSet<String>) -> bool {
    seen_ids.insert(record.id.clone())
}

/// Id-based uniqueness across the snapshots of one session
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen_ids: HashSet<String>,
    rejected: usize,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the record is new
    pub fn admit(&mut self, record: &Record) -> bool {
        let admitted = admit(record, &mut self.seen_ids);
        if !admitted {
            self.rejected += 1;
        }
        admitted
    }

    /// Keeps the new records of `records`, in order, and returns them
    pub fn filter_new(&mut self, records: Vec<Record>) -> Vec<Record> {
        records.into_iter().filter(|r| self.admit(r)).collect()
    }

    /// Number of distinct ids seen
    pub fn seen(&self) -> usize {
        self.seen_ids.len()
    }

    /// Number of duplicates rejected so far
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: &str) -> Record {
        Record::new(id, format!("https://urlebird.com/video/v-{}/", id), Utc::now())
    }

    #[test]
    fn test_admit_function() {
        let mut seen = HashSet::new();
        assert!(admit(&record("1"), &mut seen));
        assert!(!admit(&record("1"), &mut seen));
        assert!(seen.contains("1"));
    }

    #[test]
    fn test_overlapping_snapshots_keep_first_seen_order() {
        let mut dedup = Deduplicator::new();

        let first = dedup.filter_new(vec![record("1"), record("2"), record("3")]);
        let second = dedup.filter_new(vec![record("2"), record("4"), record("3"), record("5")]);

        let ids: Vec<_> = first.iter().chain(&second).map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(dedup.seen(), 5);
        assert_eq!(dedup.rejected(), 2);
    }
}
