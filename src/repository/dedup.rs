//! Per-job deduplication index.

use std::collections::HashSet;

use crate::models::{dedup_key, Record};

/// Set of dedup keys seen by one crawl job.
///
/// Pre-populated from the record store at job start and owned by the job
/// for its whole run, so duplicates are rejected both within a run and
/// against prior runs.
#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    keys: HashSet<String>,
}

impl DedupIndex {
    /// Build an index from already-persisted records.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let keys = records
            .into_iter()
            .map(Record::dedup_key)
            .filter(|key| !key.is_empty())
            .collect();
        Self { keys }
    }

    pub fn contains(&self, downloadable_url: &str) -> bool {
        self.keys.contains(&dedup_key(downloadable_url))
    }

    /// Mark a key as seen. Returns false if it was already present.
    pub fn insert(&mut self, downloadable_url: &str) -> bool {
        self.keys.insert(dedup_key(downloadable_url))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_from_records_normalizes_keys() {
        let records = vec![
            Record::new("a", " https://e.com/a.pdf "),
            Record::new("b", "https://e.com/b.pdf"),
        ];
        let mut index = DedupIndex::from_records(&records);

        assert_eq!(index.len(), 2);
        assert!(index.contains("https://e.com/a.pdf"));
        assert!(!index.insert("https://e.com/b.pdf  "));
        assert!(index.insert("https://e.com/c.pdf"));
    }
}
