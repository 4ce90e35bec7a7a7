//! Append-only record store.
//!
//! Two on-disk layouts are supported, chosen by the store path's extension:
//! - `.jsonl`: one JSON object per line, appended in place (preferred).
//! - anything else: a single indented JSON array, rewritten on every append.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{ensure_parent_dir, write_atomic, DedupIndex, RepositoryError, Result};
use crate::models::Record;

/// On-disk layout of a record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
    /// One JSON object per line.
    JsonLines,
    /// One indented JSON array.
    JsonArray,
}

impl StoreFormat {
    /// Select the layout from the store path.
    pub fn for_path(path: &Path) -> Self {
        let is_lines = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"));
        if is_lines {
            Self::JsonLines
        } else {
            Self::JsonArray
        }
    }
}

/// Persisted collection of harvested records.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
    format: StoreFormat,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = StoreFormat::for_path(&path);
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> StoreFormat {
        self.format
    }

    /// Load every persisted record. A missing store is empty.
    ///
    /// Records without a downloadable URL are dropped.
    pub fn load(&self) -> Result<Vec<Record>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let records = match self.format {
            StoreFormat::JsonLines => self.load_lines()?,
            StoreFormat::JsonArray => self.load_array()?,
        };

        Ok(records
            .into_iter()
            .filter(|r| !r.downloadable_url.trim().is_empty())
            .collect())
    }

    /// Dedup index over the current store contents.
    pub fn dedup_index(&self) -> Result<DedupIndex> {
        let records = self.load()?;
        Ok(DedupIndex::from_records(&records))
    }

    /// Append a batch of records. An empty batch is a no-op.
    pub fn append(&self, records: &[Record]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        ensure_parent_dir(&self.path)?;

        match self.format {
            StoreFormat::JsonLines => self.append_lines(records),
            StoreFormat::JsonArray => self.rewrite_array(records),
        }?;

        debug!(
            "Appended {} records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn load_lines(&self) -> Result<Vec<Record>> {
        let file =
            std::fs::File::open(&self.path).map_err(|e| RepositoryError::io(&self.path, e))?;
        let lines: Vec<String> = BufReader::new(file)
            .lines()
            .collect::<std::io::Result<_>>()
            .map_err(|e| RepositoryError::io(&self.path, e))?;

        let last_content_line = lines.iter().rposition(|l| !l.trim().is_empty());
        let mut records = Vec::with_capacity(lines.len());

        for (idx, line) in lines.iter().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Record>(line) {
                Ok(record) => records.push(record),
                // A crash mid-append can leave a truncated final line.
                Err(e) if Some(idx) == last_content_line => {
                    warn!(
                        "Ignoring truncated trailing line {} in {}: {}",
                        idx + 1,
                        self.path.display(),
                        e
                    );
                }
                Err(e) => return Err(RepositoryError::json(&self.path, e)),
            }
        }

        Ok(records)
    }

    fn load_array(&self) -> Result<Vec<Record>> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| RepositoryError::io(&self.path, e))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| RepositoryError::json(&self.path, e))
    }

    fn append_lines(&self, records: &[Record]) -> Result<()> {
        self.repair_unterminated_tail()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| RepositoryError::io(&self.path, e))?;

        let mut writer = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut writer, record)
                .map_err(|e| RepositoryError::json(&self.path, e))?;
            writer
                .write_all(b"\n")
                .map_err(|e| RepositoryError::io(&self.path, e))?;
        }

        let file = writer
            .into_inner()
            .map_err(|e| RepositoryError::io(&self.path, e.into_error()))?;
        file.sync_data()
            .map_err(|e| RepositoryError::io(&self.path, e))
    }

    /// Make sure the next append starts on a fresh line.
    ///
    /// A crash mid-append can leave the file without a final newline. A
    /// complete record there gets its newline back; a truncated fragment is
    /// cut off, since loading already ignores it.
    fn repair_unterminated_tail(&self) -> Result<()> {
        let content = match std::fs::read(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(RepositoryError::io(&self.path, e)),
        };
        if content.is_empty() || content.ends_with(b"\n") {
            return Ok(());
        }

        let line_start = content
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |i| i + 1);
        let tail = &content[line_start..];

        let mut file = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| RepositoryError::io(&self.path, e))?;

        if tail.trim_ascii().is_empty() || serde_json::from_slice::<Record>(tail).is_ok() {
            file.seek(SeekFrom::End(0))
                .and_then(|_| file.write_all(b"\n"))
                .map_err(|e| RepositoryError::io(&self.path, e))
        } else {
            warn!(
                "Dropping truncated trailing record ({} bytes) in {}",
                tail.len(),
                self.path.display()
            );
            file.set_len(line_start as u64)
                .map_err(|e| RepositoryError::io(&self.path, e))
        }
    }

    fn rewrite_array(&self, records: &[Record]) -> Result<()> {
        let mut all = self.load_array_or_empty()?;
        all.extend_from_slice(records);
        all.sort_by_key(|r| r.title.to_lowercase());

        let mut content =
            serde_json::to_vec_pretty(&all).map_err(|e| RepositoryError::json(&self.path, e))?;
        content.push(b'\n');
        write_atomic(&self.path, &content)
    }

    fn load_array_or_empty(&self) -> Result<Vec<Record>> {
        if self.path.exists() {
            self.load_array()
        } else {
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(title: &str, url: &str) -> Record {
        Record::new(title, url)
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            StoreFormat::for_path(Path::new("items.jsonl")),
            StoreFormat::JsonLines
        );
        assert_eq!(
            StoreFormat::for_path(Path::new("items.JSONL")),
            StoreFormat::JsonLines
        );
        assert_eq!(
            StoreFormat::for_path(Path::new("items.json")),
            StoreFormat::JsonArray
        );
    }

    #[test]
    fn test_missing_store_loads_empty() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("items.jsonl"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_jsonl_append_accumulates() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("data").join("items.jsonl"));

        store.append(&[record("B", "https://e.com/b.pdf")]).unwrap();
        store.append(&[]).unwrap();
        store.append(&[record("A", "https://e.com/a.pdf")]).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].title, "B");
        assert_eq!(loaded[1].title, "A");
    }

    #[test]
    fn test_jsonl_tolerates_truncated_last_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.jsonl");
        std::fs::write(
            &path,
            "{\"title\":\"A\",\"downloadable_url\":\"https://e.com/a.pdf\"}\n\n{\"title\":\"B\",\"downl",
        )
        .unwrap();

        let loaded = RecordStore::new(&path).load().unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_append_after_truncated_tail_keeps_new_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.jsonl");
        std::fs::write(
            &path,
            "{\"title\":\"A\",\"downloadable_url\":\"https://e.com/a.pdf\"}\n{\"title\":\"B\",\"downl",
        )
        .unwrap();
        let store = RecordStore::new(&path);

        store.append(&[record("C", "https://e.com/c.pdf")]).unwrap();
        let titles: Vec<String> = store.load().unwrap().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["A", "C"]);

        store.append(&[record("D", "https://e.com/d.pdf")]).unwrap();
        let titles: Vec<String> = store.load().unwrap().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["A", "C", "D"]);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("\"downl{"));
        assert!(raw.ends_with('\n'));
    }

    #[test]
    fn test_append_keeps_complete_record_missing_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.jsonl");
        std::fs::write(
            &path,
            "{\"title\":\"A\",\"downloadable_url\":\"https://e.com/a.pdf\"}",
        )
        .unwrap();
        let store = RecordStore::new(&path);

        store.append(&[record("B", "https://e.com/b.pdf")]).unwrap();
        let titles: Vec<String> = store.load().unwrap().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_jsonl_rejects_corruption_in_the_middle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.jsonl");
        std::fs::write(
            &path,
            "not json\n{\"title\":\"A\",\"downloadable_url\":\"https://e.com/a.pdf\"}\n",
        )
        .unwrap();

        assert!(matches!(
            RecordStore::new(&path).load(),
            Err(RepositoryError::Json { .. })
        ));
    }

    #[test]
    fn test_load_drops_records_without_url() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.jsonl");
        std::fs::write(
            &path,
            "{\"title\":\"A\",\"downloadable_url\":\"\"}\n{\"title\":\"B\",\"downloadable_url\":\"https://e.com/b.pdf\"}\n",
        )
        .unwrap();

        let loaded = RecordStore::new(&path).load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "B");
    }

    #[test]
    fn test_json_array_rewrite_sorted_by_title() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("items.json");
        let store = RecordStore::new(&path);

        store.append(&[record("zebra", "https://e.com/z.pdf")]).unwrap();
        store
            .append(&[record("Apple", "https://e.com/a.pdf"), record("mango", "https://e.com/m.pdf")])
            .unwrap();

        let titles: Vec<String> = store.load().unwrap().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["Apple", "mango", "zebra"]);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("[\n"));
    }

    #[test]
    fn test_dedup_index_reflects_store() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("items.jsonl"));
        store.append(&[record("A", "https://e.com/a.pdf")]).unwrap();

        let index = store.dedup_index().unwrap();
        assert!(index.contains("https://e.com/a.pdf"));
        assert!(!index.contains("https://e.com/b.pdf"));
    }
}
