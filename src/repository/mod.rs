//! File-backed persistence for harvested records and crawl checkpoints.
//!
//! Both stores are single-writer by construction: one crawl job owns a given
//! store/checkpoint path at a time. Whole-file rewrites go through a
//! temporary sibling file followed by an atomic rename so that a resumed job
//! never observes a partial write.

mod checkpoint;
mod dedup;
mod record_store;

pub use checkpoint::CheckpointStore;
pub use dedup::DedupIndex;
pub use record_store::{RecordStore, StoreFormat};

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised by the record and checkpoint stores.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl RepositoryError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Create the parent directory of `path` if it does not exist yet.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| RepositoryError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Replace `path` with `contents` via a temporary sibling and rename.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent_dir(path)?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let written = std::fs::File::create(&tmp).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(RepositoryError::io(&tmp, e));
    }

    std::fs::rename(&tmp, path).map_err(|e| RepositoryError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_atomic_replaces_contents_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }
}
