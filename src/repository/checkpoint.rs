//! Checkpoint persistence for resumable crawl jobs.

use std::path::{Path, PathBuf};

use tracing::warn;

use super::{write_atomic, RepositoryError, Result};
use crate::models::Checkpoint;

/// Stores the last fully processed listing page for one crawl job.
///
/// The job identity is the checkpoint path itself.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the checkpoint, if one has been written.
    ///
    /// A checkpoint that cannot be parsed is reported and treated as absent.
    pub fn read(&self) -> Result<Option<Checkpoint>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RepositoryError::io(&self.path, e)),
        };

        match serde_json::from_str::<Checkpoint>(&content) {
            Ok(cp) => Ok(Some(cp)),
            Err(e) => {
                warn!(
                    "Ignoring unreadable checkpoint {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Record `page` as the last processed page.
    pub fn write(&self, page: u32) -> Result<()> {
        let mut content = serde_json::to_vec(&Checkpoint::new(page))
            .map_err(|e| RepositoryError::json(&self.path, e))?;
        content.push(b'\n');
        write_atomic(&self.path, &content)
    }
}
