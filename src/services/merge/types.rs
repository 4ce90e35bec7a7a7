//! Merge job result types.

use std::path::PathBuf;

use serde::Serialize;

/// An input URL that could not be resolved to a local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedInput {
    pub url: String,
    pub reason: String,
}

impl SkippedInput {
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Result of a successful merge.
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    /// Combined artifact on disk.
    pub output_path: PathBuf,
    /// File name of the artifact inside the output directory.
    pub file_name: String,
    /// Inputs that made it into the artifact, in input order.
    pub merged: Vec<String>,
    /// Inputs that were skipped, in input order.
    pub skipped: Vec<SkippedInput>,
}

impl MergeOutcome {
    pub fn skipped_urls(&self) -> Vec<&str> {
        self.skipped.iter().map(|s| s.url.as_str()).collect()
    }
}
