//! Harvested record model.
//!
//! A record is one downloadable file discovered on a listing site, together
//! with the metadata needed to present it in the picker. Records are created
//! by the extractor, written once to the record store and never mutated.

use serde::{Deserialize, Serialize};

/// One harvested entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Absolute URL of the downloadable file.
    #[serde(default, alias = "pdf_url")]
    pub downloadable_url: String,
    /// Thumbnail or cover image.
    #[serde(default, alias = "img_url", skip_serializing_if = "String::is_empty")]
    pub thumbnail_url: String,
    /// Detail page the record was extracted from.
    #[serde(default, alias = "detail_url", skip_serializing_if = "String::is_empty")]
    pub source_url: String,
    /// Subject or category label.
    #[serde(default, alias = "subject", skip_serializing_if = "String::is_empty")]
    pub category: String,
}

impl Record {
    /// Create a record with only the required fields set.
    pub fn new(title: impl Into<String>, downloadable_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            downloadable_url: downloadable_url.into(),
            ..Self::default()
        }
    }

    /// Title and downloadable URL are the only persistence requirements.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.downloadable_url.trim().is_empty()
    }

    /// Identity used for deduplication across runs.
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.downloadable_url)
    }
}

/// Normalize a downloadable URL into its dedup key.
pub fn dedup_key(downloadable_url: &str) -> String {
    downloadable_url.trim().to_string()
}
