//! Crawl progress marker.

use serde::{Deserialize, Serialize};

/// Last listing page that was fully processed for a crawl job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_page: u32,
}

impl Checkpoint {
    pub fn new(last_page: u32) -> Self {
        Self { last_page }
    }

    /// Page a resumed job starts from.
    pub fn resume_page(&self) -> u32 {
        self.last_page.saturating_add(1).max(1)
    }
}
