//! Data models for harvested records and crawl progress.

mod checkpoint;
mod record;

pub use checkpoint::Checkpoint;
pub use record::{dedup_key, Record};
