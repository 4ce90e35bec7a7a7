//! Listing-site harvesting.
//!
//! `pagination` drives a crawl job over listing pages, `links` turns a
//! listing page into detail links and `extract` turns a detail page into
//! a [`Record`](crate::models::Record).

pub mod config;
pub mod extract;
pub mod http_client;
pub mod links;
pub mod pagination;

pub use config::SiteProfile;
pub use extract::{ExtractionError, FileLinkRule, RecordExtractor};
pub use http_client::{FetchError, HttpClient};
pub use links::{LinkResolver, ListingLinks};
pub use pagination::{
    CrawlError, CrawlJob, CrawlJobConfig, CrawlReport, PaginationMode, PaginationStrategy,
    StopReason,
};
