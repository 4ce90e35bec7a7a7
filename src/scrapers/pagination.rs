//! Crawl job driver.
//!
//! A job resolves its resume page from the checkpoint, picks a pagination
//! strategy and walks listing pages one at a time. Every page, whether it
//! failed, was empty or produced records, ends with the batch append
//! followed by a checkpoint write for that page number.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use super::config::{collection_page_url, SiteProfile};
use super::extract::RecordExtractor;
use super::http_client::{FetchError, HttpClient};
use super::links::LinkResolver;
use crate::models::Record;
use crate::repository::{CheckpointStore, DedupIndex, RecordStore, RepositoryError};

/// Page count assumed when the last listing page cannot be detected.
pub const FALLBACK_PAGE_COUNT: u32 = 100;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("Invalid listing URL {0}")]
    InvalidUrl(String),
}

/// Requested pagination mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationMode {
    #[default]
    Bounded,
    LazyExhaust,
}

/// Settings for one crawl invocation.
#[derive(Debug, Clone)]
pub struct CrawlJobConfig {
    pub store_path: PathBuf,
    pub checkpoint_path: PathBuf,
    /// First page when no checkpoint exists.
    pub start_page: u32,
    /// Last page to visit; 0 means detect it.
    pub end_page: u32,
    /// Pause before each detail request.
    pub item_delay: Duration,
    /// Cap on new records per run; 0 means unlimited.
    pub max_items: usize,
    pub mode: PaginationMode,
    /// Category or collection endpoint to page through instead of the site listing.
    pub collection_url: Option<String>,
    pub empty_page_limit: u32,
    pub list_retry_count: u32,
    pub retry_backoff: Duration,
}

impl Default for CrawlJobConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("items.jsonl"),
            checkpoint_path: PathBuf::from("checkpoint.json"),
            start_page: 1,
            end_page: 0,
            item_delay: Duration::from_millis(300),
            max_items: 0,
            mode: PaginationMode::Bounded,
            collection_url: None,
            empty_page_limit: 3,
            list_retry_count: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl CrawlJobConfig {
    fn collection(&self) -> Option<&str> {
        self.collection_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Lazy exhaustion is used when requested, or for a collection without an end page.
    pub fn uses_lazy_exhaust(&self) -> bool {
        self.mode == PaginationMode::LazyExhaust
            || (self.collection().is_some() && self.end_page == 0)
    }
}

/// Why a crawl job stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Bounded mode visited its last page.
    EndReached,
    /// Lazy mode saw too many consecutive empty pages.
    EmptyPages,
    /// Lazy mode could not fetch a listing page.
    ListingFailed,
    /// The per-run record cap was reached.
    MaxItems,
}

/// Summary of a finished crawl job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    pub new_records: usize,
    pub pages_processed: u32,
    /// Last page number checkpointed by this run.
    pub last_page: Option<u32>,
    pub stop_reason: StopReason,
}

/// Result of processing a single listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Listing fetch failed after all retries.
    Failed,
    /// The listing had no detail links.
    Empty,
    /// The listing had detail links (possibly all duplicates).
    Harvested,
}

/// Continuation rule for the page loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationStrategy {
    Bounded { end: u32 },
    LazyExhaust { limit: u32, empty_run: u32 },
}

impl PaginationStrategy {
    pub fn lazy(limit: u32) -> Self {
        Self::LazyExhaust {
            limit: limit.max(1),
            empty_run: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bounded { .. } => "bounded",
            Self::LazyExhaust { .. } => "lazy-exhaust",
        }
    }

    /// Whether `page` should be visited at all.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            Self::Bounded { end } => page <= *end,
            Self::LazyExhaust { .. } => true,
        }
    }

    /// Record a page outcome; returns a stop reason when the loop must end.
    pub fn observe(&mut self, outcome: PageOutcome) -> Option<StopReason> {
        match self {
            Self::Bounded { .. } => None,
            Self::LazyExhaust { limit, empty_run } => match outcome {
                PageOutcome::Failed => Some(StopReason::ListingFailed),
                PageOutcome::Empty => {
                    *empty_run += 1;
                    (*empty_run >= *limit).then_some(StopReason::EmptyPages)
                }
                PageOutcome::Harvested => {
                    *empty_run = 0;
                    None
                }
            },
        }
    }
}

/// One incremental harvest of a listing site into a record store.
pub struct CrawlJob {
    config: CrawlJobConfig,
    profile: SiteProfile,
    client: HttpClient,
    extractor: RecordExtractor,
    links: LinkResolver,
    store: RecordStore,
    checkpoints: CheckpointStore,
}

/// Mutable progress shared across pages of one run.
struct RunState {
    seen: DedupIndex,
    collected: usize,
}

impl CrawlJob {
    pub fn new(config: CrawlJobConfig, profile: SiteProfile, client: HttpClient) -> Self {
        let store = RecordStore::new(&config.store_path);
        let checkpoints = CheckpointStore::new(&config.checkpoint_path);
        let extractor = RecordExtractor::new(profile.clone());
        let links = LinkResolver::new(&profile);
        Self {
            config,
            profile,
            client,
            extractor,
            links,
            store,
            checkpoints,
        }
    }

    /// Page the next run starts from.
    pub fn resume_page(&self) -> Result<u32, CrawlError> {
        let page = match self.checkpoints.read()? {
            Some(cp) if cp.last_page > 0 => cp.resume_page(),
            _ => self.config.start_page,
        };
        Ok(page.max(1))
    }

    /// Absolute URL of listing page `page`.
    pub fn listing_url(&self, page: u32) -> String {
        match self.config.collection() {
            Some(collection) => collection_page_url(collection, page),
            None => self.profile.listing_url(page),
        }
    }

    async fn determine_strategy(&self) -> PaginationStrategy {
        if self.config.uses_lazy_exhaust() {
            return PaginationStrategy::lazy(self.config.empty_page_limit);
        }
        if self.config.end_page > 0 {
            return PaginationStrategy::Bounded {
                end: self.config.end_page,
            };
        }

        let first = self.listing_url(1);
        let end = match self.fetch_listing(&first).await {
            Ok(html) => self.links.detect_max_page(&html),
            Err(e) => {
                warn!(
                    "Cannot detect last listing page ({}), assuming {}",
                    e, FALLBACK_PAGE_COUNT
                );
                FALLBACK_PAGE_COUNT
            }
        };
        PaginationStrategy::Bounded { end }
    }

    /// Fetch a listing page, retrying with a fixed backoff.
    async fn fetch_listing(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.client.get_text(url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.config.list_retry_count => {
                    attempt += 1;
                    debug!("Listing fetch attempt {} failed: {}", attempt, e);
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Run the job to completion.
    pub async fn run(&self) -> Result<CrawlReport, CrawlError> {
        let start = self.resume_page()?;
        let mut strategy = self.determine_strategy().await;
        let mut state = RunState {
            seen: self.store.dedup_index()?,
            collected: 0,
        };

        info!(
            "Crawling {} from page {} ({} strategy{}), store={}, checkpoint={}",
            self.profile.name,
            start,
            strategy.name(),
            match &strategy {
                PaginationStrategy::Bounded { end } => format!(", end={}", end),
                PaginationStrategy::LazyExhaust { .. } => String::new(),
            },
            self.store.path().display(),
            self.checkpoints.path().display()
        );

        let mut report = CrawlReport {
            new_records: 0,
            pages_processed: 0,
            last_page: None,
            stop_reason: StopReason::EndReached,
        };

        let mut page = start;
        while strategy.includes(page) {
            let outcome = self.process_page(page, &mut state).await?;
            report.pages_processed += 1;
            report.last_page = Some(page);

            if let Some(reason) = strategy.observe(outcome) {
                report.stop_reason = reason;
                break;
            }
            if self.cap_reached(&state) {
                info!("Reached max items ({})", self.config.max_items);
                report.stop_reason = StopReason::MaxItems;
                break;
            }
            page = match page.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }

        report.new_records = state.collected;
        info!(
            "Crawl finished: {} new records over {} pages ({:?})",
            report.new_records, report.pages_processed, report.stop_reason
        );
        Ok(report)
    }

    fn cap_reached(&self, state: &RunState) -> bool {
        self.config.max_items > 0 && state.collected >= self.config.max_items
    }

    /// Process one listing page: fetch, harvest, append, checkpoint.
    async fn process_page(&self, page: u32, state: &mut RunState) -> Result<PageOutcome, CrawlError> {
        let url = self.listing_url(page);
        info!("Page {}: {}", page, url);

        let html = match self.fetch_listing(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Page {} failed after retries: {}", page, e);
                self.checkpoints.write(page)?;
                return Ok(PageOutcome::Failed);
            }
        };

        let base = Url::parse(&url).map_err(|_| CrawlError::InvalidUrl(url.clone()))?;
        let links = self.links.resolve_listing(&html, &base);
        if links.is_empty() {
            info!("Page {}: no detail links", page);
            self.checkpoints.write(page)?;
            return Ok(PageOutcome::Empty);
        }
        debug!(
            "Page {}: {} detail links, {} pager links",
            page,
            links.detail_links.len(),
            links.next_pages.len()
        );

        let mut batch: Vec<Record> = Vec::new();
        for detail_url in &links.detail_links {
            if self.cap_reached(state) {
                break;
            }
            if !self.config.item_delay.is_zero() {
                tokio::time::sleep(self.config.item_delay).await;
            }

            let mut record = match self.extractor.fetch(&self.client, detail_url).await {
                Ok(record) => record,
                Err(e) => {
                    warn!("Detail {} skipped: {}", detail_url, e);
                    continue;
                }
            };
            if record.thumbnail_url.is_empty() {
                if let Some(thumb) = links.thumbnail_for(detail_url) {
                    record.thumbnail_url = thumb.to_string();
                }
            }
            if !record.is_valid() {
                debug!("Detail {} has no title or file link", detail_url);
                continue;
            }
            if !state.seen.insert(&record.downloadable_url) {
                continue;
            }

            batch.push(record);
            state.collected += 1;
        }

        if !batch.is_empty() {
            info!("Page {}: {} new records", page, batch.len());
        }
        self.store.append(&batch)?;
        self.checkpoints.write(page)?;
        Ok(PageOutcome::Harvested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_strategy_counts_consecutive_empty_pages() {
        let mut strategy = PaginationStrategy::lazy(2);
        assert_eq!(strategy.observe(PageOutcome::Empty), None);
        assert_eq!(strategy.observe(PageOutcome::Harvested), None);
        assert_eq!(strategy.observe(PageOutcome::Empty), None);
        assert_eq!(
            strategy.observe(PageOutcome::Empty),
            Some(StopReason::EmptyPages)
        );
    }

    #[test]
    fn test_lazy_strategy_stops_on_failed_listing() {
        let mut strategy = PaginationStrategy::lazy(3);
        assert_eq!(
            strategy.observe(PageOutcome::Failed),
            Some(StopReason::ListingFailed)
        );
    }

    #[test]
    fn test_bounded_strategy_only_ends_at_last_page() {
        let mut strategy = PaginationStrategy::Bounded { end: 4 };
        assert!(strategy.includes(4));
        assert!(!strategy.includes(5));
        assert_eq!(strategy.observe(PageOutcome::Failed), None);
        assert_eq!(strategy.observe(PageOutcome::Empty), None);
    }

    #[test]
    fn test_mode_selection() {
        let mut config = CrawlJobConfig::default();
        assert!(!config.uses_lazy_exhaust());

        config.collection_url = Some("https://e.com/category/math/".to_string());
        assert!(config.uses_lazy_exhaust());

        config.end_page = 5;
        assert!(!config.uses_lazy_exhaust());

        config.mode = PaginationMode::LazyExhaust;
        assert!(config.uses_lazy_exhaust());

        config.mode = PaginationMode::Bounded;
        config.collection_url = Some("  ".to_string());
        config.end_page = 0;
        assert!(!config.uses_lazy_exhaust());
    }

    #[test]
    fn test_resume_page_from_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let config = CrawlJobConfig {
            store_path: dir.path().join("items.jsonl"),
            checkpoint_path: dir.path().join("cp.json"),
            start_page: 0,
            ..CrawlJobConfig::default()
        };
        let job = CrawlJob::new(
            config.clone(),
            SiteProfile::kiddoworksheets(),
            HttpClient::new().unwrap(),
        );
        assert_eq!(job.resume_page().unwrap(), 1);

        CheckpointStore::new(&config.checkpoint_path).write(7).unwrap();
        assert_eq!(job.resume_page().unwrap(), 8);
    }

    #[test]
    fn test_listing_url_uses_collection() {
        let config = CrawlJobConfig {
            collection_url: Some("https://www.worksheetfun.com/category/math".to_string()),
            ..CrawlJobConfig::default()
        };
        let job = CrawlJob::new(
            config,
            SiteProfile::worksheetfun(),
            HttpClient::new().unwrap(),
        );
        assert_eq!(
            job.listing_url(3),
            "https://www.worksheetfun.com/category/math/page/3/"
        );
    }
}
