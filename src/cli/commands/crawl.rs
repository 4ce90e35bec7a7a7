//! Crawl command.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use console::style;

use crate::config::Settings;
use crate::scrapers::{CrawlJob, CrawlJobConfig, PaginationMode, StopReason};

#[derive(Debug, Args)]
pub struct CrawlArgs {
    /// Site profile name (preset or [sites.<name>] in the config)
    #[arg(short, long)]
    pub site: Option<String>,
    /// Checkpoint file (overrides config)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
    /// First page when no checkpoint exists
    #[arg(long, default_value = "1")]
    pub start: u32,
    /// Last page (0 = detect from the pager)
    #[arg(long, default_value = "0")]
    pub end: u32,
    /// Delay before each detail request, in milliseconds
    #[arg(long, default_value = "300")]
    pub delay_ms: u64,
    /// Stop after this many new records (0 = unlimited)
    #[arg(short, long, default_value = "0")]
    pub max_items: usize,
    /// Keep paging until consecutive empty pages are seen
    #[arg(long)]
    pub lazy: bool,
    /// Category or collection URL to page through instead of the site listing
    #[arg(long)]
    pub category: Option<String>,
    /// Consecutive empty pages that end a lazy crawl
    #[arg(long, default_value = "3")]
    pub empty_limit: u32,
    /// Retries for a failed listing page
    #[arg(long, default_value = "2")]
    pub retry: u32,
}

impl CrawlArgs {
    fn job_config(&self, settings: &Settings) -> CrawlJobConfig {
        CrawlJobConfig {
            store_path: settings.data_path.clone(),
            checkpoint_path: self
                .checkpoint
                .clone()
                .unwrap_or_else(|| settings.checkpoint_path.clone()),
            start_page: self.start,
            end_page: self.end,
            item_delay: Duration::from_millis(self.delay_ms),
            max_items: self.max_items,
            mode: if self.lazy {
                PaginationMode::LazyExhaust
            } else {
                PaginationMode::Bounded
            },
            collection_url: self.category.clone(),
            empty_page_limit: self.empty_limit,
            list_retry_count: self.retry,
            ..CrawlJobConfig::default()
        }
    }
}

/// Run one crawl job to completion.
pub async fn cmd_crawl(settings: &Settings, args: CrawlArgs) -> anyhow::Result<()> {
    let profile = settings.site_profile(args.site.as_deref())?;
    let client = settings.http_client(Some(&profile))?;
    let config = args.job_config(settings);

    println!(
        "{} Crawling {} into {}",
        style("→").cyan(),
        style(&profile.name).bold(),
        config.store_path.display()
    );

    let job = CrawlJob::new(config, profile, client);
    let report = job.run().await?;

    let reason = match report.stop_reason {
        StopReason::EndReached => "reached the last page",
        StopReason::EmptyPages => "ran out of non-empty pages",
        StopReason::ListingFailed => "a listing page could not be fetched",
        StopReason::MaxItems => "reached the item limit",
    };
    println!(
        "{} {} new records from {} pages ({})",
        style("✓").green(),
        report.new_records,
        report.pages_processed,
        reason
    );
    if let Some(page) = report.last_page {
        println!("  Checkpoint at page {}", page);
    }

    Ok(())
}
